use std::fmt::{self, Debug, Formatter};

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ec2::Client;

use crate::cluster::{Instance, InventoryApi, Reservation};
use crate::page::Page;

/// Node inventory backed by Amazon EC2.
#[derive(Clone)]
pub struct Ec2 {
    client: Client,
}

impl Debug for Ec2 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ec2")
            .field("client", &"Client".to_string())
            .finish()
    }
}

impl Ec2 {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl InventoryApi for Ec2 {
    async fn describe_instances(
        &self,
        instance_ids: &[String],
        next_token: Option<String>,
    ) -> Result<Page<Reservation>> {
        let output = self
            .client
            .describe_instances()
            .set_instance_ids(Some(instance_ids.to_vec()))
            .set_next_token(next_token)
            .send()
            .await
            .with_context(|| format!("describe instances {:?}", instance_ids))?;

        let reservations = output
            .reservations()
            .iter()
            .map(|reservation| Reservation {
                instances: reservation
                    .instances()
                    .iter()
                    .filter_map(|instance| {
                        Some(Instance {
                            instance_id: instance.instance_id()?.to_string(),
                            private_ip_address: instance.private_ip_address().map(str::to_string),
                        })
                    })
                    .collect(),
            })
            .collect();

        Ok(Page {
            items: reservations,
            next: output.next_token().map(str::to_string),
        })
    }
}
