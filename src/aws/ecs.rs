use std::fmt::{self, Debug, Formatter};

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ecs::types::{Container as SdkContainer, Task as SdkTask};
use aws_sdk_ecs::Client;
use tracing::debug;

use crate::cluster::{
    ClusterApi, Container, ContainerInstance, DescribedTasks, NetworkBinding, Task, TaskFailure,
};
use crate::page::Page;

/// Compute-cluster API backed by Amazon ECS.
#[derive(Clone)]
pub struct Ecs {
    client: Client,
}

impl Debug for Ecs {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ecs")
            .field("client", &"Client".to_string())
            .finish()
    }
}

impl Ecs {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl ClusterApi for Ecs {
    async fn list_container_instances(
        &self,
        cluster: &str,
        next_token: Option<String>,
    ) -> Result<Page<String>> {
        let output = self
            .client
            .list_container_instances()
            .cluster(cluster)
            .set_next_token(next_token)
            .send()
            .await
            .with_context(|| format!("list container instances of cluster {}", cluster))?;

        Ok(Page {
            items: output.container_instance_arns().to_vec(),
            next: output.next_token().map(str::to_string),
        })
    }

    async fn describe_container_instances(
        &self,
        cluster: &str,
        arns: &[String],
    ) -> Result<Vec<ContainerInstance>> {
        let output = self
            .client
            .describe_container_instances()
            .cluster(cluster)
            .set_container_instances(Some(arns.to_vec()))
            .send()
            .await
            .with_context(|| format!("describe container instances of cluster {}", cluster))?;

        for failure in output.failures() {
            debug!(arn = ?failure.arn(), reason = ?failure.reason(), "describe container instance failure");
        }

        Ok(output
            .container_instances()
            .iter()
            .filter_map(|instance| {
                Some(ContainerInstance {
                    arn: instance.container_instance_arn()?.to_string(),
                    ec2_instance_id: instance.ec2_instance_id()?.to_string(),
                })
            })
            .collect())
    }

    async fn list_tasks(&self, cluster: &str, next_token: Option<String>) -> Result<Page<String>> {
        let output = self
            .client
            .list_tasks()
            .cluster(cluster)
            .set_next_token(next_token)
            .send()
            .await
            .with_context(|| format!("list tasks of cluster {}", cluster))?;

        Ok(Page {
            items: output.task_arns().to_vec(),
            next: output.next_token().map(str::to_string),
        })
    }

    async fn describe_tasks(&self, cluster: &str, arns: &[String]) -> Result<DescribedTasks> {
        let output = self
            .client
            .describe_tasks()
            .cluster(cluster)
            .set_tasks(Some(arns.to_vec()))
            .send()
            .await
            .with_context(|| format!("describe tasks of cluster {}", cluster))?;

        Ok(DescribedTasks {
            tasks: output.tasks().iter().map(task_from_sdk).collect(),
            failures: output
                .failures()
                .iter()
                .map(|failure| TaskFailure {
                    arn: failure.arn().unwrap_or_default().to_string(),
                    reason: failure.reason().unwrap_or_default().to_string(),
                })
                .collect(),
        })
    }
}

fn task_from_sdk(task: &SdkTask) -> Task {
    Task {
        arn: task.task_arn().unwrap_or_default().to_string(),
        container_instance_arn: task.container_instance_arn().map(str::to_string),
        group: task.group().map(str::to_string),
        containers: task.containers().iter().map(container_from_sdk).collect(),
    }
}

fn container_from_sdk(container: &SdkContainer) -> Container {
    Container {
        name: container.name().unwrap_or_default().to_string(),
        network_bindings: container
            .network_bindings()
            .iter()
            .map(|binding| NetworkBinding {
                host_port: binding.host_port().and_then(|port| u16::try_from(port).ok()),
                container_port: binding
                    .container_port()
                    .and_then(|port| u16::try_from(port).ok()),
            })
            .collect(),
    }
}
