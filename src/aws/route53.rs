use std::fmt::{self, Debug, Formatter};

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_route53::error::BuildError;
use aws_sdk_route53::types::{
    Change as SdkChange, ChangeAction as SdkChangeAction, ChangeBatch, ResourceRecord,
    ResourceRecordSet, RrType,
};
use aws_sdk_route53::Client;
use tracing::{error, info};

use crate::dns::{Change, ChangeAction, RecordSet, RecordSetCursor, RecordType, ZoneApi};
use crate::page::Page;

const MAX_ITEMS: i32 = 100;

/// Hosted zone operations backed by Amazon Route 53.
#[derive(Clone)]
pub struct Route53 {
    client: Client,
}

impl Debug for Route53 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route53")
            .field("client", &"Client".to_string())
            .finish()
    }
}

impl Route53 {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl ZoneApi for Route53 {
    async fn list_record_sets(
        &self,
        zone_id: &str,
        start: Option<RecordSetCursor>,
    ) -> Result<Page<RecordSet, RecordSetCursor>> {
        let mut request = self
            .client
            .list_resource_record_sets()
            .hosted_zone_id(zone_id)
            .max_items(MAX_ITEMS);

        if let Some(start) = start {
            request = request
                .start_record_name(start.name)
                .set_start_record_type(
                    start
                        .record_type
                        .map(|record_type| RrType::from(record_type.as_str())),
                )
                .set_start_record_identifier(start.set_identifier);
        }

        let output = request
            .send()
            .await
            .with_context(|| format!("list resource record sets of zone {}", zone_id))?;

        let next = match output.next_record_name() {
            Some(name) if output.is_truncated() => Some(RecordSetCursor {
                name: name.to_string(),
                record_type: output
                    .next_record_type()
                    .map(|record_type| RecordType::from(record_type.as_str())),
                set_identifier: output.next_record_identifier().map(str::to_string),
            }),

            _ => None,
        };

        Ok(Page {
            items: output
                .resource_record_sets()
                .iter()
                .map(record_set_from_sdk)
                .collect(),
            next,
        })
    }

    async fn change_record_sets(
        &self,
        zone_id: &str,
        comment: &str,
        changes: &[Change],
    ) -> Result<()> {
        let sdk_changes = changes
            .iter()
            .map(change_to_sdk)
            .collect::<Result<Vec<_>, BuildError>>()
            .context("build route53 changes")?;

        let change_batch = ChangeBatch::builder()
            .comment(comment)
            .set_changes(Some(sdk_changes))
            .build()
            .context("build route53 change batch")?;

        let output = self
            .client
            .change_resource_record_sets()
            .hosted_zone_id(zone_id)
            .change_batch(change_batch)
            .send()
            .await
            .map_err(|err| {
                error!(zone_id, %err, "change resource record sets failed");

                err
            })
            .with_context(|| format!("change resource record sets of zone {}", zone_id))?;

        info!(
            zone_id,
            change_info = ?output.change_info(),
            "change resource record sets done"
        );

        Ok(())
    }
}

fn record_set_from_sdk(record_set: &ResourceRecordSet) -> RecordSet {
    RecordSet {
        name: record_set.name().to_string(),
        record_type: RecordType::from(record_set.r#type().as_str()),
        set_identifier: record_set.set_identifier().map(str::to_string),
        ttl: record_set.ttl(),
        weight: record_set.weight(),
        values: record_set
            .resource_records()
            .iter()
            .map(|record| record.value().to_string())
            .collect(),
    }
}

fn change_to_sdk(change: &Change) -> Result<SdkChange, BuildError> {
    let record_set = &change.record_set;

    let resource_records = record_set
        .values
        .iter()
        .map(|value| ResourceRecord::builder().value(value).build())
        .collect::<Result<Vec<_>, _>>()?;

    let resource_record_set = ResourceRecordSet::builder()
        .name(&record_set.name)
        .r#type(RrType::from(record_set.record_type.as_str()))
        .set_set_identifier(record_set.set_identifier.clone())
        .set_ttl(record_set.ttl)
        .set_weight(record_set.weight)
        .set_resource_records(Some(resource_records))
        .build()?;

    let action = match change.action {
        ChangeAction::Upsert => SdkChangeAction::Upsert,
        ChangeAction::Delete => SdkChangeAction::Delete,
    };

    SdkChange::builder()
        .action(action)
        .resource_record_set(resource_record_set)
        .build()
}
