use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::dns::{Change, ChangeAction, ManagedId, RecordSet, RecordType, Reconcile, ZoneApi};
use crate::error::{Error, UpstreamContext};
use crate::page;
use crate::targets::{Endpoint, Targets};

const CHANGE_COMMENT: &str = "Service Discovery Created Record";

/// Zero TTL keeps resolvers from caching endpoints that may move at any time.
const RECORD_TTL: i64 = 0;
const RECORD_WEIGHT: i64 = 1;

/// SRV records of one hosted zone, named below `domain`.
pub struct Reconciler<Z> {
    zone: Z,
    zone_id: String,
    domain: String,
}

impl<Z> Reconciler<Z> {
    pub fn new(zone: Z, zone_id: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            zone,
            zone_id: zone_id.into(),
            domain: domain.into(),
        }
    }

    /// Builds one SRV record set per service that has at least one endpoint.
    pub fn service_records(&self, targets: &Targets) -> Vec<RecordSet> {
        targets
            .services()
            .filter(|(_, _, endpoints)| !endpoints.is_empty())
            .map(|(group, service, endpoints)| RecordSet {
                name: format!("{}.{}.{}", service, group, self.domain),
                record_type: RecordType::Srv,
                set_identifier: Some(ManagedId::new(group, service).encode()),
                ttl: Some(RECORD_TTL),
                weight: Some(RECORD_WEIGHT),
                values: endpoints.iter().map(srv_value).collect(),
            })
            .collect()
    }
}

impl<Z: ZoneApi> Reconciler<Z> {
    /// Every record set of the zone that follows the owned-record convention.
    #[instrument(err, skip(self), fields(zone = %self.zone_id))]
    pub async fn list_managed(&self) -> Result<Vec<RecordSet>, Error> {
        let zone = &self.zone;
        let zone_id = self.zone_id.as_str();

        let record_sets = page::drain(move |start| zone.list_record_sets(zone_id, start))
            .await
            .upstream("list resource record sets")?;

        let total = record_sets.len();
        let managed = record_sets
            .into_iter()
            .filter(RecordSet::is_managed)
            .collect::<Vec<_>>();

        info!(total, managed = managed.len(), "list record sets done");

        Ok(managed)
    }

    async fn submit(&self, changes: Vec<Change>) -> Result<usize, Error> {
        if changes.is_empty() {
            info!(zone = %self.zone_id, "no changes to be made");

            return Ok(0);
        }

        self.zone
            .change_record_sets(&self.zone_id, CHANGE_COMMENT, &changes)
            .await
            .map_err(Error::Rejected)?;

        info!(zone = %self.zone_id, changes = changes.len(), "submit change batch done");

        Ok(changes.len())
    }
}

#[async_trait]
impl<Z: ZoneApi> Reconcile for Reconciler<Z> {
    #[instrument(err, skip(self, targets))]
    async fn prune(&self, targets: &Targets) -> Result<usize, Error> {
        let record_sets = self.list_managed().await?;

        let removes = record_sets
            .into_iter()
            .filter(|record_set| {
                let set_identifier = record_set.set_identifier.as_deref().unwrap_or_default();

                match ManagedId::decode(set_identifier) {
                    None => {
                        warn!(
                            name = %record_set.name,
                            %set_identifier,
                            "malformed managed set identifier, skip it"
                        );

                        false
                    }

                    Some(id) => !targets.contains(&id.group, &id.service),
                }
            })
            .collect();

        self.submit(mark(ChangeAction::Delete, removes)).await
    }

    #[instrument(err, skip(self, targets))]
    async fn sync(&self, targets: &Targets) -> Result<usize, Error> {
        let record_sets = self.service_records(targets);

        self.submit(mark(ChangeAction::Upsert, record_sets)).await
    }

    #[instrument(err, skip(self))]
    async fn remove_all_managed(&self) -> Result<usize, Error> {
        let record_sets = self.list_managed().await?;

        self.submit(mark(ChangeAction::Delete, record_sets)).await
    }
}

fn mark(action: ChangeAction, record_sets: Vec<RecordSet>) -> Vec<Change> {
    record_sets
        .into_iter()
        .map(|record_set| {
            info!(
                %action,
                name = %record_set.name,
                values = ?record_set.values,
                "mark record set"
            );

            Change { action, record_set }
        })
        .collect()
}

/// `priority weight port target`
fn srv_value(endpoint: &Endpoint) -> String {
    format!("1 1 {} {}", endpoint.port, endpoint.ip_address)
}
