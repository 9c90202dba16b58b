use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use serde::Serialize;
use tracing::warn;

use crate::cluster::{EndpointSelection, HostMap, Task};

/// One reachable container instance backing a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub port: u16,
    pub ip_address: Ipv4Addr,
    pub name: String,
    pub group: String,
}

/// Desired state: group -> service -> endpoints.
///
/// Endpoints are kept in discovery order and never de-duplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Targets(BTreeMap<String, BTreeMap<String, Vec<Endpoint>>>);

impl Targets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, group: &str, service: &str, endpoint: Endpoint) {
        self.0
            .entry(group.to_string())
            .or_default()
            .entry(service.to_string())
            .or_default()
            .push(endpoint);
    }

    pub fn contains(&self, group: &str, service: &str) -> bool {
        self.get(group, service).is_some()
    }

    pub fn get(&self, group: &str, service: &str) -> Option<&[Endpoint]> {
        self.0
            .get(group)
            .and_then(|services| services.get(service))
            .map(Vec::as_slice)
    }

    /// Iterates `(group, service, endpoints)` in a stable order.
    pub fn services(&self) -> impl Iterator<Item = (&str, &str, &[Endpoint])> + '_ {
        self.0.iter().flat_map(|(group, services)| {
            services.iter().map(move |(service, endpoints)| {
                (group.as_str(), service.as_str(), endpoints.as_slice())
            })
        })
    }

    pub fn service_count(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, BTreeMap<String, Vec<Endpoint>>>> for Targets {
    fn from(inner: BTreeMap<String, BTreeMap<String, Vec<Endpoint>>>) -> Self {
        Self(inner)
    }
}

/// Extracts `<group>` from a `<family>:<group>` task group label.
pub fn parse_group(label: &str) -> Option<&str> {
    label.split(':').nth(1).filter(|group| !group.is_empty())
}

/// Joins tasks with the hosts they run on. Tasks whose host or group cannot be determined
/// are skipped.
pub fn group_targets<P>(hosts: &HostMap, tasks: &[Task], selection: &P) -> Targets
where
    P: EndpointSelection + ?Sized,
{
    let mut targets = Targets::new();

    for task in tasks {
        let host = match task
            .container_instance_arn
            .as_ref()
            .and_then(|arn| hosts.get(arn))
        {
            None => {
                warn!(
                    task_arn = %task.arn,
                    container_instance_arn = ?task.container_instance_arn,
                    "container instance not found for task, skip it"
                );

                continue;
            }

            Some(host) => host,
        };

        let group = match task.group.as_deref().and_then(parse_group) {
            None => {
                warn!(task_arn = %task.arn, group_label = ?task.group, "malformed task group label, skip it");

                continue;
            }

            Some(group) => group,
        };

        for endpoint in selection.select(task, host, group) {
            let service = endpoint.name.clone();

            targets.push(group, &service, endpoint);
        }
    }

    targets
}
