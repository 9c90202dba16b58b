use crate::cluster::{Host, Task};
use crate::targets::Endpoint;

/// Decides which endpoints a placed task exposes.
pub trait EndpointSelection: Send + Sync {
    fn select(&self, task: &Task, host: &Host, group: &str) -> Vec<Endpoint>;
}

/// Publishes the first network binding of every container that has one.
///
/// Containers exposing several ports only get their first binding published.
#[derive(Debug, Copy, Clone, Default)]
pub struct FirstBinding;

impl EndpointSelection for FirstBinding {
    fn select(&self, task: &Task, host: &Host, group: &str) -> Vec<Endpoint> {
        task.containers
            .iter()
            .filter_map(|container| {
                let port = container.network_bindings.first()?.host_port?;

                Some(Endpoint {
                    port,
                    ip_address: host.private_ip,
                    name: container.name.clone(),
                    group: group.to_string(),
                })
            })
            .collect()
    }
}
