use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::ops::Deref;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Error;
use crate::page::Page;
use crate::targets::Targets;

pub use select::{EndpointSelection, FirstBinding};
pub use snapshot::ClusterSnapshot;

mod select;
mod snapshot;

/// A cluster node registered with the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInstance {
    pub arn: String,
    pub ec2_instance_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkBinding {
    pub host_port: Option<u16>,
    pub container_port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Container {
    pub name: String,
    pub network_bindings: Vec<NetworkBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub arn: String,
    /// `None` for tasks that are not placed on a container instance.
    pub container_instance_arn: Option<String>,
    /// Group label in the `<family>:<group>` form.
    pub group: Option<String>,
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub arn: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescribedTasks {
    pub tasks: Vec<Task>,
    pub failures: Vec<TaskFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub instance_id: String,
    pub private_ip_address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reservation {
    pub instances: Vec<Instance>,
}

/// A container instance joined with its node's private address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub instance_id: String,
    pub container_instance_arn: String,
    pub private_ip: Ipv4Addr,
}

/// Hosts keyed by container instance ARN.
pub type HostMap = HashMap<String, Host>;

#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn list_container_instances(
        &self,
        cluster: &str,
        next_token: Option<String>,
    ) -> anyhow::Result<Page<String>>;

    async fn describe_container_instances(
        &self,
        cluster: &str,
        arns: &[String],
    ) -> anyhow::Result<Vec<ContainerInstance>>;

    async fn list_tasks(
        &self,
        cluster: &str,
        next_token: Option<String>,
    ) -> anyhow::Result<Page<String>>;

    async fn describe_tasks(&self, cluster: &str, arns: &[String])
        -> anyhow::Result<DescribedTasks>;
}

#[async_trait]
impl<C, T> ClusterApi for T
where
    T: Deref<Target = C> + Send + Sync,
    C: ClusterApi + ?Sized,
{
    async fn list_container_instances(
        &self,
        cluster: &str,
        next_token: Option<String>,
    ) -> anyhow::Result<Page<String>> {
        self.deref()
            .list_container_instances(cluster, next_token)
            .await
    }

    async fn describe_container_instances(
        &self,
        cluster: &str,
        arns: &[String],
    ) -> anyhow::Result<Vec<ContainerInstance>> {
        self.deref().describe_container_instances(cluster, arns).await
    }

    async fn list_tasks(
        &self,
        cluster: &str,
        next_token: Option<String>,
    ) -> anyhow::Result<Page<String>> {
        self.deref().list_tasks(cluster, next_token).await
    }

    async fn describe_tasks(
        &self,
        cluster: &str,
        arns: &[String],
    ) -> anyhow::Result<DescribedTasks> {
        self.deref().describe_tasks(cluster, arns).await
    }
}

/// Node inventory: resolves node ids to their private addresses.
#[async_trait]
pub trait InventoryApi: Send + Sync {
    async fn describe_instances(
        &self,
        instance_ids: &[String],
        next_token: Option<String>,
    ) -> anyhow::Result<Page<Reservation>>;
}

#[async_trait]
impl<I, T> InventoryApi for T
where
    T: Deref<Target = I> + Send + Sync,
    I: InventoryApi + ?Sized,
{
    async fn describe_instances(
        &self,
        instance_ids: &[String],
        next_token: Option<String>,
    ) -> anyhow::Result<Page<Reservation>> {
        self.deref()
            .describe_instances(instance_ids, next_token)
            .await
    }
}

#[async_trait]
pub trait Refresh {
    async fn refresh(&mut self) -> Result<Targets, Error>;
}
