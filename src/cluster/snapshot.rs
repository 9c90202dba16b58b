use std::collections::HashMap;
use std::net::Ipv4Addr;

use async_trait::async_trait;
use futures_util::future;
use itertools::Itertools;
use tracing::{debug, error, info, instrument, warn};

use crate::cluster::{
    ClusterApi, ContainerInstance, EndpointSelection, FirstBinding, Host, HostMap, InventoryApi,
    Refresh, Task,
};
use crate::error::{Error, UpstreamContext};
use crate::fingerprint::{fingerprint, FingerprintCache};
use crate::page;
use crate::targets::{group_targets, Targets};

/// Upper bound of identifiers accepted by a single describe call.
const DESCRIBE_BATCH: usize = 100;

/// Node id -> private address.
type AddressMap = HashMap<String, Ipv4Addr>;

/// Cluster binding that owns its caches exclusively. One instance per cluster; never
/// shared between concurrently running loops.
pub struct ClusterSnapshot<C, I, P = FirstBinding> {
    cluster: String,
    cluster_api: C,
    inventory: I,
    selection: P,
    addresses: FingerprintCache<AddressMap>,
    tasks: FingerprintCache<Vec<Task>>,
}

impl<C, I> ClusterSnapshot<C, I> {
    pub fn new(cluster: impl Into<String>, cluster_api: C, inventory: I) -> Self {
        Self {
            cluster: cluster.into(),
            cluster_api,
            inventory,
            selection: FirstBinding,
            addresses: FingerprintCache::default(),
            tasks: FingerprintCache::default(),
        }
    }
}

impl<C, I, P> ClusterSnapshot<C, I, P> {
    pub fn with_selection<Q>(self, selection: Q) -> ClusterSnapshot<C, I, Q> {
        ClusterSnapshot {
            cluster: self.cluster,
            cluster_api: self.cluster_api,
            inventory: self.inventory,
            selection,
            addresses: self.addresses,
            tasks: self.tasks,
        }
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }
}

#[async_trait]
impl<C, I, P> Refresh for ClusterSnapshot<C, I, P>
where
    C: ClusterApi,
    I: InventoryApi,
    P: EndpointSelection,
{
    #[instrument(err, skip(self))]
    async fn refresh(&mut self) -> Result<Targets, Error> {
        let Self {
            cluster,
            cluster_api,
            inventory,
            selection,
            addresses,
            tasks,
        } = self;

        let hosts = resolve_hosts(cluster, &*cluster_api, &*inventory, addresses).await?;
        let tasks = load_tasks(cluster, &*cluster_api, tasks).await?;

        let targets = group_targets(&hosts, tasks, &*selection);

        info!(
            %cluster,
            hosts = hosts.len(),
            tasks = tasks.len(),
            services = targets.service_count(),
            "refresh cluster snapshot done"
        );

        Ok(targets)
    }
}

async fn resolve_hosts<C, I>(
    cluster: &str,
    cluster_api: &C,
    inventory: &I,
    address_cache: &mut FingerprintCache<AddressMap>,
) -> Result<HostMap, Error>
where
    C: ClusterApi,
    I: InventoryApi,
{
    let arns = page::drain(move |next_token| {
        cluster_api.list_container_instances(cluster, next_token)
    })
    .await
    .upstream("list container instances")?;

    let mut instances = Vec::with_capacity(arns.len());
    for batch in arns.chunks(DESCRIBE_BATCH) {
        instances.extend(
            cluster_api
                .describe_container_instances(cluster, batch)
                .await
                .upstream("describe container instances")?,
        );
    }

    let instance_ids = instances
        .iter()
        .map(|instance| instance.ec2_instance_id.clone())
        .sorted()
        .dedup()
        .collect::<Vec<_>>();

    debug!(?instance_ids, "list cluster instances done");

    let ids_fingerprint = fingerprint(&instance_ids)?;
    let addresses = address_cache
        .get_or_refresh(ids_fingerprint, || {
            resolve_addresses(inventory, &instance_ids)
        })
        .await?;

    let unresolved = instance_ids
        .iter()
        .filter(|instance_id| !addresses.contains_key(*instance_id))
        .count();

    let mut hosts = HostMap::with_capacity(instances.len());

    for ContainerInstance {
        arn,
        ec2_instance_id,
    } in instances
    {
        match addresses.get(&ec2_instance_id) {
            None => {
                warn!(
                    container_instance_arn = %arn,
                    instance_id = %ec2_instance_id,
                    "no private ip resolved for container instance, drop it"
                );
            }

            Some(private_ip) => {
                hosts.insert(
                    arn.clone(),
                    Host {
                        instance_id: ec2_instance_id,
                        container_instance_arn: arn,
                        private_ip: *private_ip,
                    },
                );
            }
        }
    }

    // ask the inventory again next time until every instance has an address
    if unresolved > 0 {
        debug!(unresolved, "some instances have no private ip, don't cache addresses");

        address_cache.clear();
    }

    Ok(hosts)
}

async fn resolve_addresses<I: InventoryApi>(
    inventory: &I,
    instance_ids: &[String],
) -> Result<AddressMap, Error> {
    let mut addresses = AddressMap::with_capacity(instance_ids.len());

    // an empty id filter would describe every instance in the account
    for batch in instance_ids.chunks(DESCRIBE_BATCH) {
        let reservations = page::drain(move |next_token| {
            inventory.describe_instances(batch, next_token)
        })
        .await
        .upstream("describe instances")?;

        for instance in reservations
            .into_iter()
            .flat_map(|reservation| reservation.instances)
        {
            match instance
                .private_ip_address
                .as_deref()
                .map(str::parse::<Ipv4Addr>)
            {
                None => {
                    warn!(instance_id = %instance.instance_id, "instance has no private ip");
                }

                Some(Err(err)) => {
                    warn!(instance_id = %instance.instance_id, %err, "parse private ip failed");
                }

                Some(Ok(private_ip)) => {
                    addresses.insert(instance.instance_id, private_ip);
                }
            }
        }
    }

    info!(instances = addresses.len(), "resolve private ips done");

    Ok(addresses)
}

async fn load_tasks<'a, C: ClusterApi>(
    cluster: &str,
    cluster_api: &C,
    cache: &'a mut FingerprintCache<Vec<Task>>,
) -> Result<&'a [Task], Error> {
    let arns = page::drain(move |next_token| cluster_api.list_tasks(cluster, next_token))
        .await
        .upstream("list tasks")?;

    let mut tasks = Vec::with_capacity(arns.len());
    for batch in arns.chunks(DESCRIBE_BATCH) {
        let described = cluster_api
            .describe_tasks(cluster, batch)
            .await
            .upstream("describe tasks")?;

        if let Some(failure) = described.failures.into_iter().next() {
            error!(task_arn = %failure.arn, reason = %failure.reason, "describe task failed");

            return Err(Error::TaskDescribe {
                arn: failure.arn,
                reason: failure.reason,
            });
        }

        tasks.extend(described.tasks);
    }

    tasks.sort_by(|a, b| a.arn.cmp(&b.arn));

    let tasks_fingerprint = fingerprint(&tasks)?;
    let tasks = cache
        .get_or_refresh(tasks_fingerprint, move || future::ok::<_, Error>(tasks))
        .await?;

    Ok(tasks.as_slice())
}
