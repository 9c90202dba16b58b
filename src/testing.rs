//! In-memory collaborators shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::cluster::{
    ClusterApi, Container, ContainerInstance, DescribedTasks, Instance, InventoryApi,
    NetworkBinding, Reservation, Task, TaskFailure,
};
use crate::dns::{Change, ChangeAction, ManagedId, RecordSet, RecordSetCursor, RecordType, ZoneApi};
use crate::page::Page;

const ZONE_PAGE_SIZE: usize = 100;

pub fn container_instance(arn: &str, instance_id: &str) -> ContainerInstance {
    ContainerInstance {
        arn: arn.to_string(),
        ec2_instance_id: instance_id.to_string(),
    }
}

/// A task running one container with a single host port binding.
pub fn task(arn: &str, container_instance_arn: &str, group: &str, name: &str, port: u16) -> Task {
    Task {
        arn: arn.to_string(),
        container_instance_arn: Some(container_instance_arn.to_string()),
        group: Some(group.to_string()),
        containers: vec![Container {
            name: name.to_string(),
            network_bindings: vec![NetworkBinding {
                host_port: Some(port),
                container_port: Some(port),
            }],
        }],
    }
}

pub fn managed_record(group: &str, service: &str, domain: &str) -> RecordSet {
    RecordSet {
        name: format!("{}.{}.{}", service, group, domain),
        record_type: RecordType::Srv,
        set_identifier: Some(ManagedId::new(group, service).encode()),
        ttl: Some(0),
        weight: Some(1),
        values: vec!["1 1 80 10.0.0.1".to_string()],
    }
}

pub fn unmanaged_record(name: &str) -> RecordSet {
    RecordSet {
        name: name.to_string(),
        record_type: RecordType::Other("A".to_string()),
        set_identifier: None,
        ttl: Some(300),
        weight: None,
        values: vec!["192.0.2.1".to_string()],
    }
}

fn paginate<T: Clone>(items: &[T], next_token: Option<String>, page_size: usize) -> Page<T> {
    let start = next_token
        .map(|token| token.parse::<usize>().expect("fake page token"))
        .unwrap_or(0);
    let end = (start + page_size).min(items.len());

    Page {
        items: items[start..end].to_vec(),
        next: (end < items.len()).then(|| end.to_string()),
    }
}

pub struct FakeCluster {
    container_instances: Mutex<Vec<ContainerInstance>>,
    tasks: Mutex<Vec<Task>>,
    phantom_tasks: Mutex<Vec<String>>,
    page_size: usize,
    pub fail_list_tasks: AtomicBool,
    pub describe_tasks_calls: AtomicUsize,
}

impl FakeCluster {
    pub fn new(container_instances: Vec<ContainerInstance>, tasks: Vec<Task>) -> Self {
        Self {
            container_instances: Mutex::new(container_instances),
            tasks: Mutex::new(tasks),
            phantom_tasks: Mutex::default(),
            page_size: 100,
            fail_list_tasks: AtomicBool::new(false),
            describe_tasks_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn set_tasks(&self, tasks: Vec<Task>) {
        *self.tasks.lock().unwrap() = tasks;
    }

    pub fn set_container_instances(&self, container_instances: Vec<ContainerInstance>) {
        *self.container_instances.lock().unwrap() = container_instances;
    }

    /// Listed but gone by the time it is described.
    pub fn add_phantom_task(&self, arn: &str) {
        self.phantom_tasks.lock().unwrap().push(arn.to_string());
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn list_container_instances(
        &self,
        _cluster: &str,
        next_token: Option<String>,
    ) -> anyhow::Result<Page<String>> {
        let arns = self
            .container_instances
            .lock()
            .unwrap()
            .iter()
            .map(|instance| instance.arn.clone())
            .collect::<Vec<_>>();

        Ok(paginate(&arns, next_token, self.page_size))
    }

    async fn describe_container_instances(
        &self,
        _cluster: &str,
        arns: &[String],
    ) -> anyhow::Result<Vec<ContainerInstance>> {
        Ok(self
            .container_instances
            .lock()
            .unwrap()
            .iter()
            .filter(|instance| arns.contains(&instance.arn))
            .cloned()
            .collect())
    }

    async fn list_tasks(
        &self,
        _cluster: &str,
        next_token: Option<String>,
    ) -> anyhow::Result<Page<String>> {
        if self.fail_list_tasks.load(Ordering::SeqCst) {
            anyhow::bail!("throttled");
        }

        let mut arns = self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .map(|task| task.arn.clone())
            .collect::<Vec<_>>();
        arns.extend(self.phantom_tasks.lock().unwrap().iter().cloned());

        Ok(paginate(&arns, next_token, self.page_size))
    }

    async fn describe_tasks(
        &self,
        _cluster: &str,
        arns: &[String],
    ) -> anyhow::Result<DescribedTasks> {
        self.describe_tasks_calls.fetch_add(1, Ordering::SeqCst);

        let tasks = self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|task| arns.contains(&task.arn))
            .cloned()
            .collect();

        let failures = self
            .phantom_tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|arn| arns.contains(*arn))
            .map(|arn| TaskFailure {
                arn: arn.clone(),
                reason: "MISSING".to_string(),
            })
            .collect();

        Ok(DescribedTasks { tasks, failures })
    }
}

pub struct FakeInventory {
    addresses: Mutex<HashMap<String, String>>,
    page_size: usize,
    pub describe_calls: AtomicUsize,
}

impl FakeInventory {
    pub fn new<K, V>(addresses: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            addresses: Mutex::new(
                addresses
                    .into_iter()
                    .map(|(id, ip)| (id.into(), ip.into()))
                    .collect(),
            ),
            page_size: 100,
            describe_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn set_address(&self, instance_id: &str, ip: &str) {
        self.addresses
            .lock()
            .unwrap()
            .insert(instance_id.to_string(), ip.to_string());
    }
}

#[async_trait]
impl InventoryApi for FakeInventory {
    async fn describe_instances(
        &self,
        instance_ids: &[String],
        next_token: Option<String>,
    ) -> anyhow::Result<Page<Reservation>> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);

        let addresses = self.addresses.lock().unwrap();
        let reservations = instance_ids
            .iter()
            .map(|instance_id| Reservation {
                instances: vec![Instance {
                    instance_id: instance_id.clone(),
                    private_ip_address: addresses.get(instance_id).cloned(),
                }],
            })
            .collect::<Vec<_>>();

        Ok(paginate(&reservations, next_token, self.page_size))
    }
}

#[derive(Default)]
pub struct FakeZone {
    record_sets: Mutex<Vec<RecordSet>>,
    batches: Mutex<Vec<Vec<Change>>>,
    pub reject: AtomicBool,
    pub fail_list: AtomicBool,
    pub list_calls: AtomicUsize,
    pub change_calls: AtomicUsize,
}

impl FakeZone {
    pub fn with_records(record_sets: Vec<RecordSet>) -> Self {
        Self {
            record_sets: Mutex::new(record_sets),
            ..Default::default()
        }
    }

    pub fn record_sets(&self) -> Vec<RecordSet> {
        self.record_sets.lock().unwrap().clone()
    }

    pub fn batches(&self) -> Vec<Vec<Change>> {
        self.batches.lock().unwrap().clone()
    }
}

fn same_record(a: &RecordSet, b: &RecordSet) -> bool {
    a.name == b.name && a.record_type == b.record_type && a.set_identifier == b.set_identifier
}

#[async_trait]
impl ZoneApi for FakeZone {
    async fn list_record_sets(
        &self,
        _zone_id: &str,
        start: Option<RecordSetCursor>,
    ) -> anyhow::Result<Page<RecordSet, RecordSetCursor>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_list.load(Ordering::SeqCst) {
            anyhow::bail!("zone listing failed");
        }

        let record_sets = self.record_sets.lock().unwrap();
        let begin = match start {
            None => 0,
            Some(cursor) => record_sets
                .iter()
                .position(|record_set| {
                    record_set.name == cursor.name
                        && Some(&record_set.record_type) == cursor.record_type.as_ref()
                        && record_set.set_identifier == cursor.set_identifier
                })
                .expect("fake cursor"),
        };
        let end = (begin + ZONE_PAGE_SIZE).min(record_sets.len());

        let next = record_sets.get(end).map(|record_set| RecordSetCursor {
            name: record_set.name.clone(),
            record_type: Some(record_set.record_type.clone()),
            set_identifier: record_set.set_identifier.clone(),
        });

        Ok(Page {
            items: record_sets[begin..end].to_vec(),
            next,
        })
    }

    async fn change_record_sets(
        &self,
        _zone_id: &str,
        _comment: &str,
        changes: &[Change],
    ) -> anyhow::Result<()> {
        self.change_calls.fetch_add(1, Ordering::SeqCst);

        if self.reject.load(Ordering::SeqCst) {
            anyhow::bail!("InvalidChangeBatch");
        }

        let mut record_sets = self.record_sets.lock().unwrap();

        for change in changes {
            record_sets.retain(|record_set| !same_record(record_set, &change.record_set));

            if change.action == ChangeAction::Upsert {
                record_sets.push(change.record_set.clone());
            }
        }

        self.batches.lock().unwrap().push(changes.to_vec());

        Ok(())
    }
}
