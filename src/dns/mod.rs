use std::fmt::{self, Display, Formatter};
use std::ops::Deref;

use async_trait::async_trait;

use crate::error::Error;
use crate::page::Page;
use crate::targets::Targets;

pub use managed::{ManagedId, MANAGED_TAG};
pub use reconciler::Reconciler;

mod managed;
mod reconciler;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordType {
    Srv,
    Other(String),
}

impl RecordType {
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::Srv => "SRV",
            RecordType::Other(kind) => kind,
        }
    }
}

impl From<&str> for RecordType {
    fn from(kind: &str) -> Self {
        match kind {
            "SRV" => RecordType::Srv,
            other => RecordType::Other(other.to_string()),
        }
    }
}

impl Display for RecordType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet {
    pub name: String,
    pub record_type: RecordType,
    pub set_identifier: Option<String>,
    pub ttl: Option<i64>,
    pub weight: Option<i64>,
    pub values: Vec<String>,
}

impl RecordSet {
    /// Whether the record follows the owned-record convention: SRV type and a
    /// `managed:` set identifier.
    pub fn is_managed(&self) -> bool {
        self.record_type == RecordType::Srv
            && self
                .set_identifier
                .as_deref()
                .map_or(false, ManagedId::is_managed)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ChangeAction {
    Upsert,
    Delete,
}

impl Display for ChangeAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ChangeAction::Upsert => f.write_str("UPSERT"),
            ChangeAction::Delete => f.write_str("DELETE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub action: ChangeAction,
    pub record_set: RecordSet,
}

/// Where the next page of a record set listing starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSetCursor {
    pub name: String,
    pub record_type: Option<RecordType>,
    pub set_identifier: Option<String>,
}

/// Hosted zone operations of the DNS provider.
#[async_trait]
pub trait ZoneApi: Send + Sync {
    /// Lists at most 100 record sets starting at `start`.
    async fn list_record_sets(
        &self,
        zone_id: &str,
        start: Option<RecordSetCursor>,
    ) -> anyhow::Result<Page<RecordSet, RecordSetCursor>>;

    /// Applies all changes in one atomic request.
    async fn change_record_sets(
        &self,
        zone_id: &str,
        comment: &str,
        changes: &[Change],
    ) -> anyhow::Result<()>;
}

#[async_trait]
impl<Z, T> ZoneApi for T
where
    T: Deref<Target = Z> + Send + Sync,
    Z: ZoneApi + ?Sized,
{
    async fn list_record_sets(
        &self,
        zone_id: &str,
        start: Option<RecordSetCursor>,
    ) -> anyhow::Result<Page<RecordSet, RecordSetCursor>> {
        self.deref().list_record_sets(zone_id, start).await
    }

    async fn change_record_sets(
        &self,
        zone_id: &str,
        comment: &str,
        changes: &[Change],
    ) -> anyhow::Result<()> {
        self.deref()
            .change_record_sets(zone_id, comment, changes)
            .await
    }
}

/// Converges the managed records of a zone towards a [`Targets`] snapshot.
#[async_trait]
pub trait Reconcile {
    /// Deletes managed records whose service is absent from `targets`.
    async fn prune(&self, targets: &Targets) -> Result<usize, Error>;

    /// Upserts one record per service present in `targets`.
    async fn sync(&self, targets: &Targets) -> Result<usize, Error>;

    /// Deletes every managed record.
    async fn remove_all_managed(&self) -> Result<usize, Error>;
}
