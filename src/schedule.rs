use std::future::Future;
use std::time::Duration;

use tap::TapFallible;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, info_span, instrument, Instrument};

use crate::cluster::Refresh;
use crate::dns::Reconcile;
use crate::error::Error;
use crate::fingerprint::{fingerprint, Fingerprint};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Targets are identical to the last synced snapshot.
    Unchanged,
    /// Number of upserts submitted.
    Synced(usize),
}

/// Drives refresh and reconciliation. Owns the snapshot, so at most one refresh is ever in
/// flight for its cluster binding.
pub struct Scheduler<S, R> {
    snapshot: S,
    reconciler: R,
    last_synced: Option<Fingerprint>,
}

impl<S, R> Scheduler<S, R>
where
    S: Refresh + Send,
    R: Reconcile + Sync,
{
    pub fn new(snapshot: S, reconciler: R) -> Self {
        Self {
            snapshot,
            reconciler,
            last_synced: None,
        }
    }

    /// Removes records left behind by a previous run whose services are gone.
    ///
    /// Skipped when the first refresh fails: pruning against an empty snapshot would
    /// delete every managed record.
    #[instrument(skip(self))]
    pub async fn startup(&mut self) {
        let targets = match self.snapshot.refresh().await {
            Err(err) => {
                error!(%err, "initial refresh failed, skip startup prune");

                return;
            }

            Ok(targets) => targets,
        };

        match self.reconciler.prune(&targets).await {
            Err(err) => error!(%err, "startup prune failed"),
            Ok(removed) => info!(removed, "startup prune done"),
        }
    }

    #[instrument(err, skip(self))]
    pub async fn tick(&mut self) -> Result<TickOutcome, Error> {
        let targets = self.snapshot.refresh().await?;
        let current = fingerprint(&targets)?;

        debug!(last = ?self.last_synced, %current, "compare targets fingerprint");

        if self.last_synced == Some(current) {
            info!("targets haven't changed, skip sync");

            return Ok(TickOutcome::Unchanged);
        }

        let upserted = self.reconciler.sync(&targets).await?;

        info!(upserted, "records updated");

        self.last_synced = Some(current);

        Ok(TickOutcome::Synced(upserted))
    }

    /// Ticks every `period` until `shutdown` resolves. A tick that outlasts the period
    /// delays the next one, and shutdown is only observed between ticks.
    pub async fn run<F>(mut self, period: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        futures_util::pin_mut!(shutdown);

        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(?period, "start reconcile loop");

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("shutdown requested, stop reconcile loop");

                    return;
                }

                _ = ticker.tick() => {}
            }

            let _ = self
                .tick()
                .instrument(info_span!("reconcile tick"))
                .await
                .tap_err(|err| error!(%err, "reconcile tick failed, retry on next tick"));
        }
    }
}
