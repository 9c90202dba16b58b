use anyhow::Result;
use tokio::signal;
use tracing::{error, info};

use crate::aws::{self, Ec2, Ecs, Route53};
use crate::cli::Command;
use crate::cluster::{ClusterSnapshot, Refresh};
use crate::config::Config;
use crate::dns::{Reconcile, Reconciler};
use crate::schedule::Scheduler;

pub async fn run_command(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Daemon => run_daemon(config).await,
        Command::Sync => run_sync(config).await,
        Command::Remove => run_remove(config).await,
    }
}

async fn run_daemon(config: &Config) -> Result<()> {
    config.validate_cluster()?;

    let session = aws::load_session(&config.region).await?;

    info!(cluster = %config.cluster, zone = %config.zone, "init aws clients");

    let snapshot = ClusterSnapshot::new(&*config.cluster, Ecs::new(&session), Ec2::new(&session));
    let reconciler = Reconciler::new(Route53::new(&session), &*config.zone, &*config.domain);

    let mut scheduler = Scheduler::new(snapshot, reconciler);

    scheduler.startup().await;

    scheduler
        .run(config.interval(), async {
            match signal::ctrl_c().await {
                Ok(()) => info!("received ctrl-c, exiting"),
                Err(err) => error!(%err, "listen for shutdown signal failed"),
            }
        })
        .await;

    Ok(())
}

async fn run_sync(config: &Config) -> Result<()> {
    config.validate_cluster()?;

    let session = aws::load_session(&config.region).await?;

    let mut snapshot =
        ClusterSnapshot::new(&*config.cluster, Ecs::new(&session), Ec2::new(&session));
    let reconciler = Reconciler::new(Route53::new(&session), &*config.zone, &*config.domain);

    let targets = snapshot.refresh().await?;

    match reconciler.prune(&targets).await {
        Err(err) => error!(%err, "prune failed"),
        Ok(removed) => info!(removed, "prune done"),
    }

    let upserted = reconciler.sync(&targets).await?;

    info!(upserted, "sync done");

    Ok(())
}

async fn run_remove(config: &Config) -> Result<()> {
    config.validate_zone()?;

    let session = aws::load_session(&config.region).await?;

    let reconciler = Reconciler::new(Route53::new(&session), &*config.zone, &*config.domain);

    let removed = reconciler.remove_all_managed().await?;

    info!(removed, "remove all managed records done");

    Ok(())
}
