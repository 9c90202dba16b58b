use anyhow::Result;
use clap::Parser;
use tracing::info;

use crate::cli::Cli;
use crate::config::Config;

pub mod aws;
pub mod cli;
pub mod cluster;
pub mod config;
mod control;
pub mod dns;
pub mod error;
pub mod fingerprint;
pub mod page;
pub mod schedule;
pub mod targets;
#[cfg(test)]
mod testing;
mod trace;

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref(), &cli.overrides)?;

    trace::init_tracing(config.jaeger_agent.as_deref())?;

    info!(?config, command = ?cli.command, "load config done");

    let result = control::run_command(cli.command, &config).await;

    trace::stop_tracing();

    result
}
