use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "ecs-dns", version, about = "keep SRV records in sync with ECS tasks")]
pub struct Cli {
    /// Config file, defaults to ./ecs-dns.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

/// Command line values that take precedence over the config file and environment.
#[derive(Debug, Default, Args, Serialize)]
pub struct Overrides {
    /// Domain the SRV records are created under
    #[arg(long, global = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Hosted zone id
    #[arg(long, global = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,

    /// Poll interval in seconds
    #[arg(long, global = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,

    /// Region of the ECS cluster
    #[arg(long, global = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// ECS cluster name
    #[arg(long, global = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Prune, then keep upserting records on every interval
    #[command(alias = "d")]
    Daemon,

    /// Prune dead services and upsert the live ones once
    Sync,

    /// Remove all managed SRV records
    Remove,
}
