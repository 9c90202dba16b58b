use std::path::Path;
use std::time::Duration;

use anyhow::ensure;
use figment::providers::{Env, Format, Json, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::Overrides;

const DEFAULT_CONFIG_FILE: &str = "ecs-dns.toml";
const ENV_PREFIX: &str = "ECS_DNS_";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    pub region: String,
    pub cluster: String,
    /// Hosted zone id.
    pub zone: String,
    pub domain: String,
    /// Seconds between two reconciliation passes.
    pub interval: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jaeger_agent: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: "us-east-1".into(),
            cluster: String::new(),
            zone: String::new(),
            domain: String::new(),
            interval: 10,
            jaeger_agent: None,
        }
    }
}

impl Config {
    /// Defaults, then the config file, then `ECS_DNS_*` variables, then the command line.
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> anyhow::Result<Self> {
        Self::figment(file, overrides)
            .extract()
            .map_err(|err| anyhow::anyhow!("failed to load configuration: {}", err))
    }

    fn figment(file: Option<&Path>, overrides: &Overrides) -> Figment {
        let figment = Figment::from(Serialized::defaults(Config::default()));

        let figment = match file {
            Some(path) if path.extension().map_or(false, |ext| ext == "json") => {
                figment.merge(Json::file(path))
            }
            Some(path) => figment.merge(Toml::file(path)),
            None => figment.merge(Toml::file(DEFAULT_CONFIG_FILE)),
        };

        figment
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(overrides))
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// Settings every command needs.
    pub fn validate_zone(&self) -> anyhow::Result<()> {
        ensure!(!self.zone.is_empty(), "hosted zone id is not configured");
        ensure!(!self.domain.is_empty(), "domain is not configured");

        Ok(())
    }

    /// Settings needed to read the cluster and run the periodic loop.
    pub fn validate_cluster(&self) -> anyhow::Result<()> {
        self.validate_zone()?;

        ensure!(!self.cluster.is_empty(), "cluster is not configured");
        ensure!(self.interval > 0, "interval must be at least one second");

        Ok(())
    }
}
