use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_ecs::config::Region;
use tracing::{error, info, instrument};

pub use ec2::Ec2;
pub use ecs::Ecs;
pub use route53::Route53;

mod ec2;
mod ecs;
mod route53;

/// Loads the shared SDK configuration and resolves credentials once. Failing here is fatal
/// for the process.
#[instrument(err)]
pub async fn load_session(region: &str) -> Result<SdkConfig> {
    let config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await;

    ensure_credentials(&config).await?;

    info!(region, "load aws session done");

    Ok(config)
}

async fn ensure_credentials(config: &SdkConfig) -> Result<()> {
    let provider = match config.credentials_provider() {
        None => {
            error!("no aws credentials provider found");

            anyhow::bail!("no aws credentials provider found");
        }

        Some(provider) => provider,
    };

    provider
        .provide_credentials()
        .await
        .map_err(|err| {
            error!(%err, "resolve aws credentials failed");

            err
        })
        .context("resolve aws credentials")?;

    Ok(())
}
