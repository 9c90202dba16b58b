use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{operation} failed: {source:#}")]
    Upstream {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("describe task {arn} failed: {reason}")]
    TaskDescribe { arn: String, reason: String },

    #[error("change batch rejected: {0:#}")]
    Rejected(#[source] anyhow::Error),

    #[error("compute fingerprint failed: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// Tags a collaborator failure with the call that produced it.
pub trait UpstreamContext<T> {
    fn upstream(self, operation: &'static str) -> Result<T, Error>;
}

impl<T> UpstreamContext<T> for anyhow::Result<T> {
    fn upstream(self, operation: &'static str) -> Result<T, Error> {
        self.map_err(|source| Error::Upstream { operation, source })
    }
}
