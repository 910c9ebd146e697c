use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that end a registry run.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The cluster could not be listed. Nothing has been written.
    #[error("unable to list hostname claims")]
    SourceUnavailable(#[source] BoxError),

    /// The zone could not be read completely. Nothing has been written.
    #[error("unable to list records of zone {zone:?}")]
    ZoneUnavailable {
        zone: String,
        #[source]
        source: BoxError,
    },

    /// At least one batch was rejected. Batches that went through are kept.
    #[error("failed to create {} record(s) {failed:?}: {}", .failed.len(), .last_error.as_deref().unwrap_or("unknown error"))]
    BatchApply {
        failed: Vec<String>,
        succeeded: Vec<String>,
        last_error: Option<String>,
    },
}

impl SyncError {
    pub fn source_unavailable(err: impl Into<BoxError>) -> Self {
        SyncError::SourceUnavailable(err.into())
    }

    pub fn zone_unavailable(zone: impl ToString, err: impl Into<BoxError>) -> Self {
        SyncError::ZoneUnavailable {
            zone: zone.to_string(),
            source: err.into(),
        }
    }
}
