use crate::{
    config::SyncConfig,
    error::SyncError,
    records::Batch,
    zone::ZoneWriter,
};
use std::time::Duration;

/// What happened to the records of one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    /// Error of the most recent failed batch.
    pub last_error: Option<String>,
}

impl ApplyOutcome {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// The created record names, or an error listing the ones that could not be created.
    pub fn into_result(self) -> Result<Vec<String>, SyncError> {
        if self.is_success() {
            return Ok(self.succeeded);
        }
        Err(SyncError::BatchApply {
            failed: self.failed,
            succeeded: self.succeeded,
            last_error: self.last_error,
        })
    }
}

/// Sends batches to the zone one after the other, waiting `interval` in between.
///
/// A failed batch does not stop the run and nothing is rolled back. The wait also happens in dry-run mode so that a
/// dry run takes as long as the real one would.
#[derive(Clone, Debug)]
pub struct BatchApplier {
    zone_id: String,
    dry_run: bool,
    interval: Duration,
}

impl BatchApplier {
    pub fn new(zone_id: impl Into<String>, dry_run: bool, interval: Duration) -> Self {
        Self {
            zone_id: zone_id.into(),
            dry_run,
            interval,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.zone_id.clone(), config.dry_run, config.batch_interval)
    }

    pub async fn apply<W>(&self, batches: Vec<Batch>, writer: &W) -> ApplyOutcome
    where
        W: ZoneWriter + ?Sized,
    {
        let mut outcome = ApplyOutcome::default();
        let total = batches.len();

        info!("Changing records in {total} batch(es) for zone: {}...", self.zone_id);

        for (index, batch) in batches.into_iter().enumerate() {
            let names = batch.record_names();
            debug!(batch = index + 1, total, "record set to change: {batch:?}");

            if self.dry_run {
                info!("Dry run, would have performed the following...");
                for change in &batch.changes {
                    info!(
                        "Action: {:?}, Hostname: {:?}, Values: {:?}",
                        change.action.to_string(),
                        change.record_name,
                        [&change.value]
                    );
                }
                outcome.succeeded.extend(names);
            } else {
                match writer.apply_batch(&self.zone_id, &batch).await {
                    Ok(()) => {
                        info!("Changed record set: {names:?}");
                        outcome.succeeded.extend(names);
                    }
                    Err(err) => {
                        error!("Failed to change record set {names:?}: {err:#}");
                        outcome.failed.extend(names);
                        outcome.last_error = Some(format!("{err:#}"));
                    }
                }
            }

            if index + 1 < total {
                info!("Waiting for interval: {}...", humantime::format_duration(self.interval));
                tokio::time::sleep(self.interval).await;
            }
        }

        outcome
    }
}
