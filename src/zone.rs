//! Seams between the registry run and the outside world.

use crate::{
    claims::HostnameClaim,
    error::SyncError,
    records::{
        Batch,
        ExistingRecord,
    },
};
use async_trait::async_trait;
use std::collections::HashMap;

/// Lists the hostnames claimed by resources in the cluster.
#[async_trait]
pub trait ClaimSource: Send + Sync {
    async fn list_claims(&self) -> Result<Vec<HostnameClaim>, SyncError>;
}

/// Reads the records of a DNS zone, keyed by fully qualified name.
#[async_trait]
pub trait ZoneReader: Send + Sync {
    async fn list_existing(&self, zone_id: &str) -> Result<HashMap<String, ExistingRecord>, SyncError>;
}

/// Writes a batch of changes to a DNS zone as a single request.
///
/// The error is only logged and reported; it does not influence what happens to the remaining batches.
#[async_trait]
pub trait ZoneWriter: Send + Sync {
    async fn apply_batch(&self, zone_id: &str, batch: &Batch) -> eyre::Result<()>;
}
