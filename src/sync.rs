use crate::{
    apply::BatchApplier,
    claims::ResolvedBinding,
    config::SyncConfig,
    error::SyncError,
    planner::RecordPlanner,
    resolver::HostnameResolver,
    zone::{
        ClaimSource,
        ZoneReader,
        ZoneWriter,
    },
};
use tracing::instrument;

/// How a run that did not fail ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncReport {
    /// Every ownership record already exists.
    NoChanges,
    /// All planned records were created, or would have been in a dry run.
    Applied { created: Vec<String>, dry_run: bool },
}

/// Lists and resolves the hostname claims without touching DNS.
#[instrument(level = "debug", skip_all)]
pub async fn resolve_claims<S>(resolver: &HostnameResolver, source: &S) -> Result<Vec<ResolvedBinding>, SyncError>
where
    S: ClaimSource + ?Sized,
{
    let claims = source.list_claims().await?;
    debug!("Found {} hostname claims", claims.len());
    Ok(resolver.resolve(&claims))
}

/// Creates the missing ownership records for all hostnames claimed in the cluster.
///
/// Both sides are read before anything is written, so a failing read never leaves a half-applied run. Once writing
/// has started, failed batches are collected and reported at the end.
#[instrument(level = "debug", skip_all, fields(zone = %config.zone_id, dry_run = config.dry_run))]
pub async fn create_registry<S, Z>(config: &SyncConfig, source: &S, zone: &Z) -> Result<SyncReport, SyncError>
where
    S: ClaimSource + ?Sized,
    Z: ZoneReader + ZoneWriter + ?Sized,
{
    let bindings = resolve_claims(&HostnameResolver::from_config(config), source).await?;
    info!("Resolved {} unique hostnames", bindings.len());

    let existing = zone.list_existing(&config.zone_id).await?;
    debug!("Zone {} has {} record names", config.zone_id, existing.len());

    let batches = RecordPlanner::from_config(config).plan(&bindings, &existing);
    if batches.is_empty() {
        info!("No changes to make to zone {}", config.zone_id);
        return Ok(SyncReport::NoChanges);
    }

    let created = BatchApplier::from_config(config)
        .apply(batches, zone)
        .await
        .into_result()?;

    Ok(SyncReport::Applied {
        created,
        dry_run: config.dry_run,
    })
}
