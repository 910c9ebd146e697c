use crate::error::SyncError;
use std::{
    num::NonZeroUsize,
    time::Duration,
};

pub const DEFAULT_CHANGE_BATCH_SIZE: usize = 50;
pub const DEFAULT_CHANGE_BATCH_INTERVAL: Duration = Duration::from_secs(60);

/// Upper bound on zone listing pages. A paginator that keeps handing out pages past this is treated as broken.
pub const DEFAULT_MAX_ZONE_PAGES: usize = 30;

/// Everything a single registry run needs. Built once from the command line and passed to the resolver, planner and
/// apply engine.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub dry_run: bool,
    pub zone_id: String,
    pub batch_size: NonZeroUsize,
    pub batch_interval: Duration,
    /// Prepended to every hostname to form the TXT record name.
    pub record_prefix: String,
    /// Value of `external-dns/owner` in the TXT record.
    pub owner: String,
    /// Hostnames not containing this substring are ignored.
    pub domain_filter: String,
}

impl SyncConfig {
    /// Creates a config with defaults for the optional values. Fails when a required value is empty.
    pub fn new(
        zone_id: impl Into<String>,
        owner: impl Into<String>,
        domain_filter: impl Into<String>,
    ) -> Result<Self, SyncError> {
        let config = Self {
            dry_run: false,
            zone_id: zone_id.into(),
            batch_size: NonZeroUsize::new(DEFAULT_CHANGE_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN),
            batch_interval: DEFAULT_CHANGE_BATCH_INTERVAL,
            record_prefix: String::new(),
            owner: owner.into(),
            domain_filter: domain_filter.into(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self, SyncError> {
        self.batch_size = NonZeroUsize::new(batch_size)
            .ok_or_else(|| SyncError::InvalidConfig("change batch size must be greater than zero".to_string()))?;
        Ok(self)
    }

    pub fn with_batch_interval(mut self, interval: Duration) -> Self {
        self.batch_interval = interval;
        self
    }

    pub fn with_record_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.record_prefix = prefix.into();
        self
    }

    fn validate(&self) -> Result<(), SyncError> {
        for (value, name) in [
            (&self.zone_id, "zone"),
            (&self.owner, "external-dns-owner"),
            (&self.domain_filter, "domain-filter"),
        ] {
            if value.trim().is_empty() {
                return Err(SyncError::InvalidConfig(format!("the {name} value is required")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SyncConfig::new("zone", "cluster-a", "example.com").unwrap();
        assert!(!config.dry_run);
        assert_eq!(config.batch_size.get(), 50);
        assert_eq!(config.batch_interval, Duration::from_secs(60));
        assert_eq!(config.record_prefix, "");
    }

    #[test]
    fn required_values() {
        assert!(matches!(
            SyncConfig::new("zone", "", "example.com"),
            Err(SyncError::InvalidConfig(msg)) if msg.contains("external-dns-owner")
        ));
        assert!(matches!(
            SyncConfig::new("zone", "owner", " "),
            Err(SyncError::InvalidConfig(msg)) if msg.contains("domain-filter")
        ));
        assert!(SyncConfig::new("", "owner", "example.com").is_err());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = SyncConfig::new("zone", "owner", "example.com").unwrap();
        assert!(config.clone().with_batch_size(0).is_err());
        assert_eq!(config.with_batch_size(3).unwrap().batch_size.get(), 3);
    }
}
