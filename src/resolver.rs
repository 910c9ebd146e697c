//! Collapses the hostname claims found in the cluster into one owner per hostname.
//!
//! A hostname claimed by several resources is only kept when their targets, taken together, name at most one address
//! and at most one load balancer hostname. The first resource found becomes the owner. Any other hostname is left out
//! of the run entirely.

use crate::{
    claims::{
        HostnameClaim,
        ResolvedBinding,
    },
    config::SyncConfig,
};
use std::collections::{
    BTreeMap,
    BTreeSet,
};

#[derive(Clone, Debug)]
pub struct HostnameResolver {
    domain_filter: String,
}

impl HostnameResolver {
    pub fn new(domain_filter: impl Into<String>) -> Self {
        Self {
            domain_filter: domain_filter.into(),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.domain_filter.clone())
    }

    /// Returns one binding per accepted hostname, ordered by hostname.
    pub fn resolve(&self, claims: &[HostnameClaim]) -> Vec<ResolvedBinding> {
        let mut by_hostname: BTreeMap<&str, Vec<&HostnameClaim>> = BTreeMap::new();
        for claim in claims {
            if !claim.hostname.contains(&self.domain_filter) {
                warn!("Ignoring invalid domain hostname: {:?}", claim.hostname);
                continue;
            }
            by_hostname.entry(claim.hostname.as_str()).or_default().push(claim);
        }

        let mut bindings = Vec::with_capacity(by_hostname.len());
        for (hostname, group) in by_hostname {
            let [owner, duplicates @ ..] = group.as_slice() else {
                continue;
            };

            if duplicates.is_empty() {
                debug!(
                    "Hostname: {hostname:?}, owner: {:?}, namespace: {:?}",
                    owner.owner_id, owner.namespace
                );
                bindings.push(ResolvedBinding::from(*owner));
                continue;
            }

            if let Some(conflict) = conflicting_targets(&group) {
                warn!("Ignoring {hostname:?} hostname as multiple resources are trying to set different targets: {conflict}");
                continue;
            }

            info!(
                "Duplicate host found for {hostname:?}, using {:?} in {:?} namespace",
                owner.owner_id, owner.namespace
            );
            bindings.push(ResolvedBinding::from(*owner));
        }

        bindings
    }
}

/// Describes the conflict if the claims together report more than one address or more than one load balancer hostname.
fn conflicting_targets(group: &[&HostnameClaim]) -> Option<String> {
    let addresses: BTreeSet<&str> = group.iter().flat_map(|claim| claim.addresses()).collect();
    let load_balancers: BTreeSet<&str> = group.iter().flat_map(|claim| claim.load_balancers()).collect();

    if addresses.len() <= 1 && load_balancers.len() <= 1 {
        return None;
    }

    Some(format!("ips={addresses:?} hostnames={load_balancers:?}"))
}
