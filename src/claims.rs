use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::BTreeSet,
    fmt,
};

/// Where a hostname is routed to, as reported in a load balancer status.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RoutingTarget {
    #[serde(rename = "ip")]
    Address(String),
    #[serde(rename = "hostname")]
    LoadBalancer(String),
}

impl RoutingTarget {
    pub fn value(&self) -> &str {
        match self {
            RoutingTarget::Address(value) | RoutingTarget::LoadBalancer(value) => value,
        }
    }
}

impl fmt::Display for RoutingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

/// A resource in the cluster claiming a hostname.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostnameClaim {
    pub owner_id: String,
    pub namespace: String,
    pub hostname: String,
    pub routing_targets: BTreeSet<RoutingTarget>,
}

impl HostnameClaim {
    pub fn new(owner_id: impl ToString, namespace: impl ToString, hostname: impl ToString) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            namespace: namespace.to_string(),
            hostname: hostname.to_string(),
            routing_targets: BTreeSet::new(),
        }
    }

    pub fn with_target(mut self, target: RoutingTarget) -> Self {
        self.routing_targets.insert(target);
        self
    }

    pub fn addresses(&self) -> BTreeSet<&str> {
        self.routing_targets
            .iter()
            .filter_map(|target| match target {
                RoutingTarget::Address(ip) => Some(ip.as_str()),
                RoutingTarget::LoadBalancer(_) => None,
            })
            .collect()
    }

    pub fn load_balancers(&self) -> BTreeSet<&str> {
        self.routing_targets
            .iter()
            .filter_map(|target| match target {
                RoutingTarget::LoadBalancer(hostname) => Some(hostname.as_str()),
                RoutingTarget::Address(_) => None,
            })
            .collect()
    }
}

/// The single owner selected for a hostname.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResolvedBinding {
    pub hostname: String,
    pub owner_id: String,
    pub namespace: String,
}

impl From<&HostnameClaim> for ResolvedBinding {
    fn from(claim: &HostnameClaim) -> Self {
        Self {
            hostname: claim.hostname.clone(),
            owner_id: claim.owner_id.clone(),
            namespace: claim.namespace.clone(),
        }
    }
}
