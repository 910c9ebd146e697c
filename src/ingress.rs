use crate::{
    claims::{
        HostnameClaim,
        RoutingTarget,
    },
    error::SyncError,
    zone::ClaimSource,
};
use async_trait::async_trait;
use k8s_openapi::api::networking::v1::Ingress;
use kube::{
    api::ListParams,
    Api,
    ResourceExt as _,
};
use std::collections::BTreeSet;

pub const INGRESS_LIST_PAGE_SIZE: u32 = 100;

/// Reads hostname claims from the rules of all Ingress objects in the cluster.
#[derive(Clone)]
pub struct IngressSource {
    client: kube::Client,
}

impl IngressSource {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    async fn list_ingresses(&self) -> Result<Vec<Ingress>, kube::Error> {
        let api = Api::<Ingress>::all(self.client.clone());
        let mut params = ListParams::default().limit(INGRESS_LIST_PAGE_SIZE);
        let mut ingresses = Vec::new();

        loop {
            let list = api.list(&params).await?;
            ingresses.extend(list.items);

            match list.metadata.continue_ {
                Some(token) if !token.is_empty() => params = params.continue_token(&token),
                _ => break,
            }
        }

        debug!("Found {} ingresses", ingresses.len());
        Ok(ingresses)
    }
}

#[async_trait]
impl ClaimSource for IngressSource {
    async fn list_claims(&self) -> Result<Vec<HostnameClaim>, SyncError> {
        let ingresses = self.list_ingresses().await.map_err(SyncError::source_unavailable)?;
        Ok(ingresses.iter().flat_map(claims_from_ingress).collect())
    }
}

/// One claim per rule. A rule without a host yields a claim with an empty hostname.
pub fn claims_from_ingress(ingress: &Ingress) -> Vec<HostnameClaim> {
    let name = ingress.name_any();
    let ns = ingress.metadata.namespace.as_deref().unwrap_or("default");
    let targets = routing_targets(ingress);

    let Some(rules) = ingress.spec.as_ref().and_then(|spec| spec.rules.as_ref()) else {
        trace!("Ingress {ns}/{name} has no rules");
        return Vec::new();
    };

    rules
        .iter()
        .map(|rule| HostnameClaim {
            owner_id: name.clone(),
            namespace: ns.to_string(),
            hostname: rule.host.clone().unwrap_or_default(),
            routing_targets: targets.clone(),
        })
        .collect()
}

fn routing_targets(ingress: &Ingress) -> BTreeSet<RoutingTarget> {
    let Some(lb_ingress) = ingress
        .status
        .as_ref()
        .and_then(|status| status.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
    else {
        return BTreeSet::new();
    };

    lb_ingress
        .iter()
        .flat_map(|entry| {
            let ip = entry
                .ip
                .as_deref()
                .filter(|ip| !ip.is_empty())
                .map(|ip| RoutingTarget::Address(ip.to_string()));
            let hostname = entry
                .hostname
                .as_deref()
                .filter(|hostname| !hostname.is_empty())
                .map(|hostname| RoutingTarget::LoadBalancer(hostname.to_string()));
            ip.into_iter().chain(hostname)
        })
        .collect()
}
