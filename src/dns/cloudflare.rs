use crate::{
    config::DEFAULT_MAX_ZONE_PAGES,
    error::SyncError,
    records::{
        fqdn,
        Batch,
        ExistingRecord,
        RecordType,
    },
    zone::{
        ZoneReader,
        ZoneWriter,
    },
};
use async_trait::async_trait;
use chrono::prelude::*;
use eyre::{
    bail,
    Context as _,
    Result,
};
use reqwest::Method;
use serde::{
    de::DeserializeOwned,
    Deserialize,
    Serialize,
};
use serde_json::Value;
use std::{
    collections::{
        hash_map::Entry,
        HashMap,
    },
    num::NonZeroUsize,
};

pub const CLOUDFLARE_API_URL: &str = "https://api.cloudflare.com/client/v4";

const RECORDS_PER_PAGE: usize = 100;
/// The zone listing allows at most 50 per page.
const ZONES_PER_PAGE: usize = 50;

/// Wraps the cloudflare api response.
#[derive(Debug, Deserialize)]
struct ApiResult<T> {
    #[serde(default)]
    errors: Value,
    result: T,
    result_info: Option<ApiResultInfo>,
    success: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResultInfo {
    total_pages: usize,
}

/// A cloudflare zone as returned by the zone listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct ZoneInfo {
    pub id: String,
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub name_servers: Vec<String>,
    pub paused: Option<bool>,
}

/// A cloudflare dns record.
///
/// See https://developers.cloudflare.com/api/resources/dns/subresources/records/methods/list/
#[derive(Debug, Serialize, Deserialize)]
pub struct DnsRecordInfo {
    pub comment: Option<String>,
    pub content: String,
    pub created_on: Option<DateTime<Utc>>,
    pub id: String,
    pub modified_on: Option<DateTime<Utc>>,
    /// Without trailing dot.
    pub name: String,
    #[serde(default)]
    pub proxied: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    pub ttl: i64,
    #[serde(rename = "type")]
    pub record_type: String,
}

/// Request payload for one record of a batch create.
///
/// See https://developers.cloudflare.com/api/resources/dns/subresources/records/methods/batch/
#[derive(Debug, Serialize, Deserialize)]
pub struct DnsRecordModification {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    posts: &'a [DnsRecordModification],
}

/// A cloudflare zone. Either the zone name (such as "example.com") or the cloudflare id of it.
#[derive(Clone, Debug)]
pub enum Zone {
    Identifier(String),
    Name(String),
}

impl Zone {
    pub fn id(id: impl ToString) -> Self {
        Zone::Identifier(id.to_string())
    }

    pub fn name(name: impl ToString) -> Self {
        Zone::Name(name.to_string())
    }

    pub async fn lookup_id(self, api: &CloudflareApi) -> Result<Option<String>> {
        match self {
            Zone::Identifier(id) => Ok(Some(id)),
            Zone::Name(name) => {
                debug!(?name, "looking up zone by name");
                let zones = api.list_zones().await?;
                Ok(zones.into_iter().find(|it| it.name == name).map(|it| it.id))
            }
        }
    }
}

/// Client for the parts of the cloudflare api needed to read a zone and batch-create records in it.
#[derive(Clone)]
pub struct CloudflareApi {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
    max_pages: NonZeroUsize,
}

impl CloudflareApi {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: CLOUDFLARE_API_URL.to_string(),
            api_token: api_token.into(),
            max_pages: NonZeroUsize::new(DEFAULT_MAX_ZONE_PAGES).unwrap_or(NonZeroUsize::MIN),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Listings needing more pages than this fail instead of returning a partial result.
    pub fn with_max_pages(mut self, max_pages: NonZeroUsize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// List all cloudflare zones the token can see.
    pub async fn list_zones(&self) -> Result<Vec<ZoneInfo>> {
        self.get_all_pages("/zones", ZONES_PER_PAGE).await
    }

    /// List every DNS record in a cloudflare zone.
    pub async fn list_dns_records(&self, zone_identifier: impl AsRef<str>) -> Result<Vec<DnsRecordInfo>> {
        let zone_identifier = zone_identifier.as_ref();
        self.get_all_pages(&format!("/zones/{zone_identifier}/dns_records"), RECORDS_PER_PAGE)
            .await
            .with_context(|| format!("failed to list dns records of zone {zone_identifier:?}"))
    }

    /// Create all records in one request. Cloudflare applies a batch atomically: either every record is created or
    /// none is.
    pub async fn create_dns_records(
        &self,
        zone_identifier: impl AsRef<str>,
        records: &[DnsRecordModification],
    ) -> Result<()> {
        let zone_identifier = zone_identifier.as_ref();
        info!(zone = %zone_identifier, count = records.len(), "creating dns records");
        self.request::<Value, _>(
            &format!("/zones/{zone_identifier}/dns_records/batch"),
            &[],
            Some(BatchRequest { posts: records }),
            Method::POST,
        )
        .await?;
        Ok(())
    }

    async fn get_all_pages<R>(&self, path: &str, per_page: usize) -> Result<Vec<R>>
    where
        R: DeserializeOwned,
    {
        let per_page = per_page.to_string();
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            if page > self.max_pages.get() {
                bail!("listing {path} did not finish within {} pages", self.max_pages);
            }

            let page_param = page.to_string();
            let body = self
                .request::<Vec<R>, ()>(
                    path,
                    &[("page", page_param.as_str()), ("per_page", per_page.as_str())],
                    None,
                    Method::GET,
                )
                .await?;

            let fetched = body.result.len();
            items.extend(body.result);
            debug!(%path, page, fetched, total = items.len(), "fetched page");

            match body.result_info {
                Some(info) if page < info.total_pages && fetched > 0 => page += 1,
                _ => break,
            }
        }

        Ok(items)
    }

    async fn request<R, B>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: Option<B>,
        method: Method,
    ) -> Result<ApiResult<R>>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        let req = self
            .client
            .request(method, &url)
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .query(query);

        let req = if let Some(body) = body { req.json(&body) } else { req };

        let res = req.send().await?;

        if !res.status().is_success() {
            bail!(
                "cloudflare api error: status={:?}, body={:?}",
                res.status(),
                res.text().await?
            );
        }

        #[cfg(debug_assertions)]
        let body: ApiResult<R> = {
            let body: Value = res.json().await?;
            match serde_json::from_value(body.clone()) {
                Err(err) => bail!(
                    "failed to parse api response: {err:?}: {}",
                    serde_json::to_string_pretty(&body)?
                ),
                Ok(it) => it,
            }
        };

        #[cfg(not(debug_assertions))]
        let body: ApiResult<R> = res.json().await?;

        if !body.success {
            bail!("cloudflare api request to {path} failed: {}", body.errors);
        }

        Ok(body)
    }
}

/// Groups cloudflare records, one per value, into record sets keyed by fully qualified name.
///
/// A name can carry several types. The first type seen for a name is kept.
pub fn existing_records(records: Vec<DnsRecordInfo>) -> HashMap<String, ExistingRecord> {
    let mut existing: HashMap<String, ExistingRecord> = HashMap::new();
    for record in records {
        let name = fqdn(&record.name);
        trace!(?name, r#type = %record.record_type, "found entry");
        match existing.entry(name) {
            Entry::Occupied(mut entry) => {
                let set = entry.get_mut();
                if set.record_type == record.record_type {
                    set.values.push(record.content);
                }
            }
            Entry::Vacant(entry) => {
                let name = entry.key().clone();
                entry.insert(ExistingRecord {
                    name,
                    record_type: record.record_type,
                    values: vec![record.content],
                });
            }
        }
    }
    existing
}

#[async_trait]
impl ZoneReader for CloudflareApi {
    async fn list_existing(&self, zone_id: &str) -> Result<HashMap<String, ExistingRecord>, SyncError> {
        let records = self
            .list_dns_records(zone_id)
            .await
            .map_err(|err| SyncError::zone_unavailable(zone_id, err))?;
        debug!(zone = %zone_id, records = records.len(), "listed zone");
        Ok(existing_records(records))
    }
}

#[async_trait]
impl ZoneWriter for CloudflareApi {
    async fn apply_batch(&self, zone_id: &str, batch: &Batch) -> Result<()> {
        let records: Vec<_> = batch
            .changes
            .iter()
            .map(|change| DnsRecordModification {
                name: change.record_name.trim_end_matches('.').to_string(),
                record_type: change.record_type,
                content: change.value.clone(),
                ttl: Some(change.ttl),
                comment: None,
            })
            .collect();
        self.create_dns_records(zone_id, &records).await
    }
}
