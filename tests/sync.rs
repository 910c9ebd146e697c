use async_trait::async_trait;
use ingress_dns_registry::{
    claims::{
        HostnameClaim,
        RoutingTarget,
    },
    config::SyncConfig,
    error::SyncError,
    records::{
        Batch,
        ExistingRecord,
    },
    sync::{
        create_registry,
        SyncReport,
    },
    zone::{
        ClaimSource,
        ZoneReader,
        ZoneWriter,
    },
};
use std::{
    collections::HashMap,
    sync::Mutex,
    time::Duration,
};

struct StaticSource(Result<Vec<HostnameClaim>, String>);

#[async_trait]
impl ClaimSource for StaticSource {
    async fn list_claims(&self) -> Result<Vec<HostnameClaim>, SyncError> {
        self.0
            .clone()
            .map_err(|err| SyncError::source_unavailable(eyre::eyre!(err)))
    }
}

/// A zone kept in memory. Writes of the batches listed in `failing` are rejected.
#[derive(Default)]
struct MemoryZone {
    records: Mutex<HashMap<String, ExistingRecord>>,
    writes: Mutex<Vec<Vec<String>>>,
    failing: Vec<usize>,
    unreadable: bool,
}

impl MemoryZone {
    fn with_record(self, name: &str) -> Self {
        self.records.lock().unwrap().insert(
            name.to_string(),
            ExistingRecord {
                name: name.to_string(),
                record_type: "A".to_string(),
                values: vec!["1.1.1.1".to_string()],
            },
        );
        self
    }

    fn writes(&self) -> Vec<Vec<String>> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ZoneReader for MemoryZone {
    async fn list_existing(&self, zone_id: &str) -> Result<HashMap<String, ExistingRecord>, SyncError> {
        if self.unreadable {
            return Err(SyncError::zone_unavailable(zone_id, eyre::eyre!("listing did not finish")));
        }
        Ok(self.records.lock().unwrap().clone())
    }
}

#[async_trait]
impl ZoneWriter for MemoryZone {
    async fn apply_batch(&self, _zone_id: &str, batch: &Batch) -> eyre::Result<()> {
        let index = {
            let mut writes = self.writes.lock().unwrap();
            writes.push(batch.record_names());
            writes.len() - 1
        };
        if self.failing.contains(&index) {
            eyre::bail!("throttled");
        }
        let mut records = self.records.lock().unwrap();
        for change in &batch.changes {
            records.insert(
                change.record_name.clone(),
                ExistingRecord {
                    name: change.record_name.clone(),
                    record_type: change.record_type.to_string(),
                    values: vec![change.value.clone()],
                },
            );
        }
        Ok(())
    }
}

fn config(batch_size: usize) -> SyncConfig {
    SyncConfig::new("zone-1", "cluster-a", "example.com")
        .unwrap()
        .with_batch_size(batch_size)
        .unwrap()
        .with_batch_interval(Duration::from_secs(60))
}

fn claims(hosts: &[&str]) -> StaticSource {
    StaticSource(Ok(hosts
        .iter()
        .enumerate()
        .map(|(i, host)| {
            HostnameClaim::new(format!("ing-{i}"), "default", host)
                .with_target(RoutingTarget::Address("10.0.0.1".to_string()))
        })
        .collect()))
}

#[tokio::test(start_paused = true)]
async fn second_run_has_nothing_to_do() {
    let source = claims(&["a.example.com", "b.example.com", "c.example.com"]);
    let zone = MemoryZone::default();
    let config = config(2);

    let first = create_registry(&config, &source, &zone).await.unwrap();
    assert_eq!(
        first,
        SyncReport::Applied {
            created: vec![
                "a.example.com.".to_string(),
                "b.example.com.".to_string(),
                "c.example.com.".to_string(),
            ],
            dry_run: false,
        }
    );
    assert_eq!(zone.writes().len(), 2);

    let second = create_registry(&config, &source, &zone).await.unwrap();
    assert_eq!(second, SyncReport::NoChanges);
    assert_eq!(zone.writes().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn existing_names_are_not_written() {
    let source = claims(&["a.example.com", "b.example.com"]);
    let zone = MemoryZone::default().with_record("a.example.com.");

    let report = create_registry(&config(50), &source, &zone).await.unwrap();

    assert_eq!(zone.writes(), vec![vec!["b.example.com.".to_string()]]);
    assert!(matches!(report, SyncReport::Applied { created, .. } if created == vec!["b.example.com."]));
}

#[tokio::test(start_paused = true)]
async fn failed_batch_is_reported_and_the_rest_is_applied() {
    let source = claims(&[
        "a.example.com",
        "b.example.com",
        "c.example.com",
        "d.example.com",
        "e.example.com",
    ]);
    let zone = MemoryZone {
        failing: vec![1],
        ..Default::default()
    };

    let err = create_registry(&config(2), &source, &zone).await.unwrap_err();

    assert_eq!(zone.writes().len(), 3);
    match err {
        SyncError::BatchApply {
            failed,
            succeeded,
            last_error,
        } => {
            assert_eq!(failed, vec!["c.example.com.", "d.example.com."]);
            assert_eq!(succeeded, vec!["a.example.com.", "b.example.com.", "e.example.com."]);
            assert_eq!(last_error.as_deref(), Some("throttled"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // a re-run only retries what failed
    let retry_zone = MemoryZone {
        records: Mutex::new(zone.records.lock().unwrap().clone()),
        ..Default::default()
    };
    create_registry(&config(2), &source, &retry_zone).await.unwrap();
    assert_eq!(
        retry_zone.writes(),
        vec![vec!["c.example.com.".to_string(), "d.example.com.".to_string()]]
    );
}

#[tokio::test(start_paused = true)]
async fn dry_run_leaves_the_zone_alone() {
    let source = claims(&["a.example.com", "b.example.com"]);
    let zone = MemoryZone::default();
    let config = config(1).with_dry_run(true);

    let report = create_registry(&config, &source, &zone).await.unwrap();

    assert!(zone.writes().is_empty());
    assert!(zone.records.lock().unwrap().is_empty());
    assert!(matches!(report, SyncReport::Applied { dry_run: true, created } if created.len() == 2));
}

#[tokio::test(start_paused = true)]
async fn read_failures_abort_before_writing() {
    let zone = MemoryZone::default();
    let err = create_registry(&config(50), &StaticSource(Err("apiserver down".into())), &zone)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::SourceUnavailable(_)));
    assert!(zone.writes().is_empty());

    let zone = MemoryZone {
        unreadable: true,
        ..Default::default()
    };
    let err = create_registry(&config(50), &claims(&["a.example.com"]), &zone)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::ZoneUnavailable { .. }));
    assert!(zone.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn conflicting_and_foreign_hostnames_are_skipped() {
    let source = StaticSource(Ok(vec![
        HostnameClaim::new("a", "ns1", "foo.example.com").with_target(RoutingTarget::Address("1.1.1.1".into())),
        HostnameClaim::new("b", "ns2", "foo.example.com").with_target(RoutingTarget::Address("2.2.2.2".into())),
        HostnameClaim::new("c", "ns1", "bar.example.org"),
        HostnameClaim::new("d", "ns3", "baz.example.com"),
    ]));
    let zone = MemoryZone::default();

    create_registry(&config(50), &source, &zone).await.unwrap();

    let records = zone.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records["baz.example.com."].values,
        vec!["\"heritage=external-dns,external-dns/owner=cluster-a,external-dns/resource=ingress/ns3/d\""]
    );
}
