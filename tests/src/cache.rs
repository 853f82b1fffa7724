use std::net::IpAddr;
use std::sync::Arc;

use lanscope_core::discovery::TableScanProvider;
use lanscope_core::{CacheStore, Enrichment, OverrideTable};

use crate::support::{PRINTER_IP, SeededTable, StubResolver, controller, fast_options};

#[tokio::test]
async fn discovery_results_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ip_info_cache.json");

    {
        let mut session = controller(
            CacheStore::open(&path).unwrap(),
            Arc::new(StubResolver::printer_only()),
            OverrideTable::empty(),
            fast_options(),
        );
        let provider = TableScanProvider::new(SeededTable::two_hosts(), Enrichment::none());
        session.run_discovery(&provider).await;
    }

    let reopened = CacheStore::open(&path).unwrap();
    let record = reopened.get(IpAddr::V4(PRINTER_IP)).unwrap();

    assert_eq!(reopened.len(), 2);
    assert_eq!(record.payload["hostname"], "printer.local");
    assert_eq!(record.payload["source"], "lan-discovery");
    assert_eq!(reopened.find("PRINTER").len(), 1);
}

#[tokio::test]
async fn bypass_replaces_the_cached_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ip_info_cache.json");
    let ip: IpAddr = "10.0.0.5".parse().unwrap();

    let mut session = controller(
        CacheStore::open(&path).unwrap(),
        Arc::new(StubResolver::printer_only()),
        OverrideTable::empty(),
        fast_options(),
    );
    let provider = TableScanProvider::new(SeededTable::two_hosts(), Enrichment::none());
    session.run_discovery(&provider).await;

    let cached = session.lookup(ip, false).await.unwrap();
    assert!(cached.from_cache);
    assert_eq!(cached.record.payload["source"], "lan-discovery");

    let fresh = session.lookup(ip, true).await.unwrap();
    assert!(!fresh.from_cache);
    assert_eq!(fresh.record.payload["scope"], "test");
    assert!(fresh.record.payload.get("source").is_none());

    let reopened = CacheStore::open(&path).unwrap();
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.get(ip).unwrap().payload["scope"], "test");
}

#[tokio::test]
async fn corrupt_cache_file_starts_empty_and_recovers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ip_info_cache.json");
    std::fs::write(&path, "[[[ definitely not a cache").unwrap();

    let mut store = CacheStore::open(&path).unwrap();
    assert!(store.is_empty());

    store
        .put("192.168.1.1".parse().unwrap(), serde_json::json!({"hostname": "router"}))
        .unwrap();

    assert_eq!(CacheStore::open(&path).unwrap().len(), 1);
}
