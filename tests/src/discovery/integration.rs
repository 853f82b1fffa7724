use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use lanscope_common::{ResolvedClient, UNKNOWN};
use lanscope_core::discovery::TableScanProvider;
use lanscope_core::overrides::VendorOverride;
use lanscope_core::{CacheStore, Enrichment, OverrideTable, SessionState};

use crate::support::{
    OTHER_IP, PRINTER_IP, PRINTER_MAC, SeededTable, StubResolver, controller, fast_options,
};

fn by_ip(mut clients: Vec<ResolvedClient>) -> Vec<ResolvedClient> {
    clients.sort_by_key(|c| c.ip);
    clients
}

#[tokio::test]
async fn table_scan_end_to_end() {
    let mut session = controller(
        CacheStore::in_memory(),
        Arc::new(StubResolver::printer_only()),
        OverrideTable::empty(),
        fast_options(),
    );
    let provider = TableScanProvider::new(SeededTable::two_hosts(), Enrichment::none());

    let report = session.run_discovery(&provider).await;
    let clients = by_ip(report.clients);

    assert_eq!(report.state, SessionState::Done);
    assert_eq!(report.discovered, 2);
    assert_eq!(report.workers, 2);
    assert_eq!(clients.len(), 2);

    assert_eq!(clients[0].ip, IpAddr::V4(PRINTER_IP));
    assert_eq!(clients[0].hostname, "printer.local");
    assert_eq!(clients[0].mac, "AA:BB:CC:DD:EE:FF");
    assert_eq!(clients[0].vendor, UNKNOWN);

    assert_eq!(clients[1].ip, IpAddr::V4(OTHER_IP));
    assert_eq!(clients[1].hostname, UNKNOWN);
    assert_eq!(clients[1].mac, "11:22:33:44:55:66");
    assert_eq!(clients[1].vendor, UNKNOWN);
}

#[tokio::test]
async fn override_hostname_beats_reverse_lookup() {
    let mut overrides = OverrideTable::empty();
    overrides.insert(
        PRINTER_MAC,
        VendorOverride {
            vendor: Some("Amazon Technologies Inc.".to_string()),
            hostname: Some("Kitchen.Echo".to_string()),
        },
    );
    let overrides_for_discovery = Arc::new(overrides.clone());

    let mut session = controller(
        CacheStore::in_memory(),
        Arc::new(StubResolver::printer_only()),
        overrides,
        fast_options(),
    );
    let enrichment = Enrichment::new(Arc::new(crate::support::NoVendors), overrides_for_discovery);
    let provider = TableScanProvider::new(SeededTable::two_hosts(), enrichment);

    let clients = by_ip(session.run_discovery(&provider).await.clients);

    assert_eq!(clients[0].hostname, "Kitchen.Echo");
    assert_eq!(clients[0].vendor, "Amazon Technologies Inc.");
    assert_eq!(clients[1].hostname, UNKNOWN);
}

#[tokio::test]
async fn override_file_is_honoured() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mac_info.json");
    std::fs::write(
        &path,
        r#"{ "aa-bb-cc-dd-ee-ff": { "hostname": "Kitchen.Echo" } }"#,
    )
    .unwrap();

    let mut session = controller(
        CacheStore::in_memory(),
        Arc::new(StubResolver::printer_only()),
        OverrideTable::load(&path),
        fast_options(),
    );
    let provider = TableScanProvider::new(SeededTable::two_hosts(), Enrichment::none());

    let clients = by_ip(session.run_discovery(&provider).await.clients);

    assert_eq!(clients[0].hostname, "Kitchen.Echo");
}

#[tokio::test]
async fn large_snapshot_uses_bounded_pool() {
    let mut session = controller(
        CacheStore::in_memory(),
        Arc::new(StubResolver::with(&[])),
        OverrideTable::empty(),
        fast_options(),
    );
    let provider = TableScanProvider::new(SeededTable::sized(100), Enrichment::none());

    let report = session.run_discovery(&provider).await;

    assert_eq!(report.workers, 30);
    assert_eq!(report.clients.len(), 100);
    assert!(report.clients.iter().all(|c| c.hostname == UNKNOWN));
    assert_eq!(session.cache().len(), 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_mid_run_preserves_partial_results() {
    let resolver = StubResolver::with(&[]).slow(Duration::from_millis(40));
    let mut options = fast_options();
    options.max_workers = 4;

    let mut session = controller(CacheStore::in_memory(), Arc::new(resolver), OverrideTable::empty(), options);
    let provider = TableScanProvider::new(SeededTable::sized(200), Enrichment::none());

    let cancel = session.cancel_flag();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let report = tokio::time::timeout(Duration::from_secs(5), session.run_discovery(&provider))
        .await
        .expect("cancelled run should finish promptly");

    assert_eq!(report.state, SessionState::Cancelled);
    assert_eq!(session.state(), SessionState::Cancelled);
    assert!(!report.clients.is_empty());
    assert!(report.still_queued > 0);
    assert_eq!(report.clients.len() + report.still_queued, 200);
    assert_eq!(session.cache().len(), report.clients.len());
}

#[tokio::test]
async fn results_skip_cache_when_disabled() {
    let mut options = fast_options();
    options.cache_results = false;

    let mut session = controller(
        CacheStore::in_memory(),
        Arc::new(StubResolver::printer_only()),
        OverrideTable::empty(),
        options,
    );
    let provider = TableScanProvider::new(SeededTable::two_hosts(), Enrichment::none());

    let report = session.run_discovery(&provider).await;

    assert_eq!(report.clients.len(), 2);
    assert!(session.cache().is_empty());
}
