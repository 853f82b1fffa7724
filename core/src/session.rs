//! # Session Controller
//!
//! Drives one discovery run through its states and serves the cache commands
//! of the interactive loop.
//!
//! ```text
//! Idle -> Discovering -> Resolving -> Draining -> Done
//!              \              \           \
//!               +--------------+-----------+--> Cancelled
//! ```
//!
//! An empty snapshot goes straight from `Discovering` to `Done`. A cancelled run
//! still joins every worker it started and keeps whatever was resolved.
//!
//! The controller is the only owner of the [`CacheStore`]; workers never touch
//! it, they hand results back over a channel that the controller drains.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use lanscope_common::config::DiscoveryConfig;
use lanscope_common::error::CacheError;
use lanscope_common::{CancelFlag, ResolvedClient};

use crate::cache::{CacheRecord, CacheStore};
use crate::discovery::{DiscoveryProvider, Strategy};
use crate::ipinfo::IpInfoSource;
use crate::queue::{MAX_WORKERS, ResolutionContext, ResolutionQueue, WorkerPool};
use crate::resolver::ClientResolver;

/// Value of the `source` field on records written by a discovery run.
pub const DISCOVERY_SOURCE: &str = "lan-discovery";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Discovering,
    Resolving,
    Draining,
    Done,
    Cancelled,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Discovering => "discovering",
            SessionState::Resolving => "resolving",
            SessionState::Draining => "draining",
            SessionState::Done => "done",
            SessionState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub max_workers: usize,
    pub poll_interval: Duration,
    pub cache_results: bool,
}

/// Shortest wait between progress checks while workers run.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_workers: MAX_WORKERS,
            poll_interval: Duration::from_millis(250),
            cache_results: true,
        }
    }
}

impl From<&DiscoveryConfig> for SessionOptions {
    fn from(cfg: &DiscoveryConfig) -> Self {
        Self {
            max_workers: cfg.max_workers.clamp(1, MAX_WORKERS),
            poll_interval: cfg.poll_interval().max(MIN_POLL_INTERVAL),
            cache_results: cfg.cache_results,
        }
    }
}

/// Outcome of one discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryReport {
    pub state: SessionState,
    pub strategy: Strategy,
    /// Resolved clients in the order workers finished them.
    pub clients: Vec<ResolvedClient>,
    pub discovered: usize,
    /// Clients never picked up because the run was cancelled.
    pub still_queued: usize,
    pub workers: usize,
    pub discovery_time: Duration,
    pub resolution_time: Duration,
}

impl DiscoveryReport {
    fn empty(strategy: Strategy, state: SessionState, discovery_time: Duration) -> Self {
        Self {
            state,
            strategy,
            clients: Vec::new(),
            discovered: 0,
            still_queued: 0,
            workers: 0,
            discovery_time,
            resolution_time: Duration::ZERO,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == SessionState::Cancelled
    }
}

/// Result of an interactive lookup.
#[derive(Debug, Clone)]
pub struct Lookup {
    pub record: CacheRecord,
    pub from_cache: bool,
}

type ProgressCallback = Arc<dyn Fn(usize) + Send + Sync>;

pub struct SessionController {
    cache: CacheStore,
    resolver: Arc<ClientResolver>,
    ip_info: Arc<dyn IpInfoSource>,
    options: SessionOptions,
    cancel: CancelFlag,
    state: SessionState,
    on_progress: Option<ProgressCallback>,
}

impl SessionController {
    pub fn new(
        cache: CacheStore,
        resolver: Arc<ClientResolver>,
        ip_info: Arc<dyn IpInfoSource>,
        options: SessionOptions,
    ) -> Self {
        Self {
            cache,
            resolver,
            ip_info,
            options,
            cancel: CancelFlag::new(),
            state: SessionState::Idle,
            on_progress: None,
        }
    }

    /// Called with the number of resolved clients on every poll.
    pub fn with_progress(mut self, on_progress: Box<dyn Fn(usize) + Send + Sync>) -> Self {
        self.on_progress = Some(Arc::from(on_progress));
        self
    }

    /// Handle for the interrupt handler; setting it stops the current run.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Session {} -> {}", self.state, next);
        self.state = next;
    }

    fn finish_state(&self) -> SessionState {
        if self.cancel.is_cancelled() {
            SessionState::Cancelled
        } else {
            SessionState::Done
        }
    }

    pub async fn run_discovery(&mut self, provider: &dyn DiscoveryProvider) -> DiscoveryReport {
        let strategy = provider.strategy();
        self.transition(SessionState::Discovering);

        let started = Instant::now();
        let snapshot = provider.discover().await;
        let discovery_time = started.elapsed();
        let discovered = snapshot.len();
        debug!(
            "{discovered} clients identified via {strategy} in {:.2} seconds",
            discovery_time.as_secs_f64()
        );

        if snapshot.is_empty() || self.cancel.is_cancelled() {
            let state = self.finish_state();
            self.transition(state);
            let mut report = DiscoveryReport::empty(strategy, state, discovery_time);
            report.discovered = discovered;
            report.still_queued = discovered;
            return report;
        }

        self.transition(SessionState::Resolving);
        let resolve_start = Instant::now();

        let queue = Arc::new(ResolutionQueue::from_snapshot(snapshot));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ctx = ResolutionContext {
            queue: queue.clone(),
            results: tx,
            cancel: self.cancel.clone(),
            resolver: self.resolver.clone(),
        };

        // The context is moved into the pool, so once every worker returns no
        // sender is left and the drain below terminates.
        let pool = WorkerPool::spawn(ctx, self.options.max_workers);
        let workers = pool.size();

        while !queue.is_empty() && !self.cancel.is_cancelled() {
            tokio::time::sleep(self.options.poll_interval).await;
            if let Some(cb) = &self.on_progress {
                cb(queue.completed());
            }
        }

        if self.cancel.is_cancelled() {
            warn!("Cancel requested, waiting for {workers} worker(s) to stop");
        }

        self.transition(SessionState::Draining);
        pool.join().await;

        let mut clients = Vec::with_capacity(discovered);
        while let Some(client) = rx.recv().await {
            clients.push(client);
        }
        let still_queued = queue.len();
        let resolution_time = resolve_start.elapsed();

        if self.options.cache_results {
            self.cache_clients(&clients);
        }

        let state = self.finish_state();
        self.transition(state);

        DiscoveryReport {
            state,
            strategy,
            clients,
            discovered,
            still_queued,
            workers,
            discovery_time,
            resolution_time,
        }
    }

    fn cache_clients(&mut self, clients: &[ResolvedClient]) {
        for client in clients {
            if let Err(e) = self.cache.put(client.ip, discovery_payload(client)) {
                warn!("Remaining discovery results were not cached: {e}");
                return;
            }
        }
        debug!("Cached {} discovered client(s)", clients.len());
    }

    /// Returns the cached record for `ip`, fetching and caching a fresh one
    /// when there is none or `bypass` is set. A failed fetch caches nothing.
    pub async fn lookup(&mut self, ip: IpAddr, bypass: bool) -> Result<Lookup> {
        if !bypass {
            if let Some(record) = self.cache.get(ip) {
                debug!("{ip} served from cache");
                return Ok(Lookup {
                    record: record.clone(),
                    from_cache: true,
                });
            }
        }

        let payload = self
            .ip_info
            .fetch(ip)
            .await
            .with_context(|| format!("Lookup of {ip} failed"))?;

        self.cache.put(ip, payload)?;

        let record = self
            .cache
            .get(ip)
            .cloned()
            .with_context(|| format!("{ip} missing from cache after insert"))?;

        Ok(Lookup {
            record,
            from_cache: false,
        })
    }

    pub fn clear(&mut self, ip: Option<IpAddr>) -> Result<usize, CacheError> {
        self.cache.clear(ip)
    }

    pub fn find(&self, search: &str) -> Vec<&CacheRecord> {
        self.cache.find(search)
    }

    pub fn list(&self, ip: Option<IpAddr>) -> Vec<&CacheRecord> {
        self.cache.list(ip)
    }
}

/// The document cached for a client found on the LAN.
pub fn discovery_payload(client: &ResolvedClient) -> Value {
    json!({
        "ip": client.ip.to_string(),
        "hostname": client.hostname,
        "mac": client.mac,
        "vendor": client.vendor,
        "source": DISCOVERY_SOURCE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use lanscope_common::LanClient;
    use lanscope_common::vendors::VendorRepository;
    use pnet::util::MacAddr;

    use crate::overrides::OverrideTable;
    use crate::resolver::HostnameResolver;

    struct FixedSnapshot(Vec<LanClient>);

    #[async_trait]
    impl DiscoveryProvider for FixedSnapshot {
        fn strategy(&self) -> Strategy {
            Strategy::TableScan
        }

        async fn discover(&self) -> Vec<LanClient> {
            self.0.clone()
        }
    }

    struct Named;

    #[async_trait]
    impl HostnameResolver for Named {
        async fn reverse_lookup(&self, ip: IpAddr) -> Option<String> {
            Some(format!("host-{ip}"))
        }
    }

    struct NoVendors;

    impl VendorRepository for NoVendors {
        fn get_vendor(&self, _mac: MacAddr) -> Option<String> {
            None
        }
    }

    struct CountingInfo {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl IpInfoSource for CountingInfo {
        async fn fetch(&self, ip: IpAddr) -> Result<Value> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                anyhow::bail!("no route to {ip}");
            }
            Ok(json!({ "ip": ip.to_string(), "generation": n }))
        }
    }

    fn controller(info: Arc<CountingInfo>) -> SessionController {
        let resolver = ClientResolver::new(
            Arc::new(Named),
            Arc::new(NoVendors),
            Arc::new(OverrideTable::empty()),
        );
        SessionController::new(
            CacheStore::in_memory(),
            Arc::new(resolver),
            info,
            SessionOptions {
                poll_interval: Duration::from_millis(5),
                ..SessionOptions::default()
            },
        )
    }

    fn info(fail: bool) -> Arc<CountingInfo> {
        Arc::new(CountingInfo {
            calls: AtomicUsize::new(0),
            fail,
        })
    }

    fn clients(n: u8) -> Vec<LanClient> {
        (1..=n)
            .map(|i| {
                LanClient::new(IpAddr::V4(Ipv4Addr::new(192, 168, 0, i)))
                    .with_mac(MacAddr::new(2, 0, 0, 0, 0, i))
            })
            .collect()
    }

    #[test]
    fn options_from_config_are_kept_in_bounds() {
        let cfg = DiscoveryConfig {
            max_workers: 500,
            poll_interval_ms: 0,
            ..DiscoveryConfig::default()
        };

        let options = SessionOptions::from(&cfg);

        assert_eq!(options.max_workers, MAX_WORKERS);
        assert_eq!(options.poll_interval, MIN_POLL_INTERVAL);
    }

    #[tokio::test]
    async fn empty_snapshot_skips_to_done() {
        let mut session = controller(info(false));

        let report = session.run_discovery(&FixedSnapshot(Vec::new())).await;

        assert_eq!(report.state, SessionState::Done);
        assert_eq!(session.state(), SessionState::Done);
        assert_eq!(report.workers, 0);
        assert!(report.clients.is_empty());
    }

    #[tokio::test]
    async fn discovery_resolves_and_caches_every_client() {
        let mut session = controller(info(false));

        let report = session.run_discovery(&FixedSnapshot(clients(7))).await;

        assert_eq!(report.state, SessionState::Done);
        assert_eq!(report.discovered, 7);
        assert_eq!(report.clients.len(), 7);
        assert_eq!(report.still_queued, 0);
        assert_eq!(report.workers, 7);
        assert_eq!(session.cache().len(), 7);

        let record = session.cache().get("192.168.0.3".parse().unwrap()).unwrap();
        assert_eq!(record.payload["hostname"], "host-192.168.0.3");
        assert_eq!(record.payload["mac"], "02:00:00:00:00:03");
        assert_eq!(record.payload["source"], DISCOVERY_SOURCE);
    }

    #[tokio::test]
    async fn caching_can_be_disabled() {
        let mut session = controller(info(false));
        session.options.cache_results = false;

        let report = session.run_discovery(&FixedSnapshot(clients(3))).await;

        assert_eq!(report.clients.len(), 3);
        assert!(session.cache().is_empty());
    }

    #[tokio::test]
    async fn cancel_before_resolution_keeps_everything_queued() {
        let mut session = controller(info(false));
        session.cancel_flag().cancel();

        let report = session.run_discovery(&FixedSnapshot(clients(4))).await;

        assert!(report.is_cancelled());
        assert_eq!(report.clients.len() + report.still_queued, 4);
    }

    #[tokio::test]
    async fn lookup_uses_cache_unless_bypassed() {
        let source = info(false);
        let mut session = controller(source.clone());
        let ip: IpAddr = "8.8.8.8".parse().unwrap();

        let first = session.lookup(ip, false).await.unwrap();
        let second = session.lookup(ip, false).await.unwrap();
        let bypassed = session.lookup(ip, true).await.unwrap();

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert!(!bypassed.from_cache);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(bypassed.record.payload["generation"], 2);
        assert_eq!(session.list(None).len(), 1);
    }

    #[tokio::test]
    async fn failed_lookup_caches_nothing() {
        let mut session = controller(info(true));

        let result = session.lookup("1.1.1.1".parse().unwrap(), false).await;

        assert!(result.is_err());
        assert!(session.cache().is_empty());
    }

    #[tokio::test]
    async fn cache_commands_pass_through() {
        let mut session = controller(info(false));
        session.lookup("10.1.1.1".parse().unwrap(), false).await.unwrap();
        session.lookup("10.1.1.2".parse().unwrap(), false).await.unwrap();

        assert_eq!(session.find("10.1.1.2").len(), 1);
        assert_eq!(session.list(Some("10.1.1.1".parse().unwrap())).len(), 1);
        assert_eq!(session.clear(None).unwrap(), 2);
        assert!(session.list(None).is_empty());
    }
}
