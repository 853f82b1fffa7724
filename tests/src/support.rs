use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use pnet::util::MacAddr;
use serde_json::{Value, json};

use lanscope_common::error::DiscoveryError;
use lanscope_common::vendors::VendorRepository;
use lanscope_core::discovery::{ArpEntry, ArpTableSource};
use lanscope_core::{
    CacheStore, ClientResolver, HostnameResolver, IpInfoSource, OverrideTable, SessionController,
    SessionOptions,
};

pub const PRINTER_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 5);
pub const PRINTER_MAC: MacAddr = MacAddr(0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff);
pub const OTHER_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 9);
pub const OTHER_MAC: MacAddr = MacAddr(0x11, 0x22, 0x33, 0x44, 0x55, 0x66);

/// A fixed ARP table.
pub struct SeededTable(pub Vec<ArpEntry>);

impl SeededTable {
    pub fn two_hosts() -> Self {
        Self(vec![
            ArpEntry::new(PRINTER_IP, PRINTER_MAC),
            ArpEntry::new(OTHER_IP, OTHER_MAC),
        ])
    }

    pub fn sized(n: u32) -> Self {
        Self(
            (0..n)
                .map(|i| {
                    let octets = (0x0a01_0000 + i).to_be_bytes();
                    ArpEntry::new(
                        Ipv4Addr::from(octets),
                        MacAddr::new(2, 0, octets[0], octets[1], octets[2], octets[3]),
                    )
                })
                .collect(),
        )
    }
}

impl ArpTableSource for SeededTable {
    fn read_table(&self) -> Result<Vec<ArpEntry>, DiscoveryError> {
        Ok(self.0.clone())
    }
}

/// Reverse lookups answered from a map, optionally after a delay.
pub struct StubResolver {
    names: HashMap<IpAddr, String>,
    delay: Duration,
    pub calls: AtomicUsize,
}

impl StubResolver {
    pub fn printer_only() -> Self {
        Self::with(&[(IpAddr::V4(PRINTER_IP), "printer.local")])
    }

    pub fn with(names: &[(IpAddr, &str)]) -> Self {
        Self {
            names: names.iter().map(|(ip, n)| (*ip, n.to_string())).collect(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl HostnameResolver for StubResolver {
    async fn reverse_lookup(&self, ip: IpAddr) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.names.get(&ip).cloned()
    }
}

pub struct NoVendors;

impl VendorRepository for NoVendors {
    fn get_vendor(&self, _mac: MacAddr) -> Option<String> {
        None
    }
}

pub struct StaticInfo;

#[async_trait]
impl IpInfoSource for StaticInfo {
    async fn fetch(&self, ip: IpAddr) -> Result<Value> {
        Ok(json!({ "ip": ip.to_string(), "scope": "test" }))
    }
}

pub fn controller(
    cache: CacheStore,
    resolver: Arc<dyn HostnameResolver>,
    overrides: OverrideTable,
    options: SessionOptions,
) -> SessionController {
    let resolver = ClientResolver::new(resolver, Arc::new(NoVendors), Arc::new(overrides));
    SessionController::new(cache, Arc::new(resolver), Arc::new(StaticInfo), options)
}

pub fn fast_options() -> SessionOptions {
    SessionOptions {
        poll_interval: Duration::from_millis(10),
        ..SessionOptions::default()
    }
}
