//! # LAN Discovery
//!
//! A [`DiscoveryProvider`] produces one snapshot of the clients on the local
//! network. Two providers exist:
//!
//! * [`TableScanProvider`] reads the address resolution table the OS already
//!   keeps. Fast, but it only knows hosts this machine talked to recently.
//! * [`BroadcastProvider`] sends an ARP request to every address of the LAN
//!   subnet and listens for replies. Slower, needs raw sockets, finds idle hosts.
//!
//! Neither provider fails its caller: if the source is unavailable the snapshot
//! is empty and a warning is logged.

use std::collections::HashSet;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use async_trait::async_trait;
use pnet::util::MacAddr;

use lanscope_common::LanClient;
use lanscope_common::vendors::VendorRepository;

use crate::overrides::OverrideTable;

pub mod broadcast;
pub mod table;

pub use broadcast::BroadcastProvider;
pub use table::{ArpTableSource, SystemArpTable, TableScanProvider, read_off_runtime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    TableScan,
    Broadcast,
}

impl Strategy {
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::TableScan => "ARP Cache",
            Strategy::Broadcast => "ARP Broadcast",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One (ip, mac) pair as seen by the network stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpEntry {
    pub ip: Ipv4Addr,
    pub mac: MacAddr,
}

impl ArpEntry {
    pub fn new(ip: Ipv4Addr, mac: MacAddr) -> Self {
        Self { ip, mac }
    }
}

#[async_trait]
pub trait DiscoveryProvider: Send + Sync {
    fn strategy(&self) -> Strategy;

    /// Returns an unordered snapshot with `ip` and `mac` populated.
    async fn discover(&self) -> Vec<LanClient>;
}

/// Cheap local enrichment applied to raw pairs before they are queued.
///
/// Only the vendor (an in-memory table lookup) and the manual overrides are
/// applied here; reverse hostname lookups are left to the worker pool.
#[derive(Clone)]
pub struct Enrichment {
    vendors: Option<Arc<dyn VendorRepository>>,
    overrides: Arc<OverrideTable>,
}

impl Enrichment {
    pub fn new(vendors: Arc<dyn VendorRepository>, overrides: Arc<OverrideTable>) -> Self {
        Self {
            vendors: Some(vendors),
            overrides,
        }
    }

    /// Leaves every field for the workers.
    pub fn none() -> Self {
        Self {
            vendors: None,
            overrides: Arc::new(OverrideTable::empty()),
        }
    }

    fn enrich(&self, mut client: LanClient) -> LanClient {
        if let (Some(vendors), Some(mac)) = (&self.vendors, client.mac) {
            client.vendor = vendors.get_vendor(mac);
        }
        self.overrides.apply(&mut client);
        client
    }
}

/// Turns raw pairs into a snapshot with one client per IP; the first pair seen
/// for an address wins.
pub fn build_snapshot(entries: Vec<ArpEntry>, enrichment: &Enrichment) -> Vec<LanClient> {
    let mut seen: HashSet<Ipv4Addr> = HashSet::with_capacity(entries.len());

    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.ip))
        .map(|entry| {
            let client = LanClient::new(IpAddr::V4(entry.ip)).with_mac(entry.mac);
            enrichment.enrich(client)
        })
        .collect()
}
