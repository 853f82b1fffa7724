//! Fills in what discovery could not: hostnames via reverse lookup, vendors via
//! the OUI table, then the user's manual overrides on top.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace};

use lanscope_common::vendors::VendorRepository;
use lanscope_common::{LanClient, ResolvedClient};

use crate::overrides::OverrideTable;

/// Reverse hostname lookup. `None` means "no name", never an error.
#[async_trait]
pub trait HostnameResolver: Send + Sync {
    async fn reverse_lookup(&self, ip: IpAddr) -> Option<String>;
}

/// Reverse lookup through the system resolver (`getnameinfo`), bounded by a
/// timeout so one silent host cannot hold up a worker.
pub struct DnsHostnameResolver {
    timeout: Duration,
}

impl DnsHostnameResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl HostnameResolver for DnsHostnameResolver {
    async fn reverse_lookup(&self, ip: IpAddr) -> Option<String> {
        let lookup = tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&ip));

        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(Ok(name))) => usable_hostname(ip, name),
            Ok(Ok(Err(e))) => {
                trace!("Reverse lookup for {ip} failed: {e}");
                None
            }
            Ok(Err(e)) => {
                debug!("Reverse lookup task for {ip} aborted: {e}");
                None
            }
            Err(_) => {
                debug!("Reverse lookup for {ip} timed out after {:?}", self.timeout);
                None
            }
        }
    }
}

/// `getnameinfo` hands back the numeric address when no PTR record exists.
fn usable_hostname(ip: IpAddr, name: String) -> Option<String> {
    let name = name.trim_end_matches('.').to_string();
    if name.is_empty() || name == ip.to_string() {
        None
    } else {
        Some(name)
    }
}

/// The per-client resolution step run by every worker.
pub struct ClientResolver {
    hostnames: Arc<dyn HostnameResolver>,
    vendors: Arc<dyn VendorRepository>,
    overrides: Arc<OverrideTable>,
}

impl ClientResolver {
    pub fn new(
        hostnames: Arc<dyn HostnameResolver>,
        vendors: Arc<dyn VendorRepository>,
        overrides: Arc<OverrideTable>,
    ) -> Self {
        Self {
            hostnames,
            vendors,
            overrides,
        }
    }

    /// Resolves the missing fields of `client`. Overrides are applied first so a
    /// pinned hostname skips the network round trip, and applied again last so
    /// nothing resolved automatically can replace them.
    pub async fn resolve(&self, mut client: LanClient) -> ResolvedClient {
        self.overrides.apply(&mut client);

        if client.hostname.is_none() {
            client.hostname = self.hostnames.reverse_lookup(client.ip).await;
        }

        if client.vendor.is_none() {
            client.vendor = client.mac.and_then(|mac| self.vendors.get_vendor(mac));
        }

        self.overrides.apply(&mut client);
        ResolvedClient::from(client)
    }
}
