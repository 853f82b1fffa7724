//! Produces the document cached for a single IP lookup.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::debug;

use lanscope_common::network::mac;
use lanscope_common::vendors::VendorRepository;
use lanscope_common::{LanClient, UNKNOWN};

use crate::discovery::{ArpTableSource, read_off_runtime};
use crate::overrides::OverrideTable;
use crate::resolver::HostnameResolver;

#[async_trait]
pub trait IpInfoSource: Send + Sync {
    async fn fetch(&self, ip: IpAddr) -> Result<Value>;
}

/// Answers from what this machine already knows: reverse DNS, the address
/// class, and for LAN neighbours the ARP table with vendor and overrides.
pub struct LocalIpInfo {
    hostnames: Arc<dyn HostnameResolver>,
    vendors: Arc<dyn VendorRepository>,
    overrides: Arc<OverrideTable>,
    table: Arc<dyn ArpTableSource>,
}

impl LocalIpInfo {
    pub fn new(
        hostnames: Arc<dyn HostnameResolver>,
        vendors: Arc<dyn VendorRepository>,
        overrides: Arc<OverrideTable>,
        table: Arc<dyn ArpTableSource>,
    ) -> Self {
        Self {
            hostnames,
            vendors,
            overrides,
            table,
        }
    }

    async fn neighbour(&self, ip: IpAddr) -> Option<LanClient> {
        let IpAddr::V4(v4) = ip else {
            return None;
        };

        let entries = match read_off_runtime(Arc::clone(&self.table)).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!("ARP table not consulted for {ip}: {e}");
                return None;
            }
        };

        entries
            .into_iter()
            .find(|entry| entry.ip == v4)
            .map(|entry| LanClient::new(ip).with_mac(entry.mac))
    }
}

#[async_trait]
impl IpInfoSource for LocalIpInfo {
    async fn fetch(&self, ip: IpAddr) -> Result<Value> {
        let mut client = self.neighbour(ip).await.unwrap_or_else(|| LanClient::new(ip));
        self.overrides.apply(&mut client);

        if client.hostname.is_none() {
            client.hostname = self.hostnames.reverse_lookup(ip).await;
        }
        if client.vendor.is_none() {
            client.vendor = client.mac.and_then(|m| self.vendors.get_vendor(m));
        }
        self.overrides.apply(&mut client);

        let mut doc = Map::new();
        doc.insert("ip".into(), json!(ip.to_string()));
        doc.insert(
            "hostname".into(),
            json!(client.hostname.as_deref().unwrap_or(UNKNOWN)),
        );
        doc.insert("scope".into(), json!(scope(ip)));
        if let Some(m) = client.mac {
            doc.insert("mac".into(), json!(mac::canonical(m)));
            doc.insert(
                "vendor".into(),
                json!(client.vendor.as_deref().unwrap_or(UNKNOWN)),
            );
        }

        Ok(Value::Object(doc))
    }
}

/// Coarse classification of where an address lives.
pub fn scope(ip: IpAddr) -> &'static str {
    match ip {
        IpAddr::V4(v4) => scope_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => scope_v4(v4),
            None => scope_v6(v6),
        },
    }
}

fn scope_v4(ip: Ipv4Addr) -> &'static str {
    if ip.is_unspecified() {
        "unspecified"
    } else if ip.is_loopback() {
        "loopback"
    } else if ip.is_private() {
        "private"
    } else if ip.is_link_local() {
        "link-local"
    } else if ip.is_multicast() {
        "multicast"
    } else if ip.is_broadcast() {
        "broadcast"
    } else if ip.is_documentation() {
        "documentation"
    } else if ip.octets()[0] == 100 && (ip.octets()[1] & 0xc0) == 64 {
        "shared"
    } else {
        "public"
    }
}

fn scope_v6(ip: Ipv6Addr) -> &'static str {
    let first = ip.segments()[0];
    if ip.is_unspecified() {
        "unspecified"
    } else if ip.is_loopback() {
        "loopback"
    } else if ip.is_multicast() {
        "multicast"
    } else if (first & 0xffc0) == 0xfe80 {
        "link-local"
    } else if (first & 0xfe00) == 0xfc00 {
        "private"
    } else if first == 0x2001 && ip.segments()[1] == 0x0db8 {
        "documentation"
    } else {
        "public"
    }
}
