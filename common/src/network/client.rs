//! # LAN Client Model
//!
//! A [`LanClient`] is what a discovery provider hands out: the address is always
//! known, everything else may still be missing. Once a worker has done its
//! lookups the client is frozen into a [`ResolvedClient`], whose fields are never
//! empty and fall back to [`UNKNOWN`].

use std::fmt;
use std::net::IpAddr;

use pnet::util::MacAddr;

use crate::network::mac;

/// Placeholder shown for any field that could not be resolved.
pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanClient {
    pub ip: IpAddr,
    pub hostname: Option<String>,
    pub mac: Option<MacAddr>,
    pub vendor: Option<String>,
}

impl LanClient {
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip,
            hostname: None,
            mac: None,
            vendor: None,
        }
    }

    pub fn with_mac(mut self, mac: MacAddr) -> Self {
        self.mac = Some(mac);
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }
}

/// A fully populated client, ready for display, caching or dumping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedClient {
    pub ip: IpAddr,
    pub hostname: String,
    pub mac: String,
    pub vendor: String,
}

impl ResolvedClient {
    /// True when the hostname or vendor fell back to the placeholder.
    pub fn has_unknowns(&self) -> bool {
        self.hostname == UNKNOWN || self.vendor == UNKNOWN
    }

    /// The `ip|hostname|mac|vendor` line written to dump files.
    pub fn to_dump_line(&self) -> String {
        format!("{}|{}|{}|{}", self.ip, self.hostname, self.mac, self.vendor)
    }
}

impl From<LanClient> for ResolvedClient {
    fn from(client: LanClient) -> Self {
        let or_unknown = |value: Option<String>| {
            value
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN.to_string())
        };

        Self {
            ip: client.ip,
            hostname: or_unknown(client.hostname),
            mac: or_unknown(client.mac.map(mac::canonical)),
            vendor: or_unknown(client.vendor),
        }
    }
}

impl fmt::Display for ResolvedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:15} {:28} {:17}  {}",
            self.ip.to_string(),
            self.hostname,
            self.mac,
            self.vendor
        )
    }
}
