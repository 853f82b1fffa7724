//! # Manual MAC Overrides
//!
//! Some devices never answer reverse lookups, or the OUI table names a chip
//! maker instead of the product. Users can pin a vendor and/or hostname per MAC
//! in a JSON file:
//!
//! ```json
//! {
//!     "AA:BB:CC:DD:EE:FF": {
//!         "vendor": "Amazon Technologies Inc.",
//!         "hostname": "Kitchen.Echo"
//!     }
//! }
//! ```
//!
//! Entries win over anything resolved automatically. The file is read once and
//! never written.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;

use pnet::util::MacAddr;
use serde::Deserialize;
use tracing::{debug, warn};

use lanscope_common::LanClient;
use lanscope_common::network::mac;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VendorOverride {
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    entries: HashMap<MacAddr, VendorOverride>,
}

impl OverrideTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Reads the override file. A missing file is normal; an unreadable or
    /// malformed one is logged and treated as empty.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No override file at {}", path.display());
                return Self::empty();
            }
            Err(e) => {
                warn!("Unable to read override file {}: {e}", path.display());
                return Self::empty();
            }
        };

        match Self::from_json(&contents) {
            Ok(table) => {
                debug!("Loaded {} override(s) from {}", table.len(), path.display());
                table
            }
            Err(e) => {
                warn!("Ignoring malformed override file {}: {e}", path.display());
                Self::empty()
            }
        }
    }

    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        let raw: HashMap<String, VendorOverride> = serde_json::from_str(contents)?;
        let mut entries = HashMap::with_capacity(raw.len());

        for (key, entry) in raw {
            match mac::parse(&key) {
                Some(parsed) => {
                    entries.insert(parsed, entry);
                }
                None => warn!("Skipping override with invalid MAC key '{key}'"),
            }
        }

        Ok(Self { entries })
    }

    pub fn insert(&mut self, mac: MacAddr, entry: VendorOverride) {
        self.entries.insert(mac, entry);
    }

    pub fn get(&self, mac: MacAddr) -> Option<&VendorOverride> {
        self.entries.get(&mac)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overwrites the client's hostname/vendor with any pinned values.
    pub fn apply(&self, client: &mut LanClient) {
        let Some(entry) = client.mac.and_then(|m| self.entries.get(&m)) else {
            return;
        };

        if let Some(hostname) = &entry.hostname {
            client.hostname = Some(hostname.clone());
        }
        if let Some(vendor) = &entry.vendor {
            client.vendor = Some(vendor.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::{IpAddr, Ipv4Addr};

    const ECHO: &str = r#"{
        "aa:bb:cc:dd:ee:ff": { "vendor": "Amazon Technologies Inc.", "hostname": "Kitchen.Echo" },
        "11-22-33-44-55-66": { "hostname": "nas" },
        "not-a-mac": { "hostname": "ignored" }
    }"#;

    fn client(mac: MacAddr) -> LanClient {
        LanClient::new(IpAddr::V4(Ipv4Addr::new(192, 168, 21, 99))).with_mac(mac)
    }

    #[test]
    fn keys_are_normalized_and_invalid_ones_skipped() {
        let table = OverrideTable::from_json(ECHO).unwrap();

        assert_eq!(table.len(), 2);
        assert!(table.get(MacAddr::new(0x11, 0x22, 0x33, 0x44, 0x55, 0x66)).is_some());
    }

    #[test]
    fn override_replaces_resolved_values() {
        let table = OverrideTable::from_json(ECHO).unwrap();
        let mut c = client(MacAddr::new(0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff))
            .with_hostname("ip-192-168-21-99")
            .with_vendor("Some Chip Maker");

        table.apply(&mut c);

        assert_eq!(c.hostname.as_deref(), Some("Kitchen.Echo"));
        assert_eq!(c.vendor.as_deref(), Some("Amazon Technologies Inc."));
    }

    #[test]
    fn partial_override_keeps_other_field() {
        let table = OverrideTable::from_json(ECHO).unwrap();
        let mut c = client(MacAddr::new(0x11, 0x22, 0x33, 0x44, 0x55, 0x66)).with_vendor("Synology");

        table.apply(&mut c);

        assert_eq!(c.hostname.as_deref(), Some("nas"));
        assert_eq!(c.vendor.as_deref(), Some("Synology"));
    }

    #[test]
    fn missing_and_corrupt_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(OverrideTable::load(dir.path().join("absent.json")).is_empty());

        let mut corrupt = tempfile::NamedTempFile::new().unwrap();
        write!(corrupt, "{{ this is not json").unwrap();
        assert!(OverrideTable::load(corrupt.path()).is_empty());
    }
}
