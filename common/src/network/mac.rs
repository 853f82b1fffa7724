use std::str::FromStr;

use pnet::util::MacAddr;

/// Renders a MAC address the way it is keyed everywhere: `AA:BB:CC:DD:EE:FF`.
pub fn canonical(mac: MacAddr) -> String {
    mac.to_string().to_uppercase()
}

/// Parses the MAC spellings found in ARP tables and in the override file.
///
/// Accepts colon or dash separators and unpadded octets (`a:b:c:d:e:f` as printed
/// by BSD `arp`). Returns `None` for anything else.
pub fn parse(raw: &str) -> Option<MacAddr> {
    let normalized = raw.trim().replace('-', ":");
    let parts: Vec<&str> = normalized.split(':').collect();
    if parts.len() != 6 || parts.iter().any(|p| p.is_empty() || p.len() > 2) {
        return None;
    }

    MacAddr::from_str(&normalized).ok()
}

/// All-zero and broadcast addresses show up for incomplete ARP entries.
pub fn is_placeholder(mac: MacAddr) -> bool {
    mac == MacAddr::zero() || mac == MacAddr::broadcast()
}
