//! Table-scan discovery: reads the ARP cache the OS already maintains.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use lanscope_common::LanClient;
use lanscope_common::error::DiscoveryError;
use lanscope_common::network::mac;

use super::{ArpEntry, DiscoveryProvider, Enrichment, Strategy, build_snapshot};

const PROC_NET_ARP: &str = "/proc/net/arp";

#[cfg(windows)]
const ARP_ARGS: &[&str] = &["-a"];
#[cfg(not(windows))]
const ARP_ARGS: &[&str] = &["-an"];

/// Where a point-in-time copy of the ARP table comes from. Reads may block on
/// file or process IO; async callers go through [`read_off_runtime`].
pub trait ArpTableSource: Send + Sync {
    fn read_table(&self) -> Result<Vec<ArpEntry>, DiscoveryError>;
}

/// Reads `source` on the blocking pool so a slow `arp` never stalls a runtime
/// worker.
pub async fn read_off_runtime(
    source: Arc<dyn ArpTableSource>,
) -> Result<Vec<ArpEntry>, DiscoveryError> {
    tokio::task::spawn_blocking(move || source.read_table())
        .await
        .map_err(|e| DiscoveryError::SourceUnavailable(format!("table read aborted: {e}")))?
}

/// `/proc/net/arp` when present, otherwise the output of `arp -an`
/// (`arp -a` on Windows).
pub struct SystemArpTable {
    proc_path: PathBuf,
}

impl SystemArpTable {
    pub fn new() -> Self {
        Self {
            proc_path: PathBuf::from(PROC_NET_ARP),
        }
    }
}

impl Default for SystemArpTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ArpTableSource for SystemArpTable {
    fn read_table(&self) -> Result<Vec<ArpEntry>, DiscoveryError> {
        if self.proc_path.is_file() {
            let contents = std::fs::read_to_string(&self.proc_path).map_err(|e| {
                DiscoveryError::SourceUnavailable(format!("{}: {e}", self.proc_path.display()))
            })?;
            return Ok(parse_proc_net_arp(&contents));
        }

        debug!("{} not available, falling back to `arp`", self.proc_path.display());
        let output = Command::new("arp")
            .args(ARP_ARGS)
            .output()
            .map_err(|e| DiscoveryError::SourceUnavailable(format!("arp: {e}")))?;

        if !output.status.success() {
            return Err(DiscoveryError::SourceUnavailable(format!(
                "arp exited with {}",
                output.status
            )));
        }

        Ok(parse_arp_command(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parses the Linux kernel table:
///
/// ```text
/// IP address       HW type     Flags       HW address            Mask     Device
/// 192.168.1.1      0x1         0x2         aa:bb:cc:dd:ee:ff     *        eth0
/// ```
///
/// Entries with flags `0x0` are incomplete and skipped.
pub fn parse_proc_net_arp(contents: &str) -> Vec<ArpEntry> {
    contents
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 || fields[2] == "0x0" {
                return None;
            }
            let ip: Ipv4Addr = fields[0].parse().ok()?;
            let mac = mac::parse(fields[3]).filter(|m| !mac::is_placeholder(*m))?;
            Some(ArpEntry::new(ip, mac))
        })
        .collect()
}

/// Parses `arp -a`/`arp -an` output in either of its common shapes:
///
/// ```text
/// ? (192.168.1.1) at a:b:c:d:e:f on en0 ifscope [ethernet]
///   192.168.1.1           aa-bb-cc-dd-ee-ff     dynamic
/// ```
pub fn parse_arp_command(output: &str) -> Vec<ArpEntry> {
    output
        .lines()
        .filter_map(|line| {
            let mut ip: Option<Ipv4Addr> = None;
            let mut found_mac = None;

            for token in line.split_whitespace() {
                let token = token.trim_matches(|c| c == '(' || c == ')');
                if ip.is_none() {
                    ip = token.parse().ok();
                } else if found_mac.is_none() {
                    found_mac = mac::parse(token);
                }
            }

            let mac = found_mac.filter(|m| !mac::is_placeholder(*m))?;
            Some(ArpEntry::new(ip?, mac))
        })
        .collect()
}

pub struct TableScanProvider {
    source: Arc<dyn ArpTableSource>,
    enrichment: Enrichment,
}

impl TableScanProvider {
    pub fn new(source: impl ArpTableSource + 'static, enrichment: Enrichment) -> Self {
        Self {
            source: Arc::new(source),
            enrichment,
        }
    }
}

#[async_trait]
impl DiscoveryProvider for TableScanProvider {
    fn strategy(&self) -> Strategy {
        Strategy::TableScan
    }

    async fn discover(&self) -> Vec<LanClient> {
        match read_off_runtime(Arc::clone(&self.source)).await {
            Ok(entries) => {
                debug!("{} entries read from the ARP table", entries.len());
                build_snapshot(entries, &self.enrichment)
            }
            Err(e) => {
                warn!("{e}");
                Vec::new()
            }
        }
    }
}
