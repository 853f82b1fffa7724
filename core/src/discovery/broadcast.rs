//! Broadcast discovery: one ARP request per subnet address, replies collected
//! for a fixed window.
//!
//! Requires **root privileges** to open a Layer 2 channel.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use pnet::datalink::{self, Channel, DataLinkReceiver, DataLinkSender, NetworkInterface};
use pnet::ipnetwork::Ipv4Network;
use pnet::util::MacAddr;
use tracing::{debug, trace, warn};

use lanscope_common::error::DiscoveryError;
use lanscope_common::network::{interface, range};
use lanscope_common::{CancelFlag, LanClient};
use lanscope_protocols::arp;

use super::{ArpEntry, DiscoveryProvider, Enrichment, Strategy, build_snapshot};

const READ_TIMEOUT: Duration = Duration::from_millis(100);

pub struct BroadcastProvider {
    interface: Option<String>,
    window: Duration,
    enrichment: Enrichment,
    cancel: CancelFlag,
}

impl BroadcastProvider {
    pub fn new(interface: Option<String>, window: Duration, enrichment: Enrichment) -> Self {
        Self {
            interface,
            window,
            enrichment,
            cancel: CancelFlag::new(),
        }
    }

    /// Stops listening early once `cancel` is set.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Runs on a blocking thread: the datalink receiver only offers blocking reads.
fn sweep(
    preferred: Option<&str>,
    window: Duration,
    cancel: &CancelFlag,
) -> Result<Vec<ArpEntry>, DiscoveryError> {
    if !is_root::is_root() {
        return Err(DiscoveryError::Privileges);
    }

    let (intf, net) = interface::select_lan_interface(preferred)?;
    let src_mac: MacAddr = intf
        .mac
        .ok_or_else(|| DiscoveryError::NoInterface(format!("{} has no MAC", intf.name)))?;

    let (mut tx, mut rx) = open_channel(&intf)?;
    let targets = range::sweep_range(net);
    debug!("Sending {} ARP requests on {} ({net})", targets.len(), intf.name);

    send_requests(tx.as_mut(), src_mac, net, targets.to_iter());
    Ok(collect_replies(rx.as_mut(), src_mac, net, window, cancel))
}

fn open_channel(
    intf: &NetworkInterface,
) -> Result<(Box<dyn DataLinkSender>, Box<dyn DataLinkReceiver>), DiscoveryError> {
    let config = datalink::Config {
        read_timeout: Some(READ_TIMEOUT),
        ..Default::default()
    };

    match datalink::channel(intf, config)? {
        Channel::Ethernet(tx, rx) => Ok((tx, rx)),
        _ => Err(DiscoveryError::UnsupportedChannel(intf.name.clone())),
    }
}

/// Failed sends are logged and skipped; one bad address must not end the sweep.
fn send_requests(
    tx: &mut dyn DataLinkSender,
    src_mac: MacAddr,
    net: Ipv4Network,
    targets: impl Iterator<Item = Ipv4Addr>,
) -> usize {
    let mut sent = 0;
    for target in targets.filter(|t| *t != net.ip()) {
        let frame = match arp::create_request(src_mac, net.ip(), target) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Unable to build ARP request for {target}: {e}");
                continue;
            }
        };
        match tx.send_to(&frame, None) {
            Some(Err(e)) => debug!("send {target} failed: {e}"),
            _ => sent += 1,
        }
    }
    sent
}

fn collect_replies(
    rx: &mut dyn DataLinkReceiver,
    src_mac: MacAddr,
    net: Ipv4Network,
    window: Duration,
    cancel: &CancelFlag,
) -> Vec<ArpEntry> {
    let deadline = Instant::now() + window;
    let mut replies: HashMap<Ipv4Addr, MacAddr> = HashMap::new();

    while Instant::now() < deadline && !cancel.is_cancelled() {
        let frame = match rx.next() {
            Ok(frame) => frame,
            Err(e) if is_timeout(&e) => continue,
            Err(e) => {
                warn!("Stopped reading ARP replies: {e}");
                break;
            }
        };

        match arp::parse_reply(frame) {
            Ok(Some(reply)) if reply.sender_mac != src_mac && net.contains(reply.sender_ip) => {
                if replies.insert(reply.sender_ip, reply.sender_mac).is_none() {
                    trace!("{} is at {}", reply.sender_ip, reply.sender_mac);
                }
            }
            Ok(_) => {}
            Err(e) => trace!("Skipping frame: {e}"),
        }
    }

    replies
        .into_iter()
        .map(|(ip, mac)| ArpEntry::new(ip, mac))
        .collect()
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
    )
}

#[async_trait]
impl DiscoveryProvider for BroadcastProvider {
    fn strategy(&self) -> Strategy {
        Strategy::Broadcast
    }

    async fn discover(&self) -> Vec<LanClient> {
        let preferred = self.interface.clone();
        let window = self.window;
        let cancel = self.cancel.clone();
        let result =
            tokio::task::spawn_blocking(move || sweep(preferred.as_deref(), window, &cancel)).await;

        match result {
            Ok(Ok(entries)) => build_snapshot(entries, &self.enrichment),
            Ok(Err(e)) => {
                warn!("Broadcast discovery unavailable: {e}");
                Vec::new()
            }
            Err(e) => {
                warn!("Broadcast discovery task failed: {e}");
                Vec::new()
            }
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
