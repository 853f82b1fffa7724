//! Picks the network interface a broadcast sweep is sent from.

use pnet::datalink::{self, NetworkInterface};
use pnet::ipnetwork::{IpNetwork, Ipv4Network};
use tracing::debug;

#[cfg(target_os = "linux")]
use linux_impl::{is_physical, is_wireless};
#[cfg(not(target_os = "linux"))]
use fallback_impl::{is_physical, is_wireless};

use crate::error::DiscoveryError;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ViabilityError {
    /// The interface is operationally down.
    IsDown,
    /// The interface was filtered out as "not physical" by the provided logic.
    NotPhysical,
    /// The interface does not have a MAC address.
    NoMacAddress,
    /// The interface does not support broadcast (required for ARP).
    NotBroadcast,
    /// The interface is a point-to-point link (e.g., a VPN).
    IsPointToPoint,
    /// The interface has no private IPv4 network to sweep.
    NoPrivateIpv4,
}

/// Returns the interface to sweep and the IPv4 network it sits on.
///
/// With `preferred` set, only that interface is considered; it still has to
/// carry a MAC and an IPv4 network but is not required to look physical.
pub fn select_lan_interface(
    preferred: Option<&str>,
) -> Result<(NetworkInterface, Ipv4Network), DiscoveryError> {
    let interfaces: Vec<NetworkInterface> = datalink::interfaces();
    debug!("Identified {} network interface(s)", interfaces.len());

    if let Some(name) = preferred {
        let interface = interfaces
            .into_iter()
            .find(|i| i.name == name)
            .ok_or_else(|| DiscoveryError::NoInterface(format!("no interface named {name}")))?;
        is_viable_lan_interface(&interface, |_| true)
            .map_err(|e| DiscoveryError::NoInterface(format!("{name} is not usable: {e:?}")))?;
        let net = private_ipv4_net(&interface)
            .ok_or_else(|| DiscoveryError::NoInterface(format!("{name} has no IPv4 network")))?;
        return Ok((interface, net));
    }

    let candidates: Vec<NetworkInterface> = interfaces
        .into_iter()
        .filter(|interface| is_viable_lan_interface(interface, is_physical).is_ok())
        .collect();

    let interface = select_best_lan_interface(candidates, is_wired).ok_or_else(|| {
        DiscoveryError::NoInterface("no interfaces available for LAN discovery".to_string())
    })?;
    let net = private_ipv4_net(&interface).ok_or_else(|| {
        DiscoveryError::NoInterface(format!("{} has no IPv4 network", interface.name))
    })?;

    debug!("Selected {} ({}) for broadcast discovery", interface.name, net);
    Ok((interface, net))
}

fn private_ipv4_net(interface: &NetworkInterface) -> Option<Ipv4Network> {
    interface.ips.iter().find_map(|net| match net {
        IpNetwork::V4(v4) if v4.ip().is_private() => Some(*v4),
        _ => None,
    })
}

fn is_viable_lan_interface(
    interface: &NetworkInterface,
    is_physical: impl Fn(&NetworkInterface) -> bool,
) -> Result<(), ViabilityError> {
    if !interface.is_up() {
        return Err(ViabilityError::IsDown);
    }
    if !is_physical(interface) || interface.is_loopback() {
        return Err(ViabilityError::NotPhysical);
    }
    if interface.mac.is_none() {
        return Err(ViabilityError::NoMacAddress);
    }
    if !interface.is_broadcast() {
        return Err(ViabilityError::NotBroadcast);
    }
    if interface.is_point_to_point() {
        return Err(ViabilityError::IsPointToPoint);
    }
    if private_ipv4_net(interface).is_none() {
        return Err(ViabilityError::NoPrivateIpv4);
    }

    Ok(())
}

fn select_best_lan_interface(
    interfaces: Vec<NetworkInterface>,
    is_wired: impl Fn(&NetworkInterface) -> bool,
) -> Option<NetworkInterface> {
    match interfaces.len() {
        0 => None,
        1 => interfaces.into_iter().next(),
        _ => {
            debug!("More than one candidate found, preferring a wired interface");
            let wired = interfaces.iter().position(|interface| is_wired(interface));
            let idx = wired.unwrap_or(0);
            interfaces.into_iter().nth(idx)
        }
    }
}

fn is_wired(interface: &NetworkInterface) -> bool {
    is_physical(interface) && !is_wireless(interface)
}

#[cfg(target_os = "linux")]
mod linux_impl {
    use super::*;
    use std::path::Path;

    pub fn is_physical(interface: &NetworkInterface) -> bool {
        Path::new(&format!("/sys/class/net/{}/device", interface.name)).exists()
    }

    pub fn is_wireless(interface: &NetworkInterface) -> bool {
        Path::new(&format!("/sys/class/net/{}/wireless", interface.name)).exists()
    }
}

#[cfg(not(target_os = "linux"))]
mod fallback_impl {
    use super::*;

    pub fn is_physical(interface: &NetworkInterface) -> bool {
        !interface.is_loopback() && interface.mac.is_some()
    }

    pub fn is_wireless(interface: &NetworkInterface) -> bool {
        interface.name.starts_with("wl")
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
