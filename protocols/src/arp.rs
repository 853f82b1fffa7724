//! ARP request frames for the broadcast sweep and parsing of the replies.

use std::net::Ipv4Addr;

use pnet::packet::Packet;
use pnet::packet::arp::{ArpHardwareTypes, ArpOperations, ArpPacket, MutableArpPacket};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket, MutableEthernetPacket};
use pnet::util::MacAddr;

use crate::{ARP_LEN, ETH_HDR_LEN, PacketError};

/// A host that answered an ARP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpReply {
    pub sender_ip: Ipv4Addr,
    pub sender_mac: MacAddr,
}

/// Builds a broadcast "who-has `target_addr`" frame.
pub fn create_request(
    src_mac: MacAddr,
    src_addr: Ipv4Addr,
    target_addr: Ipv4Addr,
) -> Result<Vec<u8>, PacketError> {
    let mut buffer = vec![0u8; ETH_HDR_LEN + ARP_LEN];

    {
        let mut eth = MutableEthernetPacket::new(&mut buffer).ok_or(PacketError::EthernetBuffer)?;
        eth.set_source(src_mac);
        eth.set_destination(MacAddr::broadcast());
        eth.set_ethertype(EtherTypes::Arp);
    }

    request_payload(&mut buffer, src_mac, src_addr, target_addr)?;
    Ok(buffer)
}

pub fn request_payload(
    buffer: &mut [u8],
    src_mac: MacAddr,
    src_addr: Ipv4Addr,
    target_addr: Ipv4Addr,
) -> Result<(), PacketError> {
    if ETH_HDR_LEN + ARP_LEN > buffer.len() {
        return Err(PacketError::ArpBuffer);
    }
    let mut arp = MutableArpPacket::new(&mut buffer[ETH_HDR_LEN..ETH_HDR_LEN + ARP_LEN])
        .ok_or(PacketError::ArpBuffer)?;
    arp.set_hardware_type(ArpHardwareTypes::Ethernet);
    arp.set_protocol_type(EtherTypes::Ipv4);
    arp.set_hw_addr_len(6);
    arp.set_proto_addr_len(4);
    arp.set_operation(ArpOperations::Request);
    arp.set_sender_hw_addr(src_mac);
    arp.set_target_hw_addr(MacAddr::zero());
    arp.set_sender_proto_addr(src_addr);
    arp.set_target_proto_addr(target_addr);
    Ok(())
}

/// Extracts the sender of an ARP reply.
///
/// Returns `Ok(None)` for well-formed frames that are not ARP replies, so the
/// capture loop can skip unrelated traffic cheaply.
pub fn parse_reply(frame: &[u8]) -> Result<Option<ArpReply>, PacketError> {
    let eth = EthernetPacket::new(frame).ok_or(PacketError::Truncated)?;
    if eth.get_ethertype() != EtherTypes::Arp {
        return Ok(None);
    }

    let arp = ArpPacket::new(eth.payload()).ok_or(PacketError::Truncated)?;
    if arp.get_operation() != ArpOperations::Reply {
        return Ok(None);
    }

    Ok(Some(ArpReply {
        sender_ip: arp.get_sender_proto_addr(),
        sender_mac: arp.get_sender_hw_addr(),
    }))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
