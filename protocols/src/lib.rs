//! Wire formats used by broadcast discovery.

pub mod arp;

use thiserror::Error;

pub const ETH_HDR_LEN: usize = 14;
pub const ARP_LEN: usize = 28;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PacketError {
    #[error("buffer too small for an ethernet header")]
    EthernetBuffer,
    #[error("buffer too small for an ARP payload")]
    ArpBuffer,
    #[error("truncated or invalid frame")]
    Truncated,
}
