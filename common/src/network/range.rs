use std::net::Ipv4Addr;

use pnet::ipnetwork::Ipv4Network;

/// Largest subnet a broadcast sweep will probe in full (a /22).
pub const MAX_SWEEP_HOSTS: u32 = 1 << 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start_addr: Ipv4Addr,
    pub end_addr: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Self {
        Self {
            start_addr,
            end_addr,
        }
    }

    pub fn len(&self) -> usize {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        if end < start {
            0
        } else {
            (end - start) as usize + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_iter(&self) -> impl Iterator<Item = Ipv4Addr> {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        (start..=end).map(Ipv4Addr::from)
    }
}

/// Host addresses of `net` worth probing, without network and broadcast addresses.
///
/// Subnets wider than [`MAX_SWEEP_HOSTS`] are narrowed to the block around the
/// interface's own address.
pub fn sweep_range(net: Ipv4Network) -> Ipv4Range {
    let prefix: u8 = if net.size() > MAX_SWEEP_HOSTS {
        32 - MAX_SWEEP_HOSTS.trailing_zeros() as u8
    } else {
        net.prefix()
    };

    let mask: u32 = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
    let own: u32 = net.ip().into();
    let network: u32 = own & mask;
    let broadcast: u32 = network | !mask;

    if prefix >= 31 {
        return Ipv4Range::new(Ipv4Addr::from(network), Ipv4Addr::from(broadcast));
    }

    Ipv4Range::new(Ipv4Addr::from(network + 1), Ipv4Addr::from(broadcast - 1))
}
