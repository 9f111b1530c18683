//! Peer address allocation
//!
//! Peers get a host suffix inside a single IPv4 /24; the same suffix value
//! is added to the IPv6 network to form the peer's IPv6 address.
//!
//! Allocation is monotonic: the next suffix is one past the highest suffix
//! found on any `AllowedIPs` line, so a removed peer's address is never
//! handed out again while a later peer still exists. The gateway owns `.1`,
//! `.0` and `.255` are never allocated.
//!
//! Keys are matched the way `wg` reads them: surrounding whitespace is
//! ignored and case does not matter. The block editor is stricter; a line it
//! does not recognise still counts as a taken address here.

use crate::document::ConfigDocument;
use crate::error::{PeerSyncError, PeerSyncResult};
use ipnetwork::{Ipv4Network, Ipv6Network};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Suffix assumed to be held by the gateway itself
pub const GATEWAY_SUFFIX: u8 = 1;

/// Highest usable host suffix in a /24
pub const MAX_SUFFIX: u8 = 254;

/// Address layout of the VPN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressPlan {
    ipv4: Ipv4Network,
    ipv6: Ipv6Network,
}

impl AddressPlan {
    /// Build a plan from CIDR strings; the IPv4 network must be a /24.
    pub fn new(ipv4: &str, ipv6: &str) -> PeerSyncResult<Self> {
        let ipv4: Ipv4Network = ipv4
            .parse()
            .map_err(|e| PeerSyncError::Config(format!("invalid ipv4_network {ipv4:?}: {e}")))?;
        if ipv4.prefix() != 24 {
            return Err(PeerSyncError::Config(format!(
                "ipv4_network must be a /24, got /{}",
                ipv4.prefix()
            )));
        }
        let ipv6: Ipv6Network = ipv6
            .parse()
            .map_err(|e| PeerSyncError::Config(format!("invalid ipv6_network {ipv6:?}: {e}")))?;
        if ipv6.prefix() > 120 {
            return Err(PeerSyncError::Config(format!(
                "ipv6_network /{} is too small for 8-bit host suffixes",
                ipv6.prefix()
            )));
        }

        Ok(Self {
            ipv4: Ipv4Network::new(ipv4.network(), 24)
                .map_err(|e| PeerSyncError::Config(e.to_string()))?,
            ipv6: Ipv6Network::new(ipv6.network(), ipv6.prefix())
                .map_err(|e| PeerSyncError::Config(e.to_string()))?,
        })
    }

    /// IPv4 network
    pub fn ipv4_network(&self) -> Ipv4Network {
        self.ipv4
    }

    /// IPv4 address for `suffix`
    pub fn ipv4(&self, suffix: u8) -> Ipv4Addr {
        let [a, b, c, _] = self.ipv4.network().octets();
        Ipv4Addr::new(a, b, c, suffix)
    }

    /// IPv6 address carrying the same suffix value
    pub fn ipv6(&self, suffix: u8) -> Ipv6Addr {
        Ipv6Addr::from(u128::from(self.ipv6.network()) | u128::from(suffix))
    }

    /// Host suffix of `addr` if it lies in the IPv4 network
    pub fn suffix_of(&self, addr: Ipv4Addr) -> Option<u8> {
        self.ipv4.contains(addr).then(|| addr.octets()[3])
    }
}

/// Value of an `AllowedIPs` assignment, in any case and indentation.
fn allowed_ips_value(line: &str) -> Option<&str> {
    let (key, value) = line.split_once('=')?;
    key.trim()
        .eq_ignore_ascii_case("AllowedIPs")
        .then(|| value.split('#').next().unwrap_or_default().trim())
}

/// Next free host suffix for a new peer.
pub fn next_host_suffix(document: &ConfigDocument, plan: &AddressPlan) -> PeerSyncResult<u8> {
    let highest = document
        .lines()
        .iter()
        .filter_map(|line| allowed_ips_value(line))
        .flat_map(|value| value.split(','))
        .filter_map(|cidr| cidr.trim().split('/').next()?.parse::<Ipv4Addr>().ok())
        .filter_map(|addr| plan.suffix_of(addr))
        .max();

    match highest {
        None => Ok(GATEWAY_SUFFIX + 1),
        Some(max) if max >= MAX_SUFFIX => Err(PeerSyncError::AddressSpaceExhausted {
            network: plan.ipv4_network().to_string(),
        }),
        Some(max) => Ok(max.max(GATEWAY_SUFFIX) + 1),
    }
}
