// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! IPv4 CIDR blocks and the containment check used by the address policy.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::EgressError;

/// An IPv4 block in `network/prefix_len` notation.
///
/// Host bits beyond the prefix are kept as written. Matching masks both the
/// candidate and the network, so `10.1.2.3/8` behaves exactly like `10.0.0.0/8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cidr {
    network: Ipv4Addr,
    prefix_len: u8,
}

impl Cidr {
    /// Create a block, rejecting prefix lengths above 32.
    pub fn new(network: Ipv4Addr, prefix_len: u8) -> Result<Self, EgressError> {
        if prefix_len > 32 {
            return Err(EgressError::InvalidPolicyInput(format!(
                "prefix length {prefix_len} exceeds 32 in `{network}/{prefix_len}`"
            )));
        }
        Ok(Self {
            network,
            prefix_len,
        })
    }

    /// The network address as written (host bits are not cleared).
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    /// The prefix length, `0..=32`.
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// The 32-bit mask for this prefix.
    ///
    /// `/0` yields `0` (matches everything) and `/32` yields `u32::MAX`
    /// (exact match). `checked_shl` keeps the `/0` case from shifting by 32.
    pub fn mask(&self) -> u32 {
        u32::MAX
            .checked_shl(32 - u32::from(self.prefix_len))
            .unwrap_or(0)
    }

    /// Whether `ip` falls inside this block.
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        let mask = self.mask();
        (u32::from(ip) & mask) == (u32::from(self.network) & mask)
    }
}

/// Free-function form of [`Cidr::contains`].
pub fn matches(ip: Ipv4Addr, cidr: &Cidr) -> bool {
    cidr.contains(ip)
}

impl FromStr for Cidr {
    type Err = EgressError;

    /// Parse `a.b.c.d/len`, or a bare address as a `/32`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (addr, prefix) = match s.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (s, None),
        };

        let network = addr.parse::<Ipv4Addr>().map_err(|_| {
            EgressError::InvalidPolicyInput(format!("`{s}` is not an IPv4 CIDR block"))
        })?;

        let prefix_len = match prefix {
            Some(p) => p.parse::<u8>().map_err(|_| {
                EgressError::InvalidPolicyInput(format!("invalid prefix length in `{s}`"))
            })?,
            None => 32,
        };

        Cidr::new(network, prefix_len)
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}
