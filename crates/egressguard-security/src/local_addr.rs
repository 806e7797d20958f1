// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Best-effort discovery of the host's outward-facing IPv4 address.
//!
//! This is a heuristic. It finds the address the routing table would pick
//! for the default route, not every address assigned to the host, so it is
//! a supplementary deny signal and never a security boundary on its own.

use std::fmt::Debug;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

use egressguard_core::DEFAULT_LOCAL_PROBE_TARGET;
use tracing::debug;

/// Source of the host's own address, used as an extra deny signal.
pub trait LocalAddressDetector: Send + Sync + Debug {
    /// The detected address, or `None` when no signal is available.
    fn detect(&self) -> Option<Ipv4Addr>;
}

/// Asks the OS which local address it would use to reach `target`.
///
/// A UDP socket is `connect`ed to the target, which only selects a route;
/// no packet leaves the host.
#[derive(Debug, Clone)]
pub struct RoutingProbe {
    target: SocketAddrV4,
}

impl RoutingProbe {
    pub fn new(target: SocketAddrV4) -> Self {
        Self { target }
    }

    pub fn target(&self) -> SocketAddrV4 {
        self.target
    }
}

impl Default for RoutingProbe {
    fn default() -> Self {
        let target = DEFAULT_LOCAL_PROBE_TARGET
            .parse()
            .unwrap_or(SocketAddrV4::new(Ipv4Addr::new(8, 8, 8, 8), 53));
        Self { target }
    }
}

impl LocalAddressDetector for RoutingProbe {
    fn detect(&self) -> Option<Ipv4Addr> {
        let probe = || -> std::io::Result<SocketAddr> {
            let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
            socket.connect(self.target)?;
            socket.local_addr()
        };

        match probe() {
            Ok(SocketAddr::V4(local)) if !local.ip().is_unspecified() => Some(*local.ip()),
            Ok(other) => {
                debug!(local = %other, "routing probe returned no usable local address");
                None
            }
            Err(e) => {
                debug!(target = %self.target, error = %e, "routing probe failed, no local address signal");
                None
            }
        }
    }
}

/// A fixed answer, for pinning the local address in config or tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLocalAddress(pub Option<Ipv4Addr>);

impl LocalAddressDetector for StaticLocalAddress {
    fn detect(&self) -> Option<Ipv4Addr> {
        self.0
    }
}
