// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Default policy tables.

/// IANA special-purpose and private IPv4 ranges (RFC 6890 and friends).
pub const DEFAULT_IP_BLACKLIST: [&str; 15] = [
    "0.0.0.0/8",       // "this" network
    "10.0.0.0/8",      // RFC 1918
    "100.64.0.0/10",   // shared address space (CGNAT)
    "127.0.0.0/8",     // loopback
    "169.254.0.0/16",  // link-local, cloud metadata
    "172.16.0.0/12",   // RFC 1918
    "192.0.0.0/29",    // IETF protocol assignments (DS-Lite)
    "192.0.2.0/24",    // TEST-NET-1
    "192.88.99.0/24",  // 6to4 relay anycast
    "192.168.0.0/16",  // RFC 1918
    "198.18.0.0/15",   // benchmarking
    "198.51.100.0/24", // TEST-NET-2
    "203.0.113.0/24",  // TEST-NET-3
    "224.0.0.0/4",     // multicast
    "240.0.0.0/4",     // reserved, broadcast
];

/// Plain and TLS HTTP ports plus their common alternates.
pub const DEFAULT_PORT_WHITELIST: [u16; 4] = [80, 443, 8080, 8443];

/// Well-known public endpoint used to ask the routing table for the
/// outward-facing local address. No packet is sent to it.
pub const DEFAULT_LOCAL_PROBE_TARGET: &str = "8.8.8.8:53";
