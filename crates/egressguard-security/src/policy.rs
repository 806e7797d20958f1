// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Address policy: accept/reject decisions for concrete resolved addresses.
//!
//! Precedence for IPs is whitelist > blacklist > local-address heuristic >
//! default accept, so a whitelist entry punches a hole through the blacklist.
//! Ports are asymmetric: the whitelist is necessary but not sufficient and
//! the blacklist always applies.

use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddrV4};
use std::sync::Arc;

use egressguard_config::model::PolicyConfig;
use egressguard_core::{
    AddressFamily, CandidateAddress, Cidr, EgressError, FailureMode, Rejection, SocketKind,
    TransportProtocol, ValidationOutcome, DEFAULT_IP_BLACKLIST, DEFAULT_PORT_WHITELIST,
};
use tracing::{debug, info};

use crate::local_addr::{LocalAddressDetector, RoutingProbe};

/// Immutable egress policy. Share it behind an `Arc` across requests.
#[derive(Debug, Clone)]
pub struct Policy {
    ip_whitelist: Vec<Cidr>,
    ip_blacklist: Vec<Cidr>,
    port_whitelist: BTreeSet<u16>,
    port_blacklist: BTreeSet<u16>,
    detect_local_addresses: bool,
    failure_mode: FailureMode,
    local_detector: Arc<dyn LocalAddressDetector>,
}

impl Policy {
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::default()
    }

    /// Build a policy from the `[policy]` config section.
    pub fn from_config(config: &PolicyConfig) -> Result<Self, EgressError> {
        let target = config
            .local_probe_target
            .parse::<SocketAddrV4>()
            .map_err(|_| {
                EgressError::Config(format!(
                    "local probe target `{}` is not an IPv4 address with port",
                    config.local_probe_target
                ))
            })?;

        Self::builder()
            .ip_whitelist(&config.ip_whitelist)
            .ip_blacklist(&config.ip_blacklist)
            .port_whitelist(config.port_whitelist.iter().copied())
            .port_blacklist(config.port_blacklist.iter().copied())
            .detect_local_addresses(config.detect_local_addresses)
            .failure_mode(config.failure_mode)
            .local_address_detector(Arc::new(RoutingProbe::new(target)))
            .build()
    }

    pub fn failure_mode(&self) -> FailureMode {
        self.failure_mode
    }

    pub fn detects_local_addresses(&self) -> bool {
        self.detect_local_addresses
    }

    pub fn ip_whitelist(&self) -> &[Cidr] {
        &self.ip_whitelist
    }

    pub fn ip_blacklist(&self) -> &[Cidr] {
        &self.ip_blacklist
    }

    pub fn port_whitelist(&self) -> &BTreeSet<u16> {
        &self.port_whitelist
    }

    pub fn port_blacklist(&self) -> &BTreeSet<u16> {
        &self.port_blacklist
    }

    /// Whether `port` may be dialed.
    pub fn validate_port(&self, port: u16) -> bool {
        if !self.port_whitelist.is_empty() && !self.port_whitelist.contains(&port) {
            return false;
        }
        !self.port_blacklist.contains(&port)
    }

    /// Whether `ip` may be dialed.
    pub fn validate_ip(&self, ip: Ipv4Addr) -> bool {
        if let Some(allowed) = self.ip_whitelist.iter().find(|c| c.contains(ip)) {
            if let Some(blocked) = self.ip_blacklist.iter().find(|c| c.contains(ip)) {
                info!(ip = %ip, whitelist = %allowed, blacklist = %blocked, "whitelist entry overrides blacklist");
            }
            return true;
        }

        if let Some(blocked) = self.ip_blacklist.iter().find(|c| c.contains(ip)) {
            debug!(ip = %ip, cidr = %blocked, "address is blacklisted");
            return false;
        }

        if self.detect_local_addresses && self.local_detector.detect() == Some(ip) {
            debug!(ip = %ip, "address is the host's own outward-facing address");
            return false;
        }

        true
    }

    /// Validate a resolved candidate. The first failing check wins.
    pub fn validate_candidate(&self, candidate: &CandidateAddress) -> ValidationOutcome {
        if candidate.family != AddressFamily::Inet {
            return ValidationOutcome::Reject(Rejection::InvalidAddressFamily(candidate.family));
        }
        let IpAddr::V4(ip) = candidate.ip else {
            // Family says IPv4 but the address disagrees.
            return ValidationOutcome::Reject(Rejection::InvalidAddressFamily(
                AddressFamily::Inet6,
            ));
        };
        if candidate.socket_kind != SocketKind::Stream {
            return ValidationOutcome::Reject(Rejection::InvalidSocketType(candidate.socket_kind));
        }
        if candidate.protocol != TransportProtocol::Tcp {
            return ValidationOutcome::Reject(Rejection::InvalidTransportProtocol(
                candidate.protocol,
            ));
        }
        if !self.validate_port(candidate.port) {
            return ValidationOutcome::Reject(Rejection::PortNotAllowed(candidate.port));
        }
        if !self.validate_ip(ip) {
            return ValidationOutcome::Reject(Rejection::IpNotAllowed(candidate.ip));
        }
        ValidationOutcome::Accept
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            ip_whitelist: Vec::new(),
            ip_blacklist: DEFAULT_IP_BLACKLIST
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect(),
            port_whitelist: DEFAULT_PORT_WHITELIST.into_iter().collect(),
            port_blacklist: BTreeSet::new(),
            detect_local_addresses: false,
            failure_mode: FailureMode::default(),
            local_detector: Arc::new(RoutingProbe::default()),
        }
    }
}

/// Builder for [`Policy`]. Lists left unset use the default tables.
#[derive(Debug, Default)]
pub struct PolicyBuilder {
    ip_whitelist: Option<Vec<String>>,
    ip_blacklist: Option<Vec<String>>,
    port_whitelist: Option<Vec<u16>>,
    port_blacklist: Option<Vec<u16>>,
    detect_local_addresses: bool,
    failure_mode: FailureMode,
    local_detector: Option<Arc<dyn LocalAddressDetector>>,
}

impl PolicyBuilder {
    pub fn ip_whitelist<I, S>(mut self, cidrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ip_whitelist = Some(cidrs.into_iter().map(|s| s.as_ref().to_string()).collect());
        self
    }

    pub fn ip_blacklist<I, S>(mut self, cidrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ip_blacklist = Some(cidrs.into_iter().map(|s| s.as_ref().to_string()).collect());
        self
    }

    /// An empty whitelist allows every port that is not blacklisted.
    pub fn port_whitelist(mut self, ports: impl IntoIterator<Item = u16>) -> Self {
        self.port_whitelist = Some(ports.into_iter().collect());
        self
    }

    pub fn port_blacklist(mut self, ports: impl IntoIterator<Item = u16>) -> Self {
        self.port_blacklist = Some(ports.into_iter().collect());
        self
    }

    pub fn detect_local_addresses(mut self, enabled: bool) -> Self {
        self.detect_local_addresses = enabled;
        self
    }

    pub fn failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    pub fn local_address_detector(mut self, detector: Arc<dyn LocalAddressDetector>) -> Self {
        self.local_detector = Some(detector);
        self
    }

    /// Convert the raw sequences into sets once. Malformed CIDRs fail here.
    pub fn build(self) -> Result<Policy, EgressError> {
        let defaults = Policy::default();

        let ip_whitelist = match self.ip_whitelist {
            Some(raw) => parse_cidrs(&raw)?,
            None => defaults.ip_whitelist,
        };
        let ip_blacklist = match self.ip_blacklist {
            Some(raw) => parse_cidrs(&raw)?,
            None => defaults.ip_blacklist,
        };

        Ok(Policy {
            ip_whitelist,
            ip_blacklist,
            port_whitelist: self
                .port_whitelist
                .map(BTreeSet::from_iter)
                .unwrap_or(defaults.port_whitelist),
            port_blacklist: self
                .port_blacklist
                .map(BTreeSet::from_iter)
                .unwrap_or(defaults.port_blacklist),
            detect_local_addresses: self.detect_local_addresses,
            failure_mode: self.failure_mode,
            local_detector: self.local_detector.unwrap_or(defaults.local_detector),
        })
    }
}

fn parse_cidrs(raw: &[String]) -> Result<Vec<Cidr>, EgressError> {
    let mut cidrs: Vec<Cidr> = Vec::with_capacity(raw.len());
    for entry in raw {
        let cidr = entry.parse::<Cidr>()?;
        if !cidrs.contains(&cidr) {
            cidrs.push(cidr);
        }
    }
    Ok(cidrs)
}
