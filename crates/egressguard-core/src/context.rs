// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-request connection context shared between the socket-creation hook,
//! the pre-connect check hook, and the execution wrapper.
//!
//! A context belongs to exactly one in-flight request. It must be reset
//! before the request that owns it is re-run, otherwise a stale rejection
//! would be attributed to the new request.

use crate::error::Rejection;

/// Where the current connection attempt sits in the interception protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket has been requested yet.
    #[default]
    Unvalidated,
    /// A real socket was handed out and no rejection is recorded.
    Accepted,
    /// A placeholder socket was handed out and a rejection is recorded.
    Rejected,
}

/// Side channel between the two interception hooks for one request.
#[derive(Debug, Default)]
pub struct ConnectionContext {
    rejection: Option<Rejection>,
    state: ConnectionState,
    sockets_opened: u32,
}

impl ConnectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rejection. A later rejection replaces an earlier one.
    pub fn record_rejection(&mut self, rejection: Rejection) {
        self.rejection = Some(rejection);
        self.state = ConnectionState::Rejected;
        self.sockets_opened += 1;
    }

    /// Note that a real socket was handed out.
    ///
    /// Has no effect on the state of a context that already holds a rejection.
    pub fn mark_accepted(&mut self) {
        self.sockets_opened += 1;
        if self.rejection.is_none() {
            self.state = ConnectionState::Accepted;
        }
    }

    /// Note that a placeholder was handed out without changing the reason.
    pub fn mark_refused(&mut self) {
        self.sockets_opened += 1;
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        self.rejection.as_ref()
    }

    /// The recorded rejection as a human-readable reason.
    pub fn rejection_reason(&self) -> Option<String> {
        self.rejection.as_ref().map(ToString::to_string)
    }

    pub fn is_rejected(&self) -> bool {
        self.rejection.is_some()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// How many sockets the hooks handed out for this request.
    pub fn sockets_opened(&self) -> u32 {
        self.sockets_opened
    }

    /// Clear everything before the owning request is run again.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
