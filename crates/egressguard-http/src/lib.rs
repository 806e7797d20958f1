// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hook-driven HTTP(S) transfer engine.
//!
//! [`HttpTransfer`] resolves the target itself and hands every candidate to
//! the installed [`ConnectHooks`](egressguard_core::ConnectHooks) before a
//! socket is connected, which is the hook point the policy layer needs.
//! HTTP/1.1 is spoken with hyper; HTTPS goes through rustls.

pub mod resolve;
pub mod tls;
pub mod transfer;

pub use resolve::{Resolve, StaticResolver, SystemResolver};
pub use transfer::HttpTransfer;
