// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for the contract between the policy layer and a
//! hook-capable transfer engine.

pub mod engine;

pub use engine::{ConnectHooks, TransferEngine};
