// SPDX-FileCopyrightText: 2026 Egressguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for egressguard integration tests.
//!
//! Provides a scripted transfer engine for fast, deterministic tests that
//! exercise the interception protocol without touching the network.
//!
//! # Components
//!
//! - [`MockEngine`] - Transfer engine that walks a fixed list of resolved candidates

pub mod mock_engine;

pub use mock_engine::{ConnectionPath, MockEngine};
