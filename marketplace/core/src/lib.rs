// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # BAZAAR Marketplace Core
//!
//! Project/Bid lifecycle engine with real-time event propagation.
//!
//! # Architecture
//!
//! - **domain** — Project aggregate, bid state machines, event catalog,
//!   repository and collaborator seams.
//! - **application** — `LifecycleController`, the single writer for every
//!   Project aggregate.
//! - **infrastructure** — storage backends, room broadcaster, external
//!   service clients.
//! - **presentation** — HTTP API and SSE room streams.

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
