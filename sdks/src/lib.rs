// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Rust SDK for the BAZAAR marketplace API.
//!
//! Wraps the HTTP operation catalog in a typed client. Domain types are
//! re-exported from the core crate so SDK users work with the same
//! aggregates the engine commits.

pub mod client;

pub use client::MarketplaceClient;

pub use bazaar_marketplace_core::domain::auth::{Identity, Role};
pub use bazaar_marketplace_core::domain::events::ProjectEvent;
pub use bazaar_marketplace_core::domain::project::{
    Bid, BidId, BidStatus, CounterOffer, Project, ProjectDraft, ProjectId, ProjectStatus, UserId,
};
