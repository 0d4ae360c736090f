// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Earnings ledger seam.
//!
//! Credited exactly once per completed project, after the status transition
//! has committed. Implementations are assumed idempotent per
//! (freelancer, project) pair.

use async_trait::async_trait;

use crate::domain::project::{LifecycleError, ProjectId, UserId};

#[async_trait]
pub trait EarningsLedger: Send + Sync {
    async fn credit(
        &self,
        freelancer_id: UserId,
        project_id: ProjectId,
        amount: f64,
    ) -> Result<(), LifecycleError>;
}
