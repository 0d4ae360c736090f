// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! `EarningsLedger` implementations.
//!
//! The ledger is credited once per completed project. Both implementations
//! are idempotent per (freelancer, project) pair: repeating a credit for the
//! same pair is a no-op.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::ledger::EarningsLedger;
use crate::domain::project::{LifecycleError, ProjectId, UserId};

/// Records credits in memory. Used by dev mode and tests, which inspect the
/// recorded amounts.
#[derive(Default)]
pub struct InMemoryEarningsLedger {
    credits: Mutex<HashMap<(UserId, ProjectId), f64>>,
}

impl InMemoryEarningsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credit_count(&self) -> usize {
        self.credits.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn credited(&self, freelancer_id: UserId, project_id: ProjectId) -> Option<f64> {
        self.credits
            .lock()
            .ok()
            .and_then(|c| c.get(&(freelancer_id, project_id)).copied())
    }
}

#[async_trait]
impl EarningsLedger for InMemoryEarningsLedger {
    async fn credit(
        &self,
        freelancer_id: UserId,
        project_id: ProjectId,
        amount: f64,
    ) -> Result<(), LifecycleError> {
        let mut credits = self
            .credits
            .lock()
            .map_err(|_| LifecycleError::Internal("ledger mutex poisoned".into()))?;
        if credits.contains_key(&(freelancer_id, project_id)) {
            debug!(%freelancer_id, %project_id, "duplicate credit ignored");
            return Ok(());
        }
        credits.insert((freelancer_id, project_id), amount);
        Ok(())
    }
}

/// Credits the external earnings service.
pub struct HttpEarningsLedger {
    base_url: String,
    client: reqwest::Client,
}

impl HttpEarningsLedger {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EarningsLedger for HttpEarningsLedger {
    async fn credit(
        &self,
        freelancer_id: UserId,
        project_id: ProjectId,
        amount: f64,
    ) -> Result<(), LifecycleError> {
        let url = format!("{}/api/v1/earnings/credit", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "freelancer_id": freelancer_id,
                "project_id": project_id,
                "amount": amount,
            }))
            .send()
            .await
            .map_err(|e| {
                warn!(%e, "earnings service unreachable");
                LifecycleError::Internal(format!("earnings service unreachable: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(LifecycleError::Internal(format!(
                "earnings service rejected credit: {}",
                response.status()
            )));
        }
        Ok(())
    }
}
