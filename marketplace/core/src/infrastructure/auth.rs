// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! `AuthGate` implementations.
//!
//! `HttpAuthGate` delegates credential resolution to the external identity
//! service; `StaticAuthGate` holds pre-issued credentials for development
//! mode and tests.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::warn;

use crate::domain::auth::{AuthGate, Identity};
use crate::domain::project::LifecycleError;

/// Credential table for dev mode and tests. Not for production.
#[derive(Default)]
pub struct StaticAuthGate {
    credentials: DashMap<String, Identity>,
}

impl StaticAuthGate {
    pub fn new() -> Self {
        Self {
            credentials: DashMap::new(),
        }
    }

    /// Register a credential and the identity it resolves to.
    pub fn issue(&self, credential: impl Into<String>, identity: Identity) {
        self.credentials.insert(credential.into(), identity);
    }
}

#[async_trait]
impl AuthGate for StaticAuthGate {
    async fn resolve(&self, credential: &str) -> Result<Identity, LifecycleError> {
        self.credentials
            .get(credential)
            .map(|i| *i)
            .ok_or_else(|| LifecycleError::Unauthorized("unknown credential".into()))
    }
}

/// Resolves credentials against the external identity service.
pub struct HttpAuthGate {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAuthGate {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AuthGate for HttpAuthGate {
    async fn resolve(&self, credential: &str) -> Result<Identity, LifecycleError> {
        let url = format!("{}/api/v1/auth/resolve", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "credential": credential }))
            .send()
            .await
            .map_err(|e| {
                warn!(%e, "auth service unreachable");
                LifecycleError::Internal(format!("auth service unreachable: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(LifecycleError::Unauthorized(
                "credential rejected by auth service".into(),
            ));
        }
        response
            .json::<Identity>()
            .await
            .map_err(|e| LifecycleError::Internal(format!("malformed auth response: {e}")))
    }
}
