// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Identity resolution seam.
//!
//! Credential verification lives outside the engine; the controller only
//! needs a resolved identity and role before every operation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::project::{LifecycleError, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Freelancer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn client(user_id: UserId) -> Self {
        Self { user_id, role: Role::Client }
    }

    pub fn freelancer(user_id: UserId) -> Self {
        Self { user_id, role: Role::Freelancer }
    }
}

/// Resolves an opaque caller credential to an identity.
#[async_trait]
pub trait AuthGate: Send + Sync {
    async fn resolve(&self, credential: &str) -> Result<Identity, LifecycleError>;
}
