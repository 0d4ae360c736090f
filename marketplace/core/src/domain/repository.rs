// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Project Store Interface
//!
//! Persistence contract for the `Project` aggregate, following the DDD
//! repository pattern: interface in the domain layer, implementations in
//! `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `ProjectRepository` | `Project` | `InMemoryProjectRepository`, `PostgresProjectRepository` |
//!
//! `atomic_update` is the sole concurrency primitive the engine relies on:
//! no two successful calls for the same id may interleave their reads and
//! writes, and readers only ever observe whole-aggregate snapshots. The
//! in-memory store serializes writers via its per-entry lock; the Postgres
//! store uses optimistic versioning with bounded retry.

use async_trait::async_trait;

use crate::domain::events::ProjectEvent;
use crate::domain::project::{LifecycleError, Project, ProjectId, ProjectStatus, UserId};

/// Mutator applied to a copy of the stored aggregate; the copy is committed
/// only when the mutator succeeds, so a failed operation has no effect.
/// `FnMut` so that an optimistic store may re-run it on a fresh snapshot
/// after losing a compare-and-set race.
pub type ProjectMutator =
    Box<dyn FnMut(&mut Project) -> Result<Vec<ProjectEvent>, LifecycleError> + Send>;

/// Read-side filter for `find_many`.
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub client_id: Option<UserId>,
    pub freelancer_id: Option<UserId>,
}

impl ProjectFilter {
    pub fn matches(&self, project: &Project) -> bool {
        if let Some(status) = self.status {
            if project.status != status {
                return false;
            }
        }
        if let Some(client_id) = self.client_id {
            if project.client_id != client_id {
                return false;
            }
        }
        if let Some(freelancer_id) = self.freelancer_id {
            if project.freelancer_id != Some(freelancer_id) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Persist a freshly created aggregate.
    async fn create(&self, project: &Project) -> Result<(), RepositoryError>;

    /// Fetch one aggregate snapshot.
    async fn find_by_id(&self, id: ProjectId) -> Result<Option<Project>, RepositoryError>;

    /// List aggregate snapshots matching the filter, ordered by creation time.
    async fn find_many(&self, filter: &ProjectFilter) -> Result<Vec<Project>, RepositoryError>;

    /// Atomic read-modify-write on a single aggregate. Returns the committed
    /// snapshot together with the events the mutator produced.
    async fn atomic_update(
        &self,
        id: ProjectId,
        mutator: ProjectMutator,
    ) -> Result<(Project, Vec<ProjectEvent>), LifecycleError>;

    /// Remove an aggregate. Lifecycle legality is checked by the controller
    /// before this is called.
    async fn delete(&self, id: ProjectId) -> Result<(), RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

impl From<RepositoryError> for LifecycleError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => LifecycleError::NotFound(what),
            other => LifecycleError::Internal(other.to_string()),
        }
    }
}
