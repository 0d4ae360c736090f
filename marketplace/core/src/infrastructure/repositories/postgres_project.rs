// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Project Repository
//!
//! Production `ProjectRepository` backed by the `projects` table. The
//! aggregate is stored as a JSONB document next to a handful of queryable
//! columns; `atomic_update` uses optimistic versioning (compare-and-set on
//! the `version` column) with bounded retry and backoff, surfacing
//! `Conflict` once attempts are exhausted.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;
use std::time::Duration;
use tracing::debug;

use crate::domain::events::ProjectEvent;
use crate::domain::project::{LifecycleError, Project, ProjectId, ProjectStatus};
use crate::domain::repository::{
    ProjectFilter, ProjectMutator, ProjectRepository, RepositoryError,
};

/// CAS attempts before a concurrent writer wins and we surface `Conflict`.
const MAX_CAS_ATTEMPTS: u32 = 5;
const CAS_BACKOFF: Duration = Duration::from_millis(10);

pub struct PostgresProjectRepository {
    pool: PgPool,
}

fn status_str(status: ProjectStatus) -> &'static str {
    match status {
        ProjectStatus::Open => "open",
        ProjectStatus::InProgress => "in-progress",
        ProjectStatus::Completed => "completed",
        ProjectStatus::Cancelled => "cancelled",
    }
}

impl PostgresProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotent schema bootstrap, run once at startup.
    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS projects (
                id UUID PRIMARY KEY,
                client_id UUID NOT NULL,
                freelancer_id UUID,
                status TEXT NOT NULL,
                document JSONB NOT NULL,
                version BIGINT NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to create schema: {}", e)))?;
        Ok(())
    }

    fn decode(row: &sqlx::postgres::PgRow) -> Result<(Project, i64), RepositoryError> {
        let document: serde_json::Value = row.get("document");
        let version: i64 = row.get("version");
        let project: Project = serde_json::from_value(document)?;
        Ok((project, version))
    }
}

#[async_trait]
impl ProjectRepository for PostgresProjectRepository {
    async fn create(&self, project: &Project) -> Result<(), RepositoryError> {
        let document = serde_json::to_value(project)?;
        sqlx::query(
            r#"
            INSERT INTO projects (
                id, client_id, freelancer_id, status, document,
                version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, 0, $6, $7)
            "#,
        )
        .bind(project.id.0)
        .bind(project.client_id.0)
        .bind(project.freelancer_id.map(|f| f.0))
        .bind(status_str(project.status))
        .bind(document)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to create project: {}", e)))?;
        Ok(())
    }

    async fn find_by_id(&self, id: ProjectId) -> Result<Option<Project>, RepositoryError> {
        let row = sqlx::query("SELECT document, version FROM projects WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(Self::decode(&row)?.0)),
            None => Ok(None),
        }
    }

    async fn find_many(&self, filter: &ProjectFilter) -> Result<Vec<Project>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT document, version FROM projects
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR client_id = $2)
              AND ($3::uuid IS NULL OR freelancer_id = $3)
            ORDER BY created_at ASC
            "#,
        )
        .bind(filter.status.map(status_str))
        .bind(filter.client_id.map(|c| c.0))
        .bind(filter.freelancer_id.map(|f| f.0))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let mut projects = Vec::with_capacity(rows.len());
        for row in rows {
            projects.push(Self::decode(&row)?.0);
        }
        Ok(projects)
    }

    async fn atomic_update(
        &self,
        id: ProjectId,
        mut mutator: ProjectMutator,
    ) -> Result<(Project, Vec<ProjectEvent>), LifecycleError> {
        for attempt in 0..MAX_CAS_ATTEMPTS {
            let row = sqlx::query("SELECT document, version FROM projects WHERE id = $1")
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| LifecycleError::Internal(e.to_string()))?
                .ok_or_else(|| LifecycleError::NotFound(format!("project {id}")))?;
            let (mut project, version) =
                Self::decode(&row).map_err(LifecycleError::from)?;

            let events = mutator(&mut project)?;
            let document = serde_json::to_value(&project)
                .map_err(|e| LifecycleError::Internal(e.to_string()))?;

            let result = sqlx::query(
                r#"
                UPDATE projects
                SET document = $1, status = $2, freelancer_id = $3,
                    updated_at = $4, version = version + 1
                WHERE id = $5 AND version = $6
                "#,
            )
            .bind(document)
            .bind(status_str(project.status))
            .bind(project.freelancer_id.map(|f| f.0))
            .bind(project.updated_at)
            .bind(id.0)
            .bind(version)
            .execute(&self.pool)
            .await
            .map_err(|e| LifecycleError::Internal(e.to_string()))?;

            if result.rows_affected() == 1 {
                return Ok((project, events));
            }

            // Lost the CAS race; back off and retry from a fresh snapshot.
            debug!(%id, attempt, "optimistic update conflict, retrying");
            tokio::time::sleep(CAS_BACKOFF * (attempt + 1)).await;
        }
        Err(LifecycleError::Conflict(format!(
            "concurrent update on project {id} after {MAX_CAS_ATTEMPTS} attempts"
        )))
    }

    async fn delete(&self, id: ProjectId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("project {id}")));
        }
        Ok(())
    }
}
