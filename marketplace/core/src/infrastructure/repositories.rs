// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! In-memory `ProjectRepository` used for development and tests; the
//! PostgreSQL implementation lives in `repositories::postgres_project` and
//! is selected at startup when `DATABASE_URL` is configured.

pub mod postgres_project;

pub use postgres_project::PostgresProjectRepository;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::events::ProjectEvent;
use crate::domain::project::{LifecycleError, Project, ProjectId};
use crate::domain::repository::{
    ProjectFilter, ProjectMutator, ProjectRepository, RepositoryError,
};

#[derive(Clone, Default)]
pub struct InMemoryProjectRepository {
    projects: DashMap<ProjectId, Project>,
}

impl InMemoryProjectRepository {
    pub fn new() -> Self {
        Self {
            projects: DashMap::new(),
        }
    }
}

#[async_trait]
impl ProjectRepository for InMemoryProjectRepository {
    async fn create(&self, project: &Project) -> Result<(), RepositoryError> {
        self.projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ProjectId) -> Result<Option<Project>, RepositoryError> {
        Ok(self.projects.get(&id).map(|p| p.clone()))
    }

    async fn find_many(&self, filter: &ProjectFilter) -> Result<Vec<Project>, RepositoryError> {
        let mut projects: Vec<Project> = self
            .projects
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        projects.sort_by_key(|p| p.created_at);
        Ok(projects)
    }

    async fn atomic_update(
        &self,
        id: ProjectId,
        mut mutator: ProjectMutator,
    ) -> Result<(Project, Vec<ProjectEvent>), LifecycleError> {
        // The entry lock serializes writers for this id; the mutator runs on
        // a copy so a failed precondition leaves the stored aggregate as-is.
        let mut entry = self
            .projects
            .get_mut(&id)
            .ok_or_else(|| LifecycleError::NotFound(format!("project {id}")))?;
        let mut updated = entry.clone();
        let events = mutator(&mut updated)?;
        *entry = updated.clone();
        Ok((updated, events))
    }

    async fn delete(&self, id: ProjectId) -> Result<(), RepositoryError> {
        self.projects
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(format!("project {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::project::{ProjectDraft, ProjectStatus, UserId};
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn sample_project(client: UserId) -> Project {
        let draft = ProjectDraft {
            title: "Logo design".to_string(),
            description: String::new(),
            requirements: vec!["vector".to_string()],
            skills: ["illustrator".to_string()].into_iter().collect(),
            budget: 200.0,
            deadline: Utc::now() + Duration::days(3),
        };
        Project::new(client, draft, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_failed_mutator_is_a_no_op() {
        let repo = InMemoryProjectRepository::new();
        let project = sample_project(UserId::new());
        let id = project.id;
        repo.create(&project).await.unwrap();

        let err = repo
            .atomic_update(
                id,
                Box::new(|p| {
                    p.title = "should never persist".to_string();
                    Err(LifecycleError::InvalidState("boom".into()))
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidState(_)));

        let stored = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Logo design");
    }

    #[tokio::test]
    async fn test_atomic_update_missing_project_is_not_found() {
        let repo = InMemoryProjectRepository::new();
        let err = repo
            .atomic_update(ProjectId::new(), Box::new(|_| Ok(Vec::new())))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_serialize_per_id() {
        let repo = Arc::new(InMemoryProjectRepository::new());
        let project = sample_project(UserId::new());
        let id = project.id;
        repo.create(&project).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.atomic_update(
                    id,
                    Box::new(move |p| {
                        p.submit_bid(UserId::new(), 100.0, String::new(), Utc::now())
                    }),
                )
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.bids.len(), 16);
    }

    #[tokio::test]
    async fn test_find_many_filters_by_status_and_client() {
        let repo = InMemoryProjectRepository::new();
        let client = UserId::new();
        let other = UserId::new();
        repo.create(&sample_project(client)).await.unwrap();
        repo.create(&sample_project(client)).await.unwrap();
        repo.create(&sample_project(other)).await.unwrap();

        let filter = ProjectFilter {
            client_id: Some(client),
            ..Default::default()
        };
        assert_eq!(repo.find_many(&filter).await.unwrap().len(), 2);

        let filter = ProjectFilter {
            status: Some(ProjectStatus::Completed),
            ..Default::default()
        };
        assert!(repo.find_many(&filter).await.unwrap().is_empty());
    }
}
