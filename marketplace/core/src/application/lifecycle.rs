// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Lifecycle Controller
//!
//! Single writer for every `Project` aggregate. Each mutating operation
//! follows the same protocol: acquire the project permit, run the
//! precondition/transition logic inside `ProjectStore::atomic_update`,
//! publish the resulting events to the project's room, release the permit.
//!
//! The permit is held across commit *and* publish so that room delivery
//! order always matches commit order. Permit acquisition is bounded by a
//! timeout; expiry surfaces as `Conflict` rather than blocking the caller
//! indefinitely.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use metrics::counter;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::domain::auth::{Identity, Role};
use crate::domain::ledger::EarningsLedger;
use crate::domain::project::{
    LifecycleError, Project, ProjectDraft, ProjectId, ProjectStatus, BidId, UserId,
};
use crate::domain::repository::{ProjectFilter, ProjectMutator, ProjectRepository};
use crate::infrastructure::rooms::RoomBroadcaster;

/// How long a caller waits for the per-project permit before the operation
/// is refused as busy.
const PERMIT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct LifecycleController {
    store: Arc<dyn ProjectRepository>,
    rooms: RoomBroadcaster,
    ledger: Arc<dyn EarningsLedger>,
    permits: DashMap<ProjectId, Arc<Mutex<()>>>,
    permit_timeout: Duration,
}

impl LifecycleController {
    pub fn new(
        store: Arc<dyn ProjectRepository>,
        rooms: RoomBroadcaster,
        ledger: Arc<dyn EarningsLedger>,
    ) -> Self {
        Self {
            store,
            rooms,
            ledger,
            permits: DashMap::new(),
            permit_timeout: PERMIT_TIMEOUT,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_permit_timeout(mut self, timeout: Duration) -> Self {
        self.permit_timeout = timeout;
        self
    }

    #[cfg(test)]
    pub(crate) fn permit_count(&self) -> usize {
        self.permits.len()
    }

    pub fn rooms(&self) -> &RoomBroadcaster {
        &self.rooms
    }

    fn require_role(identity: Identity, role: Role) -> Result<UserId, LifecycleError> {
        if identity.role != role {
            return Err(LifecycleError::Unauthorized(format!(
                "operation requires the {} role",
                match role {
                    Role::Client => "client",
                    Role::Freelancer => "freelancer",
                }
            )));
        }
        Ok(identity.user_id)
    }

    async fn acquire_permit(
        &self,
        id: ProjectId,
    ) -> Result<tokio::sync::OwnedMutexGuard<()>, LifecycleError> {
        let permit = self
            .permits
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        tokio::time::timeout(self.permit_timeout, permit.lock_owned())
            .await
            .map_err(|_| {
                counter!("marketplace_conflicts_total").increment(1);
                LifecycleError::Conflict(format!("project {id} is busy"))
            })
    }

    /// Remove the permit entry once nothing else references it. The guard
    /// returned by `acquire_permit` owns one clone of the `Arc`, so callers
    /// must drop the guard first; waiters holding their own clone keep the
    /// entry alive.
    fn prune_permit(&self, id: ProjectId) {
        self.permits
            .remove_if(&id, |_, permit| Arc::strong_count(permit) == 1);
    }

    /// Commit-and-publish as one logical step.
    async fn mutate(
        &self,
        operation: &'static str,
        id: ProjectId,
        mutator: ProjectMutator,
    ) -> Result<Project, LifecycleError> {
        let permit = self.acquire_permit(id).await?;
        let result = self.store.atomic_update(id, mutator).await.map(|(project, events)| {
            counter!("marketplace_operations_total", "operation" => operation).increment(1);
            debug!(%id, operation, events = events.len(), "transition committed");
            self.rooms.publish(id, events);
            project
        });
        drop(permit);
        self.prune_permit(id);
        result
    }

    pub async fn create_project(
        &self,
        identity: Identity,
        draft: ProjectDraft,
    ) -> Result<Project, LifecycleError> {
        let client_id = Self::require_role(identity, Role::Client)?;
        let project = Project::new(client_id, draft, Utc::now())?;
        self.store.create(&project).await?;
        counter!("marketplace_operations_total", "operation" => "create_project").increment(1);
        info!(project_id = %project.id, %client_id, "project created");
        Ok(project)
    }

    pub async fn submit_bid(
        &self,
        identity: Identity,
        project_id: ProjectId,
        amount: f64,
        message: String,
    ) -> Result<Project, LifecycleError> {
        let freelancer_id = Self::require_role(identity, Role::Freelancer)?;
        self.mutate(
            "submit_bid",
            project_id,
            Box::new(move |project| {
                project.submit_bid(freelancer_id, amount, message.clone(), Utc::now())
            }),
        )
        .await
    }

    pub async fn counter_offer(
        &self,
        identity: Identity,
        project_id: ProjectId,
        bid_id: BidId,
        amount: f64,
        message: String,
    ) -> Result<Project, LifecycleError> {
        let caller = Self::require_role(identity, Role::Client)?;
        self.mutate(
            "counter_offer",
            project_id,
            Box::new(move |project| {
                project.counter_offer(caller, bid_id, amount, message.clone(), Utc::now())
            }),
        )
        .await
    }

    pub async fn accept_bid(
        &self,
        identity: Identity,
        project_id: ProjectId,
        bid_id: BidId,
    ) -> Result<Project, LifecycleError> {
        let caller = Self::require_role(identity, Role::Client)?;
        let project = self
            .mutate(
                "accept_bid",
                project_id,
                Box::new(move |project| project.accept_bid(caller, bid_id, Utc::now())),
            )
            .await?;
        info!(
            %project_id,
            freelancer_id = ?project.freelancer_id,
            "bid accepted, project in progress"
        );
        Ok(project)
    }

    pub async fn reject_bid(
        &self,
        identity: Identity,
        project_id: ProjectId,
        bid_id: BidId,
    ) -> Result<Project, LifecycleError> {
        let caller = Self::require_role(identity, Role::Client)?;
        self.mutate(
            "reject_bid",
            project_id,
            Box::new(move |project| project.reject_bid(caller, bid_id, Utc::now())),
        )
        .await
    }

    /// Complete the project and credit the assigned freelancer once, after
    /// the transition has committed.
    pub async fn complete_project(
        &self,
        identity: Identity,
        project_id: ProjectId,
    ) -> Result<Project, LifecycleError> {
        let caller = Self::require_role(identity, Role::Freelancer)?;
        let project = self
            .mutate(
                "complete_project",
                project_id,
                Box::new(move |project| project.complete(caller, Utc::now())),
            )
            .await?;

        let amount = project
            .accepted_bid()
            .map(|b| b.amount)
            .ok_or_else(|| LifecycleError::Internal("accepted bid vanished after commit".into()))?;
        if let Err(err) = self.ledger.credit(caller, project_id, amount).await {
            // The transition is committed; a lost credit must be visible to
            // the operator even though the aggregate will not roll back.
            // Credits are idempotent per (freelancer, project), so a
            // reconciliation job may re-issue this one from the error log.
            error!(%project_id, %caller, %err, "earnings credit failed after completion");
            return Err(LifecycleError::Internal(format!(
                "project completed but earnings credit failed: {err}"
            )));
        }
        info!(%project_id, freelancer_id = %caller, amount, "project completed");
        Ok(project)
    }

    pub async fn cancel_project(
        &self,
        identity: Identity,
        project_id: ProjectId,
    ) -> Result<Project, LifecycleError> {
        let caller = Self::require_role(identity, Role::Client)?;
        self.mutate(
            "cancel_project",
            project_id,
            Box::new(move |project| project.cancel(caller, Utc::now())),
        )
        .await
    }

    pub async fn delete_project(
        &self,
        identity: Identity,
        project_id: ProjectId,
    ) -> Result<(), LifecycleError> {
        let caller = Self::require_role(identity, Role::Client)?;
        let permit = self.acquire_permit(project_id).await?;
        let result: Result<(), LifecycleError> = async {
            let project = self
                .store
                .find_by_id(project_id)
                .await?
                .ok_or_else(|| LifecycleError::NotFound(format!("project {project_id}")))?;
            project.ensure_deletable(caller)?;
            self.store.delete(project_id).await?;
            Ok(())
        }
        .await;
        drop(permit);
        self.prune_permit(project_id);
        result?;
        counter!("marketplace_operations_total", "operation" => "delete_project").increment(1);
        info!(%project_id, "project deleted");
        Ok(())
    }

    pub async fn update_status(
        &self,
        identity: Identity,
        project_id: ProjectId,
        new_status: ProjectStatus,
    ) -> Result<Project, LifecycleError> {
        let caller = Self::require_role(identity, Role::Client)?;
        self.mutate(
            "update_status",
            project_id,
            Box::new(move |project| project.force_status(caller, new_status, Utc::now())),
        )
        .await
    }

    pub async fn get_project(&self, project_id: ProjectId) -> Result<Project, LifecycleError> {
        self.store
            .find_by_id(project_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(format!("project {project_id}")))
    }

    pub async fn list_projects(
        &self,
        filter: ProjectFilter,
    ) -> Result<Vec<Project>, LifecycleError> {
        Ok(self.store.find_many(&filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::project::BidStatus;
    use crate::infrastructure::earnings::InMemoryEarningsLedger;
    use crate::infrastructure::repositories::InMemoryProjectRepository;
    use chrono::Duration as ChronoDuration;

    fn controller() -> (Arc<LifecycleController>, Arc<InMemoryEarningsLedger>) {
        let ledger = Arc::new(InMemoryEarningsLedger::new());
        let controller = LifecycleController::new(
            Arc::new(InMemoryProjectRepository::new()),
            RoomBroadcaster::new(64),
            ledger.clone(),
        );
        (Arc::new(controller), ledger)
    }

    fn draft() -> ProjectDraft {
        ProjectDraft {
            title: "API integration".to_string(),
            description: String::new(),
            requirements: vec!["REST".to_string()],
            skills: ["rust".to_string()].into_iter().collect(),
            budget: 500.0,
            deadline: Utc::now() + ChronoDuration::days(7),
        }
    }

    #[tokio::test]
    async fn test_create_requires_client_role() {
        let (controller, _) = controller();
        let err = controller
            .create_project(Identity::freelancer(UserId::new()), draft())
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_submit_bid_requires_freelancer_role() {
        let (controller, _) = controller();
        let client = Identity::client(UserId::new());
        let project = controller.create_project(client, draft()).await.unwrap();

        let err = controller
            .submit_bid(client, project.id, 100.0, String::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_accept_bid_from_another_project_is_not_found() {
        let (controller, _) = controller();
        let client = Identity::client(UserId::new());
        let freelancer = Identity::freelancer(UserId::new());

        let p1 = controller.create_project(client, draft()).await.unwrap();
        let p2 = controller.create_project(client, draft()).await.unwrap();
        let p2 = controller
            .submit_bid(freelancer, p2.id, 100.0, String::new())
            .await
            .unwrap();
        let foreign_bid = p2.bids[0].id;

        let err = controller
            .accept_bid(client, p1.id, foreign_bid)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_complete_credits_ledger_exactly_once() {
        let (controller, ledger) = controller();
        let client = Identity::client(UserId::new());
        let freelancer = Identity::freelancer(UserId::new());

        let project = controller.create_project(client, draft()).await.unwrap();
        let project = controller
            .submit_bid(freelancer, project.id, 400.0, String::new())
            .await
            .unwrap();
        let bid_id = project.bids[0].id;
        controller.accept_bid(client, project.id, bid_id).await.unwrap();

        let done = controller
            .complete_project(freelancer, project.id)
            .await
            .unwrap();
        assert_eq!(done.status, ProjectStatus::Completed);
        assert_eq!(ledger.credit_count(), 1);
        assert_eq!(
            ledger.credited(freelancer.user_id, project.id),
            Some(400.0)
        );

        // A second completion attempt must fail without another credit.
        let err = controller
            .complete_project(freelancer, project.id)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidState(_)));
        assert_eq!(ledger.credit_count(), 1);
    }

    #[tokio::test]
    async fn test_complete_by_wrong_freelancer_is_unauthorized() {
        let (controller, ledger) = controller();
        let client = Identity::client(UserId::new());
        let freelancer = Identity::freelancer(UserId::new());

        let project = controller.create_project(client, draft()).await.unwrap();
        let project = controller
            .submit_bid(freelancer, project.id, 400.0, String::new())
            .await
            .unwrap();
        controller
            .accept_bid(client, project.id, project.bids[0].id)
            .await
            .unwrap();

        let err = controller
            .complete_project(Identity::freelancer(UserId::new()), project.id)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Unauthorized(_)));
        assert_eq!(ledger.credit_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_guard_follows_status() {
        let (controller, _) = controller();
        let client = Identity::client(UserId::new());
        let freelancer = Identity::freelancer(UserId::new());

        let project = controller.create_project(client, draft()).await.unwrap();
        let project = controller
            .submit_bid(freelancer, project.id, 400.0, String::new())
            .await
            .unwrap();
        controller
            .accept_bid(client, project.id, project.bids[0].id)
            .await
            .unwrap();

        let err = controller.delete_project(client, project.id).await.unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidState(_)));

        let open = controller.create_project(client, draft()).await.unwrap();
        controller.delete_project(client, open.id).await.unwrap();
        let err = controller.get_project(open.id).await.unwrap_err();
        assert!(matches!(err, LifecycleError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_failed_operation_leaves_aggregate_untouched() {
        let (controller, _) = controller();
        let client = Identity::client(UserId::new());
        let freelancer = Identity::freelancer(UserId::new());

        let project = controller.create_project(client, draft()).await.unwrap();
        let project = controller
            .submit_bid(freelancer, project.id, 400.0, String::new())
            .await
            .unwrap();
        let before = controller.get_project(project.id).await.unwrap();

        // Invalid amount fails validation inside the mutator.
        let err = controller
            .submit_bid(freelancer, project.id, -5.0, String::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Validation(_)));

        let after = controller.get_project(project.id).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_busy_project_surfaces_conflict() {
        let controller = LifecycleController::new(
            Arc::new(InMemoryProjectRepository::new()),
            RoomBroadcaster::new(64),
            Arc::new(InMemoryEarningsLedger::new()),
        )
        .with_permit_timeout(Duration::from_millis(50));
        let client = Identity::client(UserId::new());
        let project = controller.create_project(client, draft()).await.unwrap();

        let held = controller.acquire_permit(project.id).await.unwrap();
        let err = controller
            .cancel_project(client, project.id)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Conflict(_)));

        // Releasing the permit unblocks the next caller.
        drop(held);
        let cancelled = controller.cancel_project(client, project.id).await.unwrap();
        assert_eq!(cancelled.status, ProjectStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_permit_map_is_pruned_after_operations() {
        let (controller, _) = controller();
        let client = Identity::client(UserId::new());
        let freelancer = Identity::freelancer(UserId::new());

        let project = controller.create_project(client, draft()).await.unwrap();
        controller
            .submit_bid(freelancer, project.id, 100.0, String::new())
            .await
            .unwrap();
        assert_eq!(controller.permit_count(), 0);

        // Failed operations (including unknown ids) leave no entry behind.
        let err = controller
            .cancel_project(client, ProjectId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::NotFound(_)));
        assert_eq!(controller.permit_count(), 0);

        controller.cancel_project(client, project.id).await.unwrap();
        controller.delete_project(client, project.id).await.unwrap();
        assert_eq!(controller.permit_count(), 0);
    }

    #[tokio::test]
    async fn test_cascade_marks_all_siblings_rejected() {
        let (controller, _) = controller();
        let client = Identity::client(UserId::new());
        let f1 = Identity::freelancer(UserId::new());
        let f2 = Identity::freelancer(UserId::new());
        let f3 = Identity::freelancer(UserId::new());

        let project = controller.create_project(client, draft()).await.unwrap();
        for f in [f1, f2, f3] {
            controller
                .submit_bid(f, project.id, 300.0, String::new())
                .await
                .unwrap();
        }
        let project = controller.get_project(project.id).await.unwrap();
        let winner = project.bids[1].id;

        let updated = controller.accept_bid(client, project.id, winner).await.unwrap();
        assert_eq!(updated.bids[1].status, BidStatus::Accepted);
        assert_eq!(updated.bids[0].status, BidStatus::Rejected);
        assert_eq!(updated.bids[2].status, BidStatus::Rejected);
        assert!(updated.check_invariants());
    }
}
