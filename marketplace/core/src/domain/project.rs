// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Project Aggregate
//!
//! The `Project` is the root aggregate of the marketplace core. It owns its
//! embedded `Bid` records; every mutation goes through the methods on this
//! type, which evaluate preconditions, apply the transition, and return the
//! events to publish after commit.
//!
//! ## Status as a finite-state machine
//!
//! ```text
//! open ──► in-progress ──► completed
//!   └──► cancelled ◄──────┘ (manual override only)
//! ```
//!
//! `completed` and `cancelled` are terminal. Bids move `pending → accepted`
//! (at most once per project) or `pending → rejected`; both are terminal.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::events::ProjectEvent;

/// Upper bound for bid and counter-offer messages.
pub const MAX_MESSAGE_LEN: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub Uuid);

impl ProjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BidId(pub Uuid);

impl BidId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BidId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProjectStatus::Open => "open",
            ProjectStatus::InProgress => "in-progress",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BidStatus {
    Pending,
    Accepted,
    Rejected,
}

impl fmt::Display for BidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BidStatus::Pending => "pending",
            BidStatus::Accepted => "accepted",
            BidStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// A client's proposed revision to a bid's terms. Tracked independently of
/// the owning bid's status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterOffer {
    pub amount: f64,
    pub message: String,
    pub status: BidStatus,
}

/// A freelancer's offer against an open project. Owned by exactly one
/// `Project`; no independent lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub id: BidId,
    pub freelancer_id: UserId,
    pub amount: f64,
    pub message: String,
    pub status: BidStatus,
    pub counter_offer: Option<CounterOffer>,
    pub created_at: DateTime<Utc>,
}

/// Creation payload for a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub requirements: Vec<String>,
    pub skills: BTreeSet<String>,
    pub budget: f64,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub skills: BTreeSet<String>,
    pub budget: f64,
    pub deadline: DateTime<Utc>,
    pub status: ProjectStatus,
    pub client_id: UserId,
    pub freelancer_id: Option<UserId>,
    /// Insertion order = submission order.
    pub bids: Vec<Bid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("internal error: {0}")]
    Internal(String),
}

fn validate_amount(amount: f64, what: &str) -> Result<(), LifecycleError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(LifecycleError::Validation(format!(
            "{what} must be a positive number"
        )));
    }
    Ok(())
}

fn validate_message(message: &str) -> Result<(), LifecycleError> {
    if message.chars().count() > MAX_MESSAGE_LEN {
        return Err(LifecycleError::Validation(format!(
            "message exceeds {MAX_MESSAGE_LEN} characters"
        )));
    }
    Ok(())
}

impl Project {
    /// Create a new project owned by `client_id`, status `open`, no bids.
    pub fn new(client_id: UserId, draft: ProjectDraft, now: DateTime<Utc>) -> Result<Self, LifecycleError> {
        if draft.title.trim().is_empty() {
            return Err(LifecycleError::Validation("title must not be empty".into()));
        }
        validate_amount(draft.budget, "budget")?;
        if draft.deadline <= now {
            return Err(LifecycleError::Validation("deadline must be in the future".into()));
        }
        if draft.requirements.is_empty() {
            return Err(LifecycleError::Validation("requirements must not be empty".into()));
        }
        if draft.skills.is_empty() {
            return Err(LifecycleError::Validation("skills must not be empty".into()));
        }

        Ok(Self {
            id: ProjectId::new(),
            title: draft.title,
            description: draft.description,
            requirements: draft.requirements,
            skills: draft.skills,
            budget: draft.budget,
            deadline: draft.deadline,
            status: ProjectStatus::Open,
            client_id,
            freelancer_id: None,
            bids: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        })
    }

    pub fn bid(&self, bid_id: BidId) -> Option<&Bid> {
        self.bids.iter().find(|b| b.id == bid_id)
    }

    fn bid_mut(&mut self, bid_id: BidId) -> Option<&mut Bid> {
        self.bids.iter_mut().find(|b| b.id == bid_id)
    }

    /// The single accepted bid, if any.
    pub fn accepted_bid(&self) -> Option<&Bid> {
        self.bids.iter().find(|b| b.status == BidStatus::Accepted)
    }

    fn ensure_owner(&self, caller: UserId) -> Result<(), LifecycleError> {
        if caller != self.client_id {
            return Err(LifecycleError::Unauthorized(
                "caller is not the owning client".into(),
            ));
        }
        Ok(())
    }

    /// Append a pending bid. Project must be open and the caller must not be
    /// the owning client.
    pub fn submit_bid(
        &mut self,
        freelancer_id: UserId,
        amount: f64,
        message: String,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProjectEvent>, LifecycleError> {
        if self.status != ProjectStatus::Open {
            return Err(LifecycleError::InvalidState(format!(
                "cannot bid on a {} project",
                self.status
            )));
        }
        if freelancer_id == self.client_id {
            return Err(LifecycleError::Unauthorized(
                "clients cannot bid on their own project".into(),
            ));
        }
        validate_amount(amount, "bid amount")?;
        validate_message(&message)?;

        let bid = Bid {
            id: BidId::new(),
            freelancer_id,
            amount,
            message,
            status: BidStatus::Pending,
            counter_offer: None,
            created_at: now,
        };
        self.bids.push(bid.clone());
        self.updated_at = now;

        Ok(vec![ProjectEvent::NewBid {
            project_id: self.id,
            bid,
            at: now,
        }])
    }

    /// Attach a pending counter-offer to a bid. Does not alter project or
    /// bid status.
    pub fn counter_offer(
        &mut self,
        caller: UserId,
        bid_id: BidId,
        amount: f64,
        message: String,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProjectEvent>, LifecycleError> {
        self.ensure_owner(caller)?;
        validate_amount(amount, "counter-offer amount")?;
        validate_message(&message)?;

        let project_id = self.id;
        let bid = self
            .bid_mut(bid_id)
            .ok_or_else(|| LifecycleError::NotFound(format!("bid {bid_id}")))?;
        let offer = CounterOffer {
            amount,
            message,
            status: BidStatus::Pending,
        };
        bid.counter_offer = Some(offer.clone());
        self.updated_at = now;

        Ok(vec![ProjectEvent::CounterOffer {
            project_id,
            bid_id,
            offer,
            at: now,
        }])
    }

    /// Accept one bid and atomically reject every sibling pending bid.
    /// Assigns the freelancer and moves the project to `in-progress`.
    pub fn accept_bid(
        &mut self,
        caller: UserId,
        bid_id: BidId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProjectEvent>, LifecycleError> {
        self.ensure_owner(caller)?;
        if self.status != ProjectStatus::Open {
            return Err(LifecycleError::InvalidState(format!(
                "cannot accept a bid on a {} project",
                self.status
            )));
        }
        let target = self
            .bid(bid_id)
            .ok_or_else(|| LifecycleError::NotFound(format!("bid {bid_id}")))?;
        if target.status != BidStatus::Pending {
            return Err(LifecycleError::InvalidState(format!(
                "bid {bid_id} is {}, not pending",
                target.status
            )));
        }
        let freelancer_id = target.freelancer_id;

        // Cascade: one bidStatusUpdate per affected bid, in submission order.
        let mut events = Vec::new();
        let project_id = self.id;
        for bid in &mut self.bids {
            let status = if bid.id == bid_id {
                BidStatus::Accepted
            } else if bid.status == BidStatus::Pending {
                BidStatus::Rejected
            } else {
                continue;
            };
            bid.status = status;
            events.push(ProjectEvent::BidStatusUpdate {
                project_id,
                bid_id: bid.id,
                status,
                at: now,
            });
        }

        self.freelancer_id = Some(freelancer_id);
        self.status = ProjectStatus::InProgress;
        self.updated_at = now;
        Ok(events)
    }

    /// Reject a single pending bid. No cascade.
    pub fn reject_bid(
        &mut self,
        caller: UserId,
        bid_id: BidId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProjectEvent>, LifecycleError> {
        self.ensure_owner(caller)?;
        if self.status != ProjectStatus::Open {
            return Err(LifecycleError::InvalidState(format!(
                "cannot reject a bid on a {} project",
                self.status
            )));
        }
        let project_id = self.id;
        let bid = self
            .bid_mut(bid_id)
            .ok_or_else(|| LifecycleError::NotFound(format!("bid {bid_id}")))?;
        if bid.status != BidStatus::Pending {
            return Err(LifecycleError::InvalidState(format!(
                "bid {bid_id} is {}, not pending",
                bid.status
            )));
        }
        bid.status = BidStatus::Rejected;
        self.updated_at = now;

        Ok(vec![ProjectEvent::BidStatusUpdate {
            project_id,
            bid_id,
            status: BidStatus::Rejected,
            at: now,
        }])
    }

    /// Complete an in-progress project. Caller must be the assigned
    /// freelancer. The ledger credit is issued by the controller after the
    /// commit, using the accepted bid's amount.
    pub fn complete(
        &mut self,
        caller: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProjectEvent>, LifecycleError> {
        if self.status != ProjectStatus::InProgress {
            return Err(LifecycleError::InvalidState(format!(
                "cannot complete a {} project",
                self.status
            )));
        }
        if self.freelancer_id != Some(caller) {
            return Err(LifecycleError::Unauthorized(
                "caller is not the assigned freelancer".into(),
            ));
        }
        let amount = self
            .accepted_bid()
            .map(|b| b.amount)
            .ok_or_else(|| LifecycleError::NotFound("accepted bid".into()))?;

        self.status = ProjectStatus::Completed;
        self.completed_at = Some(now);
        self.updated_at = now;

        Ok(vec![ProjectEvent::ProjectCompleted {
            project_id: self.id,
            freelancer_id: caller,
            amount,
            completed_at: now,
        }])
    }

    /// Cancel an open project.
    pub fn cancel(
        &mut self,
        caller: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProjectEvent>, LifecycleError> {
        self.ensure_owner(caller)?;
        if self.status != ProjectStatus::Open {
            return Err(LifecycleError::InvalidState(format!(
                "cannot cancel a {} project",
                self.status
            )));
        }
        self.status = ProjectStatus::Cancelled;
        self.updated_at = now;
        Ok(Vec::new())
    }

    /// Deletion guard: only open or cancelled projects may be removed.
    pub fn ensure_deletable(&self, caller: UserId) -> Result<(), LifecycleError> {
        self.ensure_owner(caller)?;
        match self.status {
            ProjectStatus::Open | ProjectStatus::Cancelled => Ok(()),
            other => Err(LifecycleError::InvalidState(format!(
                "cannot delete a {other} project"
            ))),
        }
    }

    /// Manual status override. Transitions that would leave the aggregate
    /// inconsistent (a freelancer assigned on a non-in-progress project, or
    /// in-progress without an accepted bid) are refused.
    pub fn force_status(
        &mut self,
        caller: UserId,
        new_status: ProjectStatus,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProjectEvent>, LifecycleError> {
        self.ensure_owner(caller)?;
        match new_status {
            ProjectStatus::Open => Err(LifecycleError::InvalidState(
                "cannot override a project back to open".into(),
            )),
            ProjectStatus::InProgress => Err(LifecycleError::InvalidState(
                "in-progress is only reachable by accepting a bid".into(),
            )),
            ProjectStatus::Cancelled => {
                if self.status != ProjectStatus::Open {
                    return Err(LifecycleError::InvalidState(format!(
                        "cannot override a {} project to cancelled",
                        self.status
                    )));
                }
                self.status = ProjectStatus::Cancelled;
                self.updated_at = now;
                Ok(Vec::new())
            }
            ProjectStatus::Completed => {
                if self.status != ProjectStatus::InProgress {
                    return Err(LifecycleError::InvalidState(format!(
                        "cannot override a {} project to completed",
                        self.status
                    )));
                }
                let freelancer_id = self.freelancer_id.ok_or_else(|| {
                    LifecycleError::NotFound("assigned freelancer".into())
                })?;
                let amount = self
                    .accepted_bid()
                    .map(|b| b.amount)
                    .ok_or_else(|| LifecycleError::NotFound("accepted bid".into()))?;
                self.status = ProjectStatus::Completed;
                self.completed_at = Some(now);
                self.updated_at = now;
                Ok(vec![ProjectEvent::ProjectCompleted {
                    project_id: self.id,
                    freelancer_id,
                    amount,
                    completed_at: now,
                }])
            }
        }
    }

    /// Aggregate consistency check used by tests and the storage layer in
    /// debug builds.
    pub fn check_invariants(&self) -> bool {
        let accepted = self
            .bids
            .iter()
            .filter(|b| b.status == BidStatus::Accepted)
            .count();
        if accepted > 1 {
            return false;
        }
        let in_progress = self.status == ProjectStatus::InProgress;
        if in_progress != self.freelancer_id.is_some() && self.status != ProjectStatus::Completed {
            return false;
        }
        if in_progress && accepted != 1 {
            return false;
        }
        if self.status == ProjectStatus::Open && accepted != 0 {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn draft() -> ProjectDraft {
        ProjectDraft {
            title: "Landing page".to_string(),
            description: "Marketing site refresh".to_string(),
            requirements: vec!["responsive".to_string(), "dark mode".to_string()],
            skills: ["css".to_string(), "figma".to_string()].into_iter().collect(),
            budget: 500.0,
            deadline: Utc::now() + Duration::days(7),
        }
    }

    fn open_project() -> (Project, UserId) {
        let client = UserId::new();
        let project = Project::new(client, draft(), Utc::now()).unwrap();
        (project, client)
    }

    #[test]
    fn test_create_project_starts_open_with_no_bids() {
        let (project, client) = open_project();
        assert_eq!(project.status, ProjectStatus::Open);
        assert_eq!(project.client_id, client);
        assert!(project.freelancer_id.is_none());
        assert!(project.bids.is_empty());
        assert!(project.completed_at.is_none());
        assert!(project.check_invariants());
    }

    #[test]
    fn test_create_project_rejects_bad_input() {
        let client = UserId::new();
        let now = Utc::now();

        let mut d = draft();
        d.budget = 0.0;
        assert!(matches!(
            Project::new(client, d, now),
            Err(LifecycleError::Validation(_))
        ));

        let mut d = draft();
        d.deadline = now - Duration::hours(1);
        assert!(matches!(
            Project::new(client, d, now),
            Err(LifecycleError::Validation(_))
        ));

        let mut d = draft();
        d.requirements.clear();
        assert!(matches!(
            Project::new(client, d, now),
            Err(LifecycleError::Validation(_))
        ));

        let mut d = draft();
        d.skills.clear();
        assert!(matches!(
            Project::new(client, d, now),
            Err(LifecycleError::Validation(_))
        ));
    }

    #[test]
    fn test_submit_bid_appends_pending_in_order() {
        let (mut project, _) = open_project();
        let f1 = UserId::new();
        let f2 = UserId::new();
        project.submit_bid(f1, 400.0, "first".into(), Utc::now()).unwrap();
        project.submit_bid(f2, 380.0, "second".into(), Utc::now()).unwrap();

        assert_eq!(project.bids.len(), 2);
        assert_eq!(project.bids[0].freelancer_id, f1);
        assert_eq!(project.bids[1].freelancer_id, f2);
        assert!(project.bids.iter().all(|b| b.status == BidStatus::Pending));
    }

    #[test]
    fn test_submit_bid_by_owner_is_unauthorized() {
        let (mut project, client) = open_project();
        let err = project
            .submit_bid(client, 100.0, String::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Unauthorized(_)));
    }

    #[test]
    fn test_submit_bid_requires_open_project() {
        let (mut project, client) = open_project();
        project.cancel(client, Utc::now()).unwrap();
        let err = project
            .submit_bid(UserId::new(), 100.0, String::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidState(_)));
    }

    #[test]
    fn test_accept_bid_cascades_rejection_onto_siblings() {
        let (mut project, client) = open_project();
        let f1 = UserId::new();
        let f2 = UserId::new();
        project.submit_bid(f1, 400.0, String::new(), Utc::now()).unwrap();
        project.submit_bid(f2, 380.0, String::new(), Utc::now()).unwrap();
        let target = project.bids[0].id;

        let events = project.accept_bid(client, target, Utc::now()).unwrap();

        assert_eq!(project.status, ProjectStatus::InProgress);
        assert_eq!(project.freelancer_id, Some(f1));
        assert_eq!(project.bids[0].status, BidStatus::Accepted);
        assert_eq!(project.bids[1].status, BidStatus::Rejected);
        assert!(project.check_invariants());

        // One bidStatusUpdate per affected bid.
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            ProjectEvent::BidStatusUpdate { status: BidStatus::Accepted, .. }
        ));
        assert!(matches!(
            events[1],
            ProjectEvent::BidStatusUpdate { status: BidStatus::Rejected, .. }
        ));
    }

    #[test]
    fn test_second_accept_fails_and_leaves_first_untouched() {
        let (mut project, client) = open_project();
        project.submit_bid(UserId::new(), 400.0, String::new(), Utc::now()).unwrap();
        project.submit_bid(UserId::new(), 380.0, String::new(), Utc::now()).unwrap();
        let first = project.bids[0].id;
        let second = project.bids[1].id;

        project.accept_bid(client, first, Utc::now()).unwrap();
        let snapshot = project.clone();

        let err = project.accept_bid(client, second, Utc::now()).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidState(_)));
        assert_eq!(project, snapshot);
    }

    #[test]
    fn test_reject_bid_has_no_cascade() {
        let (mut project, client) = open_project();
        project.submit_bid(UserId::new(), 400.0, String::new(), Utc::now()).unwrap();
        project.submit_bid(UserId::new(), 380.0, String::new(), Utc::now()).unwrap();
        let first = project.bids[0].id;

        project.reject_bid(client, first, Utc::now()).unwrap();
        assert_eq!(project.status, ProjectStatus::Open);
        assert_eq!(project.bids[0].status, BidStatus::Rejected);
        assert_eq!(project.bids[1].status, BidStatus::Pending);
    }

    #[test]
    fn test_counter_offer_leaves_statuses_alone() {
        let (mut project, client) = open_project();
        project.submit_bid(UserId::new(), 400.0, String::new(), Utc::now()).unwrap();
        let bid_id = project.bids[0].id;

        project
            .counter_offer(client, bid_id, 350.0, "can you do 350?".into(), Utc::now())
            .unwrap();

        assert_eq!(project.status, ProjectStatus::Open);
        assert_eq!(project.bids[0].status, BidStatus::Pending);
        let offer = project.bids[0].counter_offer.as_ref().unwrap();
        assert_eq!(offer.amount, 350.0);
        assert_eq!(offer.status, BidStatus::Pending);
    }

    #[test]
    fn test_counter_offer_on_missing_bid_is_not_found() {
        let (mut project, client) = open_project();
        let err = project
            .counter_offer(client, BidId::new(), 350.0, String::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, LifecycleError::NotFound(_)));
    }

    #[test]
    fn test_complete_requires_in_progress_and_assigned_freelancer() {
        let (mut project, client) = open_project();
        let freelancer = UserId::new();
        let err = project.complete(freelancer, Utc::now()).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidState(_)));

        project.submit_bid(freelancer, 400.0, String::new(), Utc::now()).unwrap();
        let bid_id = project.bids[0].id;
        project.accept_bid(client, bid_id, Utc::now()).unwrap();

        let err = project.complete(UserId::new(), Utc::now()).unwrap_err();
        assert!(matches!(err, LifecycleError::Unauthorized(_)));

        let events = project.complete(freelancer, Utc::now()).unwrap();
        assert_eq!(project.status, ProjectStatus::Completed);
        assert!(project.completed_at.is_some());
        assert!(matches!(
            events[0],
            ProjectEvent::ProjectCompleted { amount, .. } if amount == 400.0
        ));
    }

    #[test]
    fn test_cancel_only_from_open() {
        let (mut project, client) = open_project();
        let freelancer = UserId::new();
        project.submit_bid(freelancer, 400.0, String::new(), Utc::now()).unwrap();
        let bid_id = project.bids[0].id;
        project.accept_bid(client, bid_id, Utc::now()).unwrap();

        let err = project.cancel(client, Utc::now()).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidState(_)));
    }

    #[test]
    fn test_delete_guard() {
        let (mut project, client) = open_project();
        assert!(project.ensure_deletable(client).is_ok());
        assert!(project.ensure_deletable(UserId::new()).is_err());

        let freelancer = UserId::new();
        project.submit_bid(freelancer, 400.0, String::new(), Utc::now()).unwrap();
        let bid_id = project.bids[0].id;
        project.accept_bid(client, bid_id, Utc::now()).unwrap();
        assert!(matches!(
            project.ensure_deletable(client).unwrap_err(),
            LifecycleError::InvalidState(_)
        ));
    }

    #[test]
    fn test_force_status_refuses_inconsistent_overrides() {
        let (mut project, client) = open_project();
        assert!(matches!(
            project.force_status(client, ProjectStatus::InProgress, Utc::now()),
            Err(LifecycleError::InvalidState(_))
        ));
        assert!(matches!(
            project.force_status(client, ProjectStatus::Completed, Utc::now()),
            Err(LifecycleError::InvalidState(_))
        ));

        // open -> cancelled is the one legal override from open.
        project.force_status(client, ProjectStatus::Cancelled, Utc::now()).unwrap();
        assert_eq!(project.status, ProjectStatus::Cancelled);
        assert!(project.check_invariants());
    }

    #[test]
    fn test_force_status_completed_skips_nothing_but_the_ledger() {
        let (mut project, client) = open_project();
        let freelancer = UserId::new();
        project.submit_bid(freelancer, 250.0, String::new(), Utc::now()).unwrap();
        let bid_id = project.bids[0].id;
        project.accept_bid(client, bid_id, Utc::now()).unwrap();

        let events = project
            .force_status(client, ProjectStatus::Completed, Utc::now())
            .unwrap();
        assert_eq!(project.status, ProjectStatus::Completed);
        assert!(project.completed_at.is_some());
        assert!(matches!(events[0], ProjectEvent::ProjectCompleted { .. }));
    }
}
