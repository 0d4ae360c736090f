// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Room event catalog.
//!
//! One event stream per project. Events are computed by the aggregate
//! mutators and published by the controller after the commit, in commit
//! order. Delivery is best-effort: observers that are not in the room at
//! publish time receive nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::project::{Bid, BidId, BidStatus, CounterOffer, ProjectId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProjectEvent {
    /// A freelancer submitted a bid on an open project.
    NewBid {
        project_id: ProjectId,
        bid: Bid,
        at: DateTime<Utc>,
    },
    /// The client attached a counter-offer to a bid.
    CounterOffer {
        project_id: ProjectId,
        bid_id: BidId,
        offer: CounterOffer,
        at: DateTime<Utc>,
    },
    /// A bid changed status. Accepting a bid emits one of these for the
    /// accepted bid and one for every sibling it auto-rejected.
    BidStatusUpdate {
        project_id: ProjectId,
        bid_id: BidId,
        status: BidStatus,
        at: DateTime<Utc>,
    },
    /// The assigned freelancer completed the project.
    ProjectCompleted {
        project_id: ProjectId,
        freelancer_id: UserId,
        amount: f64,
        completed_at: DateTime<Utc>,
    },
}

impl ProjectEvent {
    pub fn project_id(&self) -> ProjectId {
        match self {
            ProjectEvent::NewBid { project_id, .. }
            | ProjectEvent::CounterOffer { project_id, .. }
            | ProjectEvent::BidStatusUpdate { project_id, .. }
            | ProjectEvent::ProjectCompleted { project_id, .. } => *project_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::project::BidStatus;
    use chrono::Utc;

    #[test]
    fn test_bid_status_update_wire_format() {
        let event = ProjectEvent::BidStatusUpdate {
            project_id: ProjectId::new(),
            bid_id: BidId::new(),
            status: BidStatus::Rejected,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "bidStatusUpdate");
        assert_eq!(json["status"], "rejected");
    }

    #[test]
    fn test_project_completed_round_trips() {
        let event = ProjectEvent::ProjectCompleted {
            project_id: ProjectId::new(),
            freelancer_id: UserId::new(),
            amount: 400.0,
            completed_at: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("projectCompleted"));
        let back: ProjectEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.project_id(), event.project_id());
    }
}
