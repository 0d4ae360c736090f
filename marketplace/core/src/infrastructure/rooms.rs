// Room Broadcaster - Per-Project Event Fan-Out
//
// Maintains one tokio broadcast channel per project ("room"). Observers join
// a room to receive events published after each committed transition;
// membership is in-memory only and does not survive restart. Delivery is
// best-effort: nobody joined means the events are dropped, and there is no
// retry or durable queue.

use dashmap::DashMap;
use metrics::counter;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::events::ProjectEvent;
use crate::domain::project::ProjectId;

#[derive(Clone)]
pub struct RoomBroadcaster {
    rooms: Arc<DashMap<ProjectId, broadcast::Sender<ProjectEvent>>>,
    capacity: usize,
}

impl RoomBroadcaster {
    /// Capacity bounds how many undelivered events a slow observer may lag
    /// behind before older ones are dropped.
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            capacity,
        }
    }

    /// Join a project's room. The subscription receives every event
    /// published to the room until it is dropped (or `leave` is called).
    pub fn join(&self, project_id: ProjectId) -> RoomSubscription {
        let sender = self
            .rooms
            .entry(project_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone();
        debug!(%project_id, "observer joined room");
        RoomSubscription {
            project_id,
            receiver: sender.subscribe(),
        }
    }

    /// Publish committed events to the room, in order. Failures to deliver
    /// (no observers) are logged and ignored; the mutation has already
    /// committed.
    pub fn publish(&self, project_id: ProjectId, events: Vec<ProjectEvent>) {
        if events.is_empty() {
            return;
        }
        let Some(sender) = self.rooms.get(&project_id).map(|s| s.clone()) else {
            debug!(%project_id, dropped = events.len(), "no room for project, events dropped");
            return;
        };
        for event in events {
            match sender.send(event) {
                Ok(delivered) => {
                    counter!("marketplace_events_published_total").increment(1);
                    debug!(%project_id, delivered, "event delivered");
                }
                Err(_) => {
                    debug!(%project_id, "no observers in room, event dropped");
                }
            }
        }
        // Prune the room once the last observer has left.
        self.rooms
            .remove_if(&project_id, |_, sender| sender.receiver_count() == 0);
    }

    /// Number of observers currently joined to a room.
    pub fn observer_count(&self, project_id: ProjectId) -> usize {
        self.rooms
            .get(&project_id)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }
}

/// An observer's membership in one project's room. Dropping it leaves the
/// room.
pub struct RoomSubscription {
    project_id: ProjectId,
    receiver: broadcast::Receiver<ProjectEvent>,
}

impl RoomSubscription {
    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Receive the next event (blocks until one is published).
    pub async fn recv(&mut self) -> Result<ProjectEvent, RoomError> {
        self.receiver.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => RoomError::Closed,
            broadcast::error::RecvError::Lagged(n) => {
                warn!(project_id = %self.project_id, lagged = n, "room observer lagged, events dropped");
                RoomError::Lagged(n)
            }
        })
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&mut self) -> Result<ProjectEvent, RoomError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => RoomError::Empty,
            broadcast::error::TryRecvError::Closed => RoomError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => RoomError::Lagged(n),
        })
    }

    /// Explicitly leave the room.
    pub fn leave(self) {}
}

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room is closed")]
    Closed,

    #[error("no events available")]
    Empty,

    #[error("observer lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::project::{BidId, BidStatus};
    use chrono::Utc;

    fn status_event(project_id: ProjectId, status: BidStatus) -> ProjectEvent {
        ProjectEvent::BidStatusUpdate {
            project_id,
            bid_id: BidId::new(),
            status,
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_joined_observer_receives_events_in_publish_order() {
        let rooms = RoomBroadcaster::new(16);
        let project_id = ProjectId::new();
        let mut sub = rooms.join(project_id);

        rooms.publish(
            project_id,
            vec![
                status_event(project_id, BidStatus::Accepted),
                status_event(project_id, BidStatus::Rejected),
            ],
        );

        assert!(matches!(
            sub.recv().await.unwrap(),
            ProjectEvent::BidStatusUpdate { status: BidStatus::Accepted, .. }
        ));
        assert!(matches!(
            sub.recv().await.unwrap(),
            ProjectEvent::BidStatusUpdate { status: BidStatus::Rejected, .. }
        ));
    }

    #[tokio::test]
    async fn test_publish_without_observers_is_best_effort() {
        let rooms = RoomBroadcaster::new(16);
        let project_id = ProjectId::new();
        // No one joined, must not fail.
        rooms.publish(project_id, vec![status_event(project_id, BidStatus::Rejected)]);
        assert_eq!(rooms.observer_count(project_id), 0);
    }

    #[tokio::test]
    async fn test_observer_stops_receiving_after_leave() {
        let rooms = RoomBroadcaster::new(16);
        let project_id = ProjectId::new();
        let sub = rooms.join(project_id);
        assert_eq!(rooms.observer_count(project_id), 1);

        sub.leave();
        rooms.publish(project_id, vec![status_event(project_id, BidStatus::Rejected)]);
        assert_eq!(rooms.observer_count(project_id), 0);
    }

    #[tokio::test]
    async fn test_rooms_are_isolated_per_project() {
        let rooms = RoomBroadcaster::new(16);
        let p1 = ProjectId::new();
        let p2 = ProjectId::new();
        let mut sub1 = rooms.join(p1);
        let mut sub2 = rooms.join(p2);

        rooms.publish(p1, vec![status_event(p1, BidStatus::Accepted)]);

        let event = sub1.recv().await.unwrap();
        assert_eq!(event.project_id(), p1);
        assert!(matches!(sub2.try_recv(), Err(RoomError::Empty)));
    }

    #[tokio::test]
    async fn test_multiple_observers_all_receive() {
        let rooms = RoomBroadcaster::new(16);
        let project_id = ProjectId::new();
        let mut a = rooms.join(project_id);
        let mut b = rooms.join(project_id);
        assert_eq!(rooms.observer_count(project_id), 2);

        rooms.publish(project_id, vec![status_event(project_id, BidStatus::Accepted)]);

        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
    }
}
