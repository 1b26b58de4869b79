//! In-process session broadcast.
//!
//! One `tokio::sync::broadcast` channel per table session, created lazily on
//! first publish or subscribe. A session nobody is listening to is normal:
//! the event is dropped with a trace log. A closed session rejects
//! publishes until someone subscribes to it again.

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use tokio::sync::broadcast;
use vttdice_domain::SessionId;

use crate::infrastructure::ports::{BroadcastError, RollBroadcastPort, RollEvent};

const DEFAULT_CAPACITY: usize = 64;

pub struct ChannelBroadcaster {
    channels: DashMap<SessionId, broadcast::Sender<RollEvent>>,
    closed: DashSet<SessionId>,
    capacity: usize,
}

impl ChannelBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            closed: DashSet::new(),
            capacity: capacity.max(1),
        }
    }

    fn sender(&self, session_id: SessionId) -> broadcast::Sender<RollEvent> {
        self.channels
            .entry(session_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Receive every roll event published to `session_id` from now on.
    pub fn subscribe(&self, session_id: SessionId) -> broadcast::Receiver<RollEvent> {
        self.closed.remove(&session_id);
        self.sender(session_id).subscribe()
    }

    /// Forget a session's channel; current receivers see the channel close.
    pub fn close(&self, session_id: SessionId) {
        self.channels.remove(&session_id);
        self.closed.insert(session_id);
    }

    pub fn session_count(&self) -> usize {
        self.channels.len()
    }
}

impl Default for ChannelBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RollBroadcastPort for ChannelBroadcaster {
    async fn publish(&self, session_id: SessionId, event: RollEvent) -> Result<(), BroadcastError> {
        if self.closed.contains(&session_id) {
            return Err(BroadcastError::Closed(session_id.to_string()));
        }

        let roll_id = event.roll_id();
        match self.sender(session_id).send(event) {
            Ok(receivers) => {
                tracing::debug!(
                    session_id = %session_id,
                    roll_id = %roll_id,
                    receivers,
                    "Published roll event"
                );
            }
            Err(_) => {
                tracing::trace!(session_id = %session_id, "No subscribers for session");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use vttdice_domain::{EscalationGate, RollId};

    use super::*;

    #[tokio::test]
    async fn subscribers_receive_session_events() {
        let broadcaster = ChannelBroadcaster::new();
        let session = SessionId::new();
        let mut rx = broadcaster.subscribe(session);

        let roll_id = RollId::new();
        broadcaster
            .publish(session, RollEvent::EscalationDeclined { roll_id })
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.roll_id(), roll_id);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let broadcaster = ChannelBroadcaster::new();
        let session_a = SessionId::new();
        let session_b = SessionId::new();
        let mut rx_b = broadcaster.subscribe(session_b);

        broadcaster
            .publish(
                session_a,
                RollEvent::EscalationOffered {
                    roll_id: RollId::new(),
                    gate: EscalationGate {
                        final_target: 4,
                        resource_cost: 1,
                    },
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            rx_b.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_ok() {
        let broadcaster = ChannelBroadcaster::new();
        let result = broadcaster
            .publish(
                SessionId::new(),
                RollEvent::EscalationDeclined {
                    roll_id: RollId::new(),
                },
            )
            .await;

        assert!(result.is_ok());
        assert_eq!(broadcaster.session_count(), 1);
    }

    #[tokio::test]
    async fn close_ends_receivers() {
        let broadcaster = ChannelBroadcaster::new();
        let session = SessionId::new();
        let mut rx = broadcaster.subscribe(session);

        broadcaster.close(session);

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }

    #[tokio::test]
    async fn closed_session_rejects_until_resubscribed() {
        let broadcaster = ChannelBroadcaster::new();
        let session = SessionId::new();
        broadcaster.close(session);

        let err = broadcaster
            .publish(session, RollEvent::EscalationDeclined { roll_id: RollId::new() })
            .await
            .unwrap_err();
        assert!(matches!(err, BroadcastError::Closed(id) if id == session.to_string()));
        assert_eq!(broadcaster.session_count(), 0);

        let mut rx = broadcaster.subscribe(session);
        let roll_id = RollId::new();
        broadcaster
            .publish(session, RollEvent::EscalationDeclined { roll_id })
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap().roll_id(), roll_id);
    }
}
