// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Agent Events
//
// In-memory fan-out of AgentEvents using tokio broadcast channels. Feeds
// projections (AgentDirectory), CLI output and any other observer that wants
// to follow agent activity. Events are not stored; a subscriber that falls
// more than `capacity` events behind loses the oldest ones.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::repository::AgentEventPublisher;
use crate::domain::events::AgentEvent;
use crate::domain::identity::AgentId;

pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 1000;

/// Event bus for publishing and subscribing to agent events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<AgentEvent>>,
}

impl EventBus {
    /// Capacity determines how many events can be buffered before dropping old ones
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_EVENT_BUS_CAPACITY)
    }

    /// Publish an event to all subscribers. Returns the number of receivers.
    pub fn publish_event(&self, event: AgentEvent) -> usize {
        debug!(
            event_type = event.event_type(),
            agent_id = %event.agent_id(),
            "Publishing agent event"
        );

        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
        receiver_count
    }

    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to the events of one agent only
    pub fn subscribe_agent(&self, agent_id: AgentId) -> AgentEventReceiver {
        AgentEventReceiver {
            receiver: self.sender.subscribe(),
            agent_id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[async_trait]
impl AgentEventPublisher for EventBus {
    async fn publish(&self, event: AgentEvent) -> anyhow::Result<()> {
        self.publish_event(event);
        Ok(())
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Receiver for all agent events
pub struct EventReceiver {
    receiver: broadcast::Receiver<AgentEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<AgentEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    pub fn try_recv(&mut self) -> Result<AgentEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver filtered on a single agent id
pub struct AgentEventReceiver {
    receiver: broadcast::Receiver<AgentEvent>,
    agent_id: AgentId,
}

impl AgentEventReceiver {
    pub async fn recv(&mut self) -> Result<AgentEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if event.agent_id() == self.agent_id {
                return Ok(event);
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn archived(agent_id: AgentId) -> AgentEvent {
        AgentEvent::AgentArchived {
            agent_id,
            reason: "test".to_string(),
            archived_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();
        let agent_id = AgentId::new();

        event_bus.publish(archived(agent_id)).await.unwrap();

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.agent_id(), agent_id);
        assert_eq!(received.event_type(), "agent.archived");
    }

    #[tokio::test]
    async fn test_agent_event_filtering() {
        let event_bus = EventBus::new(10);
        let agent_id = AgentId::new();
        let mut receiver = event_bus.subscribe_agent(agent_id);

        event_bus.publish_event(archived(AgentId::new()));
        event_bus.publish_event(archived(agent_id));

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.agent_id(), agent_id);
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();
        assert_eq!(event_bus.subscriber_count(), 2);

        assert_eq!(event_bus.publish_event(archived(AgentId::new())), 2);

        let _ = receiver1.recv().await.unwrap();
        let _ = receiver2.recv().await.unwrap();
    }

    #[test]
    fn test_publish_without_subscribers() {
        let event_bus = EventBus::default();
        assert_eq!(event_bus.publish_event(archived(AgentId::new())), 0);

        let mut receiver = event_bus.subscribe();
        assert!(matches!(receiver.try_recv(), Err(EventBusError::Empty)));
    }

    #[test]
    fn test_lagged_receiver() {
        let event_bus = EventBus::new(2);
        let mut receiver = event_bus.subscribe();
        for _ in 0..3 {
            event_bus.publish_event(archived(AgentId::new()));
        }
        assert!(matches!(receiver.try_recv(), Err(EventBusError::Lagged(1))));
    }
}
