// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Fleet Events
//
// Provides in-memory event streaming using tokio broadcast channels.
// Implements the coordinator's event sink so lifecycle events reach the
// activity log, summaries and any other observer.
//
// In-memory only: subscribers that fall behind lose the oldest events and
// the coordinator is never blocked by a slow consumer.

use crate::domain::events::{FleetEventSink, RobotLifecycleEvent, TickSummary};
use crate::domain::robot::RobotId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Unified fleet event type for the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    RobotLifecycle(RobotLifecycleEvent),
    Tick(TickSummary),
}

/// Event bus for publishing and subscribing to fleet events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    /// Capacity determines how many events can be buffered before dropping old ones
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    /// Publish a robot lifecycle event
    pub fn publish_robot_event(&self, event: RobotLifecycleEvent) {
        self.publish(DomainEvent::RobotLifecycle(event));
    }

    /// Publish an end-of-tick summary
    pub fn publish_tick(&self, summary: TickSummary) {
        self.publish(DomainEvent::Tick(summary));
    }

    fn publish(&self, event: DomainEvent) {
        // send() only fails when nobody is subscribed
        if self.sender.send(event).is_err() {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all fleet events
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to lifecycle events of a single robot
    pub fn subscribe_robot(&self, robot_id: RobotId) -> RobotEventReceiver {
        RobotEventReceiver {
            receiver: self.sender.subscribe(),
            robot_id,
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl FleetEventSink for EventBus {
    fn emit(&self, event: RobotLifecycleEvent) {
        self.publish_robot_event(event);
    }

    fn tick_completed(&self, summary: &TickSummary) {
        self.publish_tick(summary.clone());
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Receiver for all fleet events
pub struct EventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }

    /// Collect everything currently buffered, skipping over lag gaps
    pub fn drain(&mut self) -> Vec<DomainEvent> {
        let mut events = Vec::new();
        loop {
            match self.try_recv() {
                Ok(event) => events.push(event),
                Err(EventBusError::Lagged(_)) => continue,
                Err(EventBusError::Empty | EventBusError::Closed) => break,
            }
        }
        events
    }
}

/// Receiver for a single robot's lifecycle events (filtered)
pub struct RobotEventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
    robot_id: RobotId,
}

impl RobotEventReceiver {
    /// Receive the next lifecycle event for the robot
    /// Filters out tick summaries and events of other robots
    pub async fn recv(&mut self) -> Result<RobotLifecycleEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if let DomainEvent::RobotLifecycle(event) = event {
                if event.robot_id == self.robot_id {
                    return Ok(event);
                }
            }
        }
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

/// Errors that can occur when receiving events
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
    use crate::domain::events::TransitionDetail;
    use crate::domain::graph::VertexId;
    use crate::domain::robot::RobotStatus;

    fn spawned(robot: u64) -> RobotLifecycleEvent {
        RobotLifecycleEvent::new(
            0,
            RobotId(robot),
            None,
            RobotStatus::Idle,
            TransitionDetail::Spawned { vertex: VertexId(1) },
        )
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        event_bus.emit(spawned(1));

        match receiver.recv().await.unwrap() {
            DomainEvent::RobotLifecycle(event) => assert_eq!(event.robot_id, RobotId(1)),
            other => panic!("Wrong event type received: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_robot_event_filtering() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe_robot(RobotId(2));

        event_bus.emit(spawned(1));
        event_bus.tick_completed(&TickSummary::default());
        event_bus.emit(spawned(2));

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.robot_id, RobotId(2));
    }

    #[test]
    fn test_lagging_receiver_keeps_newest_events() {
        let event_bus = EventBus::new(2);
        let mut receiver = event_bus.subscribe();
        for robot in 1..=5 {
            event_bus.emit(spawned(robot));
        }

        let ids: Vec<RobotId> = receiver
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                DomainEvent::RobotLifecycle(event) => Some(event.robot_id),
                DomainEvent::Tick(_) => None,
            })
            .collect();
        assert_eq!(ids, vec![RobotId(4), RobotId(5)]);
    }

    #[test]
    fn test_publishing_without_subscribers_is_harmless() {
        let event_bus = EventBus::default();
        event_bus.emit(spawned(1));
        assert_eq!(event_bus.subscriber_count(), 0);
    }
}
