// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::domain::graph::{LaneId, VertexId};
use crate::domain::reservation::ResourceId;
use crate::domain::robot::{RobotId, RobotStatus};

/// What happened alongside a lifecycle change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionDetail {
    Spawned {
        vertex: VertexId,
    },
    TaskAssigned {
        origin: VertexId,
        destination: VertexId,
        hops: usize,
        cost: f64,
    },
    EnteredLane {
        lane: LaneId,
        from: VertexId,
        to: VertexId,
    },
    Queued {
        resource: ResourceId,
    },
    Arrived {
        vertex: VertexId,
    },
    ChargingStarted {
        vertex: VertexId,
        battery: f64,
    },
    Charged {
        battery: f64,
    },
    Cancelled {
        vertex: VertexId,
    },
}

/// One robot lifecycle notification for logging and UI consumers.
///
/// `old_status` is `None` only for the spawn event. Task assignment is
/// announced with `old_status == new_status` right before the transition it
/// causes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotLifecycleEvent {
    pub tick: u64,
    pub robot_id: RobotId,
    pub old_status: Option<RobotStatus>,
    pub new_status: RobotStatus,
    pub extra: TransitionDetail,
    pub emitted_at: DateTime<Utc>,
}

impl RobotLifecycleEvent {
    pub fn new(
        tick: u64,
        robot_id: RobotId,
        old_status: Option<RobotStatus>,
        new_status: RobotStatus,
        extra: TransitionDetail,
    ) -> Self {
        Self {
            tick,
            robot_id,
            old_status,
            new_status,
            extra,
            emitted_at: Utc::now(),
        }
    }

    pub fn is_status_change(&self) -> bool {
        self.old_status != Some(self.new_status)
    }
}

/// Fleet-wide counts published once per tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickSummary {
    pub tick: u64,
    pub idle: usize,
    pub moving: usize,
    pub waiting: usize,
    pub charging: usize,
    pub complete: usize,
}

impl TickSummary {
    pub fn record(&mut self, status: RobotStatus) {
        match status {
            RobotStatus::Idle => self.idle += 1,
            RobotStatus::Moving => self.moving += 1,
            RobotStatus::Waiting => self.waiting += 1,
            RobotStatus::Charging => self.charging += 1,
            RobotStatus::Complete => self.complete += 1,
        }
    }
}

/// Append-only notification channel injected into the coordinator.
///
/// Implementations must not block; the coordinator never looks at how an
/// event was consumed.
pub trait FleetEventSink: Send + Sync {
    fn emit(&self, event: RobotLifecycleEvent);

    fn tick_completed(&self, _summary: &TickSummary) {}
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl FleetEventSink for NullEventSink {
    fn emit(&self, _event: RobotLifecycleEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_tagged_detail() {
        let event = RobotLifecycleEvent::new(
            7,
            RobotId(2),
            Some(RobotStatus::Moving),
            RobotStatus::Waiting,
            TransitionDetail::Queued {
                resource: ResourceId::Lane(LaneId(3)),
            },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["tick"], 7);
        assert_eq!(json["robot_id"], 2);
        assert_eq!(json["old_status"], "moving");
        assert_eq!(json["new_status"], "waiting");
        assert_eq!(json["extra"]["kind"], "queued");
        assert_eq!(json["extra"]["resource"]["kind"], "lane");
        assert_eq!(json["extra"]["resource"]["id"], 3);
        assert!(event.is_status_change());
    }

    #[test]
    fn test_summary_counts_statuses() {
        let mut summary = TickSummary::default();
        for status in [RobotStatus::Moving, RobotStatus::Moving, RobotStatus::Charging] {
            summary.record(status);
        }
        assert_eq!((summary.moving, summary.charging, summary.idle), (2, 1, 0));
    }
}
