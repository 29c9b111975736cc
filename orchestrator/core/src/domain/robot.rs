// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Robot Aggregate
//!
//! Per-robot lifecycle modelled as a closed set of states:
//!
//! | State | Position | Leaves via |
//! |-------|----------|------------|
//! | `Idle` | vertex | task assignment, low battery at a charger |
//! | `Moving` | lane + progress | lane completion |
//! | `Waiting` | vertex | reservation granted |
//! | `Charging` | vertex | battery full, cancellation |
//! | `Complete` | vertex | new task assignment |
//!
//! Each variant carries exactly the position data that is valid in it, so a
//! robot can never report a lane while parked or a vertex while in transit.
//! The coordinator drives every change through [`Robot::transition`], which
//! checks the edge against [`RobotStatus::can_transition_to`].

use crate::domain::graph::{LaneId, VertexId};
use crate::domain::reservation::ResourceId;
use crate::domain::route::Route;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique robot identifier, assigned in spawn order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RobotId(pub u64);

impl fmt::Display for RobotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotStatus {
    Idle,
    Moving,
    Waiting,
    Charging,
    Complete,
}

impl RobotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RobotStatus::Idle => "idle",
            RobotStatus::Moving => "moving",
            RobotStatus::Waiting => "waiting",
            RobotStatus::Charging => "charging",
            RobotStatus::Complete => "complete",
        }
    }

    /// Only parked robots accept a new task.
    pub fn accepts_tasks(&self) -> bool {
        matches!(self, RobotStatus::Idle | RobotStatus::Complete)
    }

    /// Moving, Waiting and Charging robots still have work to finish.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RobotStatus::Moving | RobotStatus::Waiting | RobotStatus::Charging
        )
    }

    /// Lifecycle edges the coordinator is allowed to take.
    pub fn can_transition_to(&self, next: RobotStatus) -> bool {
        use RobotStatus::*;
        match (self, next) {
            // Any state may start charging at a charger
            (_, Charging) => true,
            // Assignment
            (Idle | Complete, Moving | Waiting | Complete) => true,
            // Route progress
            (Moving | Waiting, Moving | Waiting | Complete) => true,
            // Charged, or cancelled
            (Moving | Waiting | Charging, Idle) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RobotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RobotState {
    Idle {
        at: VertexId,
    },
    Moving {
        lane: LaneId,
        from: VertexId,
        to: VertexId,
        /// Fraction of the lane covered, in [0, 1]
        progress: f64,
    },
    /// Parked at `at` (or at its threshold, when `on` is the vertex itself)
    /// until `on` is granted.
    Waiting {
        at: VertexId,
        on: ResourceId,
    },
    Charging {
        at: VertexId,
    },
    Complete {
        at: VertexId,
    },
}

impl RobotState {
    pub fn status(&self) -> RobotStatus {
        match self {
            RobotState::Idle { .. } => RobotStatus::Idle,
            RobotState::Moving { .. } => RobotStatus::Moving,
            RobotState::Waiting { .. } => RobotStatus::Waiting,
            RobotState::Charging { .. } => RobotStatus::Charging,
            RobotState::Complete { .. } => RobotStatus::Complete,
        }
    }

    pub fn current_vertex(&self) -> Option<VertexId> {
        match self {
            RobotState::Idle { at }
            | RobotState::Waiting { at, .. }
            | RobotState::Charging { at }
            | RobotState::Complete { at } => Some(*at),
            RobotState::Moving { .. } => None,
        }
    }

    pub fn current_lane(&self) -> Option<(LaneId, f64)> {
        match self {
            RobotState::Moving { lane, progress, .. } => Some((*lane, *progress)),
            _ => None,
        }
    }

    pub fn waiting_for(&self) -> Option<ResourceId> {
        match self {
            RobotState::Waiting { on, .. } => Some(*on),
            _ => None,
        }
    }
}

/// Battery charge in percent, kept within [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    level: f64,
}

impl Battery {
    pub const FULL: f64 = 100.0;

    pub fn new(level: f64) -> Self {
        Self {
            level: level.clamp(0.0, Self::FULL),
        }
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn drain(&mut self, amount: f64) {
        self.level = (self.level - amount).max(0.0);
    }

    /// Adds charge and reports whether the battery is now full.
    pub fn charge(&mut self, amount: f64) -> bool {
        self.level = (self.level + amount).min(Self::FULL);
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.level >= Self::FULL
    }

    pub fn is_below(&self, threshold: f64) -> bool {
        self.level < threshold
    }
}

impl Default for Battery {
    fn default() -> Self {
        Self::new(Self::FULL)
    }
}

/// Status before and after a lifecycle change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: RobotStatus,
    pub to: RobotStatus,
}

#[derive(Debug, Clone)]
pub struct Robot {
    id: RobotId,
    priority: u64,
    state: RobotState,
    route: Option<Route>,
    route_index: usize,
    battery: Battery,
}

impl Robot {
    pub fn new(id: RobotId, priority: u64, at: VertexId, battery: Battery) -> Self {
        Self {
            id,
            priority,
            state: RobotState::Idle { at },
            route: None,
            route_index: 0,
            battery,
        }
    }

    pub fn id(&self) -> RobotId {
        self.id
    }

    /// Spawn order; lower values are processed first each tick.
    pub fn priority(&self) -> u64 {
        self.priority
    }

    pub fn state(&self) -> &RobotState {
        &self.state
    }

    pub fn status(&self) -> RobotStatus {
        self.state.status()
    }

    pub fn battery(&self) -> &Battery {
        &self.battery
    }

    pub fn battery_mut(&mut self) -> &mut Battery {
        &mut self.battery
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    /// Index into the route of the last vertex the robot entered.
    pub fn route_index(&self) -> usize {
        self.route_index
    }

    pub fn destination(&self) -> Option<VertexId> {
        self.route.as_ref().map(Route::destination)
    }

    /// Install a fresh route. The robot keeps its state until the
    /// coordinator takes the first transition.
    pub fn assign(&mut self, route: Route) {
        self.route = Some(route);
        self.route_index = 0;
    }

    pub fn clear_route(&mut self) {
        self.route = None;
        self.route_index = 0;
    }

    /// Lane and target vertex of the next hop, if any remain.
    pub fn next_hop(&self) -> Option<(LaneId, VertexId)> {
        self.route.as_ref()?.hop_after(self.route_index)
    }

    /// Record entry into the next route vertex.
    pub fn advance_route(&mut self) {
        if let Some(route) = &self.route {
            if !route.is_final_index(self.route_index) {
                self.route_index += 1;
            }
        }
    }

    /// Move along the current lane; returns true once the lane is covered.
    /// No-op for robots that are not in transit.
    pub fn advance_progress(&mut self, step: f64) -> bool {
        const EPSILON: f64 = 1e-9;
        match &mut self.state {
            RobotState::Moving { progress, .. } => {
                *progress = (*progress + step).min(1.0);
                if *progress + EPSILON >= 1.0 {
                    *progress = 1.0;
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    pub fn transition(&mut self, next: RobotState) -> StatusChange {
        let from = self.state.status();
        let to = next.status();
        debug_assert!(
            from == to || from.can_transition_to(to),
            "illegal robot transition {from} -> {to} for {}",
            self.id
        );
        self.state = next;
        StatusChange { from, to }
    }
}
