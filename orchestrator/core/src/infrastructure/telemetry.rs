// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Fleet metrics.
//!
//! Counters and gauges recorded by the coordinator. No recorder is installed
//! here; without one every call is a no-op.

use crate::domain::robot::RobotStatus;
use metrics::{counter, describe_counter, describe_gauge, gauge};

/// Coordination ticks executed.
pub const TICKS: &str = "fleet_ticks_total";

/// Reservation requests that had to wait in a queue.
pub const RESERVATIONS_QUEUED: &str = "fleet_reservations_queued_total";

/// Robot status changes, labelled by target status.
pub const ROBOT_TRANSITIONS: &str = "fleet_robot_transitions_total";

/// Successful task assignments.
pub const TASKS_ASSIGNED: &str = "fleet_tasks_assigned_total";

/// Robots known to the coordinator.
pub const ROBOTS: &str = "fleet_robots";

/// Registers metric descriptions.
///
/// Call once at startup after installing a recorder.
pub fn register_metrics() {
    describe_counter!(TICKS, "Total coordination ticks executed");
    describe_counter!(RESERVATIONS_QUEUED, "Total reservation requests queued behind another robot");
    describe_counter!(ROBOT_TRANSITIONS, "Total robot status changes");
    describe_counter!(TASKS_ASSIGNED, "Total tasks assigned to robots");
    describe_gauge!(ROBOTS, "Robots known to the coordinator");
}

pub fn record_tick() {
    counter!(TICKS).increment(1);
}

pub fn record_queued(kind: &'static str) {
    counter!(RESERVATIONS_QUEUED, "resource" => kind).increment(1);
}

pub fn record_transition(to: RobotStatus) {
    counter!(ROBOT_TRANSITIONS, "to" => to.as_str()).increment(1);
}

pub fn record_task_assigned() {
    counter!(TASKS_ASSIGNED).increment(1);
}

pub fn record_fleet_size(robots: usize) {
    gauge!(ROBOTS).set(robots as f64);
}
