// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Simulation scenarios
//!
//! A scenario spawns robots and schedules their tasks by tick:
//!
//! ```yaml
//! name: head-on
//! robots:
//!   - spawn: V1
//!     destination: V3
//!   - spawn: Dock
//!     destination: 1
//!     assign_at_tick: 2
//!     tasks:
//!       - to: V3
//!         at_tick: 20
//! cancellations:
//!   - robot: 2
//!     at_tick: 6
//! ```
//!
//! Vertices are referenced by index, `V<index>` or name. Robots are numbered
//! from 1 in the order they are listed.

use crate::activity_log::{
    ActivityLog, ROBOT_SPAWNED, TASK_ASSIGNED, TASK_ASSIGNMENT_FAILED, TASK_CANCELLED,
};
use crate::graph_file::resolve_vertex;
use anyhow::{bail, Context, Result};
use fleet_core::application::{FleetCoordinator, FleetError};
use fleet_core::domain::graph::{NavGraph, VertexId};
use fleet_core::domain::robot::RobotId;
use serde::Deserialize;
use serde_json::json;
use std::collections::VecDeque;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum VertexRef {
    Index(u32),
    Name(String),
}

impl VertexRef {
    pub fn resolve(&self, graph: &NavGraph) -> Result<VertexId> {
        let reference = self.to_string();
        resolve_vertex(graph, &reference).map_err(Into::into)
    }
}

impl fmt::Display for VertexRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VertexRef::Index(index) => write!(f, "{}", index),
            VertexRef::Name(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub robots: Vec<ScenarioRobot>,
    #[serde(default)]
    pub cancellations: Vec<Cancellation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioRobot {
    pub spawn: VertexRef,
    /// First task, shorthand for a one-element `tasks` list
    #[serde(default)]
    pub destination: Option<VertexRef>,
    #[serde(default)]
    pub assign_at_tick: u64,
    /// Follow-up tasks, each issued once the robot is free again
    #[serde(default)]
    pub tasks: Vec<ScenarioTask>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioTask {
    pub to: VertexRef,
    #[serde(default)]
    pub at_tick: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cancellation {
    /// 1-based position in `robots`
    pub robot: usize,
    pub at_tick: u64,
}

impl Scenario {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {:?}", path))?;
        Self::from_yaml_str(&content).with_context(|| format!("Invalid scenario {:?}", path))
    }

    /// Parse a scenario. JSON is accepted as well since it is a YAML subset.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let scenario: Scenario = serde_yaml::from_str(content)?;
        for cancellation in &scenario.cancellations {
            if cancellation.robot == 0 || cancellation.robot > scenario.robots.len() {
                bail!(
                    "Cancellation at tick {} names robot {} but the scenario has {} robots",
                    cancellation.at_tick,
                    cancellation.robot,
                    scenario.robots.len()
                );
            }
        }
        Ok(scenario)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }
}

#[derive(Debug, Clone, Copy)]
struct PlannedTask {
    destination: VertexId,
    at_tick: u64,
}

#[derive(Debug, Clone, Copy)]
struct PlannedCancel {
    robot: RobotId,
    at_tick: u64,
}

/// A failed assignment, kept for the run summary.
#[derive(Debug)]
pub struct AssignmentFailure {
    pub robot: RobotId,
    pub destination: VertexId,
    pub tick: u64,
    pub error: FleetError,
}

/// Spawned robots plus the tasks and cancellations still to be issued.
#[derive(Debug)]
pub struct ScenarioPlan {
    robots: Vec<(RobotId, VecDeque<PlannedTask>)>,
    cancellations: Vec<PlannedCancel>,
    assigned: usize,
    failures: Vec<AssignmentFailure>,
}

impl ScenarioPlan {
    /// Resolve every vertex reference, then spawn the scenario's robots.
    ///
    /// Nothing is spawned if any reference fails to resolve.
    pub fn spawn(
        scenario: &Scenario,
        fleet: &mut FleetCoordinator,
        log: &ActivityLog,
    ) -> Result<Self> {
        let mut resolved = Vec::with_capacity(scenario.robots.len());
        for (index, robot) in scenario.robots.iter().enumerate() {
            let position = index + 1;
            let spawn = robot
                .spawn
                .resolve(fleet.graph())
                .with_context(|| format!("Robot {} has an invalid spawn vertex", position))?;

            let mut tasks = VecDeque::new();
            if let Some(destination) = &robot.destination {
                tasks.push_back(PlannedTask {
                    destination: destination
                        .resolve(fleet.graph())
                        .with_context(|| format!("Robot {} has an invalid destination", position))?,
                    at_tick: robot.assign_at_tick,
                });
            }
            for task in &robot.tasks {
                tasks.push_back(PlannedTask {
                    destination: task
                        .to
                        .resolve(fleet.graph())
                        .with_context(|| format!("Robot {} has an invalid task", position))?,
                    at_tick: task.at_tick,
                });
            }
            resolved.push((spawn, tasks));
        }
        if let Some(cancel) = scenario
            .cancellations
            .iter()
            .find(|cancel| cancel.robot == 0 || cancel.robot > resolved.len())
        {
            bail!("Cancellation names unknown robot {}", cancel.robot);
        }

        let mut robots = Vec::with_capacity(resolved.len());
        for (spawn, tasks) in resolved {
            let id = fleet.spawn_robot(spawn)?;
            log.record(
                ROBOT_SPAWNED,
                json!({
                    "robot_id": id,
                    "position": spawn,
                    "vertex_name": fleet.graph().display_name(spawn),
                }),
            );
            robots.push((id, tasks));
        }

        let cancellations = scenario
            .cancellations
            .iter()
            .filter_map(|cancel| {
                robots.get(cancel.robot - 1).map(|(robot, _)| PlannedCancel {
                    robot: *robot,
                    at_tick: cancel.at_tick,
                })
            })
            .collect();

        info!(
            scenario = scenario.display_name(),
            robots = robots.len(),
            "Scenario spawned"
        );
        Ok(Self {
            robots,
            cancellations,
            assigned: 0,
            failures: Vec::new(),
        })
    }

    /// Issue everything due at the coordinator's current tick.
    ///
    /// Returns whether tasks or cancellations remain for later ticks.
    pub fn apply(&mut self, fleet: &mut FleetCoordinator, log: &ActivityLog) -> bool {
        let now = fleet.current_tick();

        let mut index = 0;
        while index < self.cancellations.len() {
            let cancel = self.cancellations[index];
            if cancel.at_tick > now {
                index += 1;
                continue;
            }
            self.cancellations.swap_remove(index);
            match fleet.cancel_task(cancel.robot) {
                Ok(()) => log.record(
                    TASK_CANCELLED,
                    json!({ "robot_id": cancel.robot, "tick": now }),
                ),
                Err(e) => warn!(robot = %cancel.robot, error = %e, "Cancellation failed"),
            }
        }

        for (robot, tasks) in &mut self.robots {
            let Some(task) = tasks.front().copied() else {
                continue;
            };
            if task.at_tick > now {
                continue;
            }
            let from = match fleet.robot_status(*robot) {
                Ok(snapshot) if snapshot.status.accepts_tasks() => snapshot.current_vertex(),
                Ok(_) => continue,
                Err(e) => {
                    warn!(robot = %robot, error = %e, "Scenario robot disappeared");
                    tasks.clear();
                    continue;
                }
            };

            tasks.pop_front();
            match fleet.assign_task(*robot, task.destination) {
                Ok(()) => {
                    self.assigned += 1;
                    log.record(
                        TASK_ASSIGNED,
                        json!({
                            "robot_id": robot,
                            "from": from,
                            "to": task.destination,
                            "destination_name": fleet.graph().display_name(task.destination),
                        }),
                    );
                }
                Err(FleetError::RobotBusy { .. }) => tasks.push_front(task),
                Err(error) => {
                    warn!(
                        robot = %robot,
                        destination = %task.destination,
                        error = %error,
                        "Task assignment failed"
                    );
                    log.record(
                        TASK_ASSIGNMENT_FAILED,
                        json!({
                            "robot_id": robot,
                            "from": from,
                            "to": task.destination,
                            "error": error.to_string(),
                        }),
                    );
                    self.failures.push(AssignmentFailure {
                        robot: *robot,
                        destination: task.destination,
                        tick: now,
                        error,
                    });
                }
            }
        }

        self.has_pending()
    }

    pub fn has_pending(&self) -> bool {
        !self.cancellations.is_empty() || self.robots.iter().any(|(_, tasks)| !tasks.is_empty())
    }

    pub fn robot_ids(&self) -> impl Iterator<Item = RobotId> + '_ {
        self.robots.iter().map(|(id, _)| *id)
    }

    pub fn assigned(&self) -> usize {
        self.assigned
    }

    pub fn failures(&self) -> &[AssignmentFailure] {
        &self.failures
    }
}
