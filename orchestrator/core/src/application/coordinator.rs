// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Fleet Coordinator
//!
//! Owns every robot and the reservation table and advances them one tick at
//! a time. All mutation happens through `&mut self`, so a tick can never
//! interleave with another tick or with a command.
//!
//! ## Reservation protocol
//!
//! 1. Vertex reservations only serialize robots in transit. A parked robot
//!    (Idle, Complete or Charging) holds nothing, and traffic may pass over
//!    its vertex and share its coordinates.
//! 2. A robot standing on a vertex mid-route holds that vertex and requests
//!    the next lane. On grant it releases the vertex and enters the lane.
//! 3. When the lane is covered the robot requests the lane's far vertex and
//!    releases the lane in the same step, granted or not. A queued robot waits
//!    at the vertex threshold holding nothing. Reaching the route end releases
//!    the vertex again.
//! 4. Queues are FIFO per resource. Robots are processed in priority (spawn)
//!    order, and a robot whose request was granted by someone else's release
//!    picks the grant up on its own next step.
//!
//! A robot holding a lane is always Moving and always finishes its lane. A
//! vertex is only held by a robot queued on a lane. Every wait therefore ends
//! at a Moving robot, so no circular wait can form.
//!
//! Charging starts only when a low robot arrives on a charger at its route
//! end. A cancelled charge stays cancelled until the next arrival.

use crate::application::pathfinder::{find_route, PathError};
use crate::domain::events::{FleetEventSink, RobotLifecycleEvent, TickSummary, TransitionDetail};
use crate::domain::fleet_config::FleetConfigSpec;
use crate::domain::graph::{GraphDefinition, GraphError, LaneId, NavGraph, VertexId};
use crate::domain::reservation::{RequestOutcome, ReservationTable, ResourceId};
use crate::domain::robot::{Battery, Robot, RobotId, RobotState, RobotStatus};
use crate::infrastructure::telemetry;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error, PartialEq)]
pub enum FleetError {
    #[error("Invalid vertex {0}")]
    InvalidVertex(VertexId),

    #[error("Unknown robot {0}")]
    UnknownRobot(RobotId),

    #[error("Robot {robot} is busy ({status})")]
    RobotBusy { robot: RobotId, status: RobotStatus },

    #[error("No path from {from} to {to}")]
    NoPath { from: VertexId, to: VertexId },

    #[error("Invalid navigation graph: {0}")]
    Graph(#[from] GraphError),
}

impl From<PathError> for FleetError {
    fn from(err: PathError) -> Self {
        match err {
            PathError::UnknownVertex(vertex) => FleetError::InvalidVertex(vertex),
            PathError::NoPath { from, to } => FleetError::NoPath { from, to },
        }
    }
}

/// Motion and battery parameters used by every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorSettings {
    pub lane_progress_per_tick: f64,
    pub initial_battery: f64,
    pub drain_per_lane: f64,
    pub charge_per_tick: f64,
    pub low_battery_threshold: f64,
}

impl From<&FleetConfigSpec> for CoordinatorSettings {
    fn from(spec: &FleetConfigSpec) -> Self {
        Self {
            lane_progress_per_tick: spec.motion.lane_progress_per_tick,
            initial_battery: spec.battery.initial_level,
            drain_per_lane: spec.battery.drain_per_lane,
            charge_per_tick: spec.battery.charge_per_tick,
            low_battery_threshold: spec.battery.low_threshold,
        }
    }
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self::from(&FleetConfigSpec::default())
    }
}

/// Read-only view of one robot for renderers and summaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RobotSnapshot {
    pub id: RobotId,
    pub priority: u64,
    pub status: RobotStatus,
    pub state: RobotState,
    /// Interpolated along the lane while Moving
    pub x: f64,
    pub y: f64,
    pub battery: f64,
    pub route: Vec<VertexId>,
    pub route_index: usize,
    pub destination: Option<VertexId>,
    pub held: Vec<ResourceId>,
    pub waiting_for: Option<ResourceId>,
}

impl RobotSnapshot {
    fn capture(graph: &NavGraph, reservations: &ReservationTable, robot: &Robot) -> Self {
        let state = robot.state().clone();
        let (x, y) = position(graph, &state);
        Self {
            id: robot.id(),
            priority: robot.priority(),
            status: state.status(),
            x,
            y,
            battery: robot.battery().level(),
            route: robot
                .route()
                .map(|route| route.vertices().to_vec())
                .unwrap_or_default(),
            route_index: robot.route_index(),
            destination: robot.destination(),
            held: reservations.held_by(robot.id()),
            waiting_for: state.waiting_for(),
            state,
        }
    }

    pub fn current_vertex(&self) -> Option<VertexId> {
        self.state.current_vertex()
    }

    pub fn current_lane(&self) -> Option<(LaneId, f64)> {
        self.state.current_lane()
    }
}

fn position(graph: &NavGraph, state: &RobotState) -> (f64, f64) {
    let coords = |id: VertexId| graph.vertex(id).map(|v| (v.x, v.y)).unwrap_or_default();
    match *state {
        RobotState::Moving {
            from, to, progress, ..
        } => {
            let (x0, y0) = coords(from);
            let (x1, y1) = coords(to);
            (x0 + (x1 - x0) * progress, y0 + (y1 - y0) * progress)
        }
        RobotState::Idle { at }
        | RobotState::Waiting { at, .. }
        | RobotState::Charging { at }
        | RobotState::Complete { at } => coords(at),
    }
}

pub struct FleetCoordinator {
    graph: Arc<NavGraph>,
    settings: CoordinatorSettings,
    reservations: ReservationTable,
    robots: BTreeMap<RobotId, Robot>,
    tick: u64,
    next_id: u64,
    sink: Arc<dyn FleetEventSink>,
}

impl FleetCoordinator {
    pub fn new(graph: Arc<NavGraph>, settings: CoordinatorSettings, sink: Arc<dyn FleetEventSink>) -> Self {
        Self {
            graph,
            settings,
            reservations: ReservationTable::new(),
            robots: BTreeMap::new(),
            tick: 0,
            next_id: 0,
            sink,
        }
    }

    /// Validate `definition` and build a coordinator over it.
    pub fn from_definition(
        definition: GraphDefinition,
        settings: CoordinatorSettings,
        sink: Arc<dyn FleetEventSink>,
    ) -> Result<Self, FleetError> {
        let graph = NavGraph::from_definition(definition)?;
        Ok(Self::new(Arc::new(graph), settings, sink))
    }

    pub fn graph(&self) -> &NavGraph {
        &self.graph
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    pub fn reservations(&self) -> &ReservationTable {
        &self.reservations
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn robot_count(&self) -> usize {
        self.robots.len()
    }

    /// Create an Idle robot at `vertex`. Parked robots hold no reservation,
    /// so several robots may be spawned onto the same vertex.
    pub fn spawn_robot(&mut self, vertex: VertexId) -> Result<RobotId, FleetError> {
        if !self.graph.contains_vertex(vertex) {
            return Err(FleetError::InvalidVertex(vertex));
        }

        self.next_id += 1;
        let id = RobotId(self.next_id);
        let battery = Battery::new(self.settings.initial_battery);
        self.robots.insert(id, Robot::new(id, self.next_id, vertex, battery));
        telemetry::record_fleet_size(self.robots.len());
        info!(robot = %id, vertex = %vertex, "Robot spawned");

        self.sink.emit(RobotLifecycleEvent::new(
            self.tick,
            id,
            None,
            RobotStatus::Idle,
            TransitionDetail::Spawned { vertex },
        ));
        Ok(id)
    }

    /// Route `robot_id` to `destination` and take the first step.
    ///
    /// Every check runs before anything is mutated, so a failed call leaves
    /// the fleet untouched.
    pub fn assign_task(&mut self, robot_id: RobotId, destination: VertexId) -> Result<(), FleetError> {
        let robot = self
            .robots
            .get(&robot_id)
            .ok_or(FleetError::UnknownRobot(robot_id))?;
        if !self.graph.contains_vertex(destination) {
            return Err(FleetError::InvalidVertex(destination));
        }
        let status = robot.status();
        let origin = match robot.state().current_vertex() {
            Some(at) if status.accepts_tasks() => at,
            _ => {
                return Err(FleetError::RobotBusy {
                    robot: robot_id,
                    status,
                })
            }
        };
        let route = find_route(&self.graph, origin, destination)?;

        info!(
            robot = %robot_id,
            origin = %origin,
            destination = %destination,
            hops = route.hops(),
            cost = route.cost(),
            "Task assigned"
        );
        telemetry::record_task_assigned();

        let (mut ctx, robots) = self.context();
        let robot = robots
            .get_mut(&robot_id)
            .ok_or(FleetError::UnknownRobot(robot_id))?;
        ctx.announce(
            robot,
            TransitionDetail::TaskAssigned {
                origin,
                destination,
                hops: route.hops(),
                cost: route.cost(),
            },
        );
        robot.assign(route);
        ctx.proceed_from(robot, origin);
        Ok(())
    }

    /// Abort the current task and return the robot to Idle.
    ///
    /// Releases every held resource and withdraws queued requests. A robot in
    /// transit goes back to the origin of its lane. Idle and Complete robots
    /// are left as they are, and a cancelled charge does not resume.
    pub fn cancel_task(&mut self, robot_id: RobotId) -> Result<(), FleetError> {
        let (mut ctx, robots) = self.context();
        let robot = robots
            .get_mut(&robot_id)
            .ok_or(FleetError::UnknownRobot(robot_id))?;
        ctx.cancel(robot);
        Ok(())
    }

    /// Advance simulated time by one unit.
    pub fn tick(&mut self) -> TickSummary {
        self.tick += 1;
        let mut summary = TickSummary {
            tick: self.tick,
            ..TickSummary::default()
        };

        let (mut ctx, robots) = self.context();
        for robot in robots.values_mut() {
            ctx.step(robot);
            summary.record(robot.status());
        }

        telemetry::record_tick();
        self.sink.tick_completed(&summary);
        summary
    }

    pub fn robot_status(&self, robot_id: RobotId) -> Result<RobotSnapshot, FleetError> {
        self.robots
            .get(&robot_id)
            .map(|robot| RobotSnapshot::capture(&self.graph, &self.reservations, robot))
            .ok_or(FleetError::UnknownRobot(robot_id))
    }

    /// Snapshots of the whole fleet in priority order.
    pub fn robots(&self) -> Vec<RobotSnapshot> {
        self.robots
            .values()
            .map(|robot| RobotSnapshot::capture(&self.graph, &self.reservations, robot))
            .collect()
    }

    /// True when no robot is Moving, Waiting or Charging.
    pub fn is_quiescent(&self) -> bool {
        self.robots.values().all(|robot| !robot.status().is_active())
    }

    fn context(&mut self) -> (TickContext<'_>, &mut BTreeMap<RobotId, Robot>) {
        (
            TickContext {
                graph: &self.graph,
                settings: &self.settings,
                reservations: &mut self.reservations,
                sink: self.sink.as_ref(),
                tick: self.tick,
            },
            &mut self.robots,
        )
    }
}

/// Borrowed coordinator state needed to move a single robot.
struct TickContext<'a> {
    graph: &'a NavGraph,
    settings: &'a CoordinatorSettings,
    reservations: &'a mut ReservationTable,
    sink: &'a dyn FleetEventSink,
    tick: u64,
}

impl TickContext<'_> {
    fn step(&mut self, robot: &mut Robot) {
        match *robot.state() {
            RobotState::Idle { .. } | RobotState::Complete { .. } => {}
            RobotState::Charging { at } => {
                if robot.battery_mut().charge(self.settings.charge_per_tick) {
                    robot.clear_route();
                    let battery = robot.battery().level();
                    self.transition(robot, RobotState::Idle { at }, TransitionDetail::Charged { battery });
                }
            }
            RobotState::Moving { lane, to, .. } => {
                if robot.advance_progress(self.settings.lane_progress_per_tick) {
                    self.finish_lane(robot, lane, to);
                }
            }
            RobotState::Waiting { at, on } => {
                // Re-requesting keeps the queue position and reports a grant made by another robot's release
                if self.reservations.request(on, robot.id(), robot.priority()) == RequestOutcome::Granted {
                    debug!(robot = %robot.id(), resource = %on, tick = self.tick, "Queued reservation granted");
                    match on {
                        ResourceId::Lane(lane) => match robot.next_hop() {
                            Some((next, to)) if next == lane => self.enter_lane(robot, lane, at, to),
                            _ => {
                                error!(robot = %robot.id(), lane = %lane, "Granted lane is not the next hop, releasing it");
                                self.release_owned(robot.id(), on);
                                self.proceed_from(robot, at);
                            }
                        },
                        ResourceId::Vertex(vertex) => self.proceed_from(robot, vertex),
                    }
                }
            }
        }
    }

    /// Robot stands on `at` at its current route index: take the next lane or finish.
    fn proceed_from(&mut self, robot: &mut Robot, at: VertexId) {
        let Some((lane, to)) = robot.next_hop() else {
            self.settle(robot, at);
            return;
        };
        let resource = ResourceId::Lane(lane);
        match self.request(robot, resource) {
            RequestOutcome::Granted => self.enter_lane(robot, lane, at, to),
            RequestOutcome::Queued => self.transition(
                robot,
                RobotState::Waiting { at, on: resource },
                TransitionDetail::Queued { resource },
            ),
        }
    }

    fn enter_lane(&mut self, robot: &mut Robot, lane: LaneId, from: VertexId, to: VertexId) {
        self.release_if_held(robot.id(), ResourceId::Vertex(from));
        self.transition(
            robot,
            RobotState::Moving {
                lane,
                from,
                to,
                progress: 0.0,
            },
            TransitionDetail::EnteredLane { lane, from, to },
        );
    }

    fn finish_lane(&mut self, robot: &mut Robot, lane: LaneId, to: VertexId) {
        robot.battery_mut().drain(self.settings.drain_per_lane);
        robot.advance_route();

        let vertex = ResourceId::Vertex(to);
        let outcome = self.request(robot, vertex);
        self.release_owned(robot.id(), ResourceId::Lane(lane));

        match outcome {
            RequestOutcome::Granted => self.proceed_from(robot, to),
            RequestOutcome::Queued => self.transition(
                robot,
                RobotState::Waiting { at: to, on: vertex },
                TransitionDetail::Queued { resource: vertex },
            ),
        }
    }

    /// Route end reached at `at`. The robot parks and gives the vertex up.
    fn settle(&mut self, robot: &mut Robot, at: VertexId) {
        self.release_if_held(robot.id(), ResourceId::Vertex(at));
        if self.needs_charge(robot, at) {
            self.start_charging(robot, at);
        } else {
            self.transition(robot, RobotState::Complete { at }, TransitionDetail::Arrived { vertex: at });
        }
    }

    fn needs_charge(&self, robot: &Robot, at: VertexId) -> bool {
        self.graph.is_charger(at) && robot.battery().is_below(self.settings.low_battery_threshold)
    }

    fn start_charging(&mut self, robot: &mut Robot, at: VertexId) {
        let battery = robot.battery().level();
        info!(robot = %robot.id(), vertex = %at, battery, "Charging started");
        self.transition(
            robot,
            RobotState::Charging { at },
            TransitionDetail::ChargingStarted { vertex: at, battery },
        );
    }

    fn cancel(&mut self, robot: &mut Robot) {
        let park = match *robot.state() {
            RobotState::Idle { .. } | RobotState::Complete { .. } => return,
            RobotState::Moving { from, .. } => from,
            RobotState::Waiting { at, .. } | RobotState::Charging { at } => at,
        };
        let id = robot.id();

        if let Some(on) = robot.state().waiting_for() {
            self.reservations.withdraw(on, id);
        }
        for resource in self.reservations.held_by(id) {
            self.release_owned(id, resource);
        }

        robot.clear_route();
        info!(robot = %id, vertex = %park, "Task cancelled");
        self.transition(robot, RobotState::Idle { at: park }, TransitionDetail::Cancelled { vertex: park });
    }

    fn request(&mut self, robot: &Robot, resource: ResourceId) -> RequestOutcome {
        let outcome = self.reservations.request(resource, robot.id(), robot.priority());
        match outcome {
            RequestOutcome::Granted => {
                debug!(robot = %robot.id(), resource = %resource, tick = self.tick, "Reservation granted");
            }
            RequestOutcome::Queued => {
                debug!(
                    robot = %robot.id(),
                    resource = %resource,
                    holder = ?self.reservations.holder_of(resource),
                    tick = self.tick,
                    "Reservation queued"
                );
                telemetry::record_queued(resource.kind());
            }
        }
        outcome
    }

    fn release_owned(&mut self, robot: RobotId, resource: ResourceId) {
        match self.reservations.release(resource, robot) {
            Ok(Some(next)) => {
                debug!(robot = %robot, resource = %resource, next = %next, "Reservation handed over");
            }
            Ok(None) => {}
            Err(err) => {
                error!(error = %err, tick = self.tick, "Reservation release rejected");
                debug_assert!(false, "{err}");
            }
        }
    }

    fn release_if_held(&mut self, robot: RobotId, resource: ResourceId) {
        if self.reservations.holder_of(resource) == Some(robot) {
            self.release_owned(robot, resource);
        }
    }

    fn transition(&mut self, robot: &mut Robot, next: RobotState, detail: TransitionDetail) {
        let change = robot.transition(next);
        if change.from != change.to {
            telemetry::record_transition(change.to);
        }
        debug!(robot = %robot.id(), from = %change.from, to = %change.to, tick = self.tick, "Robot transition");
        self.sink.emit(RobotLifecycleEvent::new(
            self.tick,
            robot.id(),
            Some(change.from),
            change.to,
            detail,
        ));
    }

    /// Event that annotates the current status without changing it.
    fn announce(&self, robot: &Robot, detail: TransitionDetail) {
        let status = robot.status();
        self.sink.emit(RobotLifecycleEvent::new(
            self.tick,
            robot.id(),
            Some(status),
            status,
            detail,
        ));
    }
}
