// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Lane Reservation Table
//!
//! Serializes access to lanes and vertices across the fleet. Each resource
//! has at most one holder and a FIFO queue of waiting robots. Entries are
//! created the first time a resource is claimed and dropped again once it is
//! free with nobody waiting, so an absent entry means "free".
//!
//! Queues are strictly arrival-ordered. The requester's priority is recorded
//! for inspection only: preempting a holder in favour of a higher-priority
//! waiter could evict a robot mid-lane and reintroduce circular waits.

use crate::domain::graph::{LaneId, VertexId};
use crate::domain::robot::RobotId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ResourceId {
    Lane(LaneId),
    Vertex(VertexId),
}

impl ResourceId {
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceId::Lane(_) => "lane",
            ResourceId::Vertex(_) => "vertex",
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Lane(id) => write!(f, "lane {id}"),
            ResourceId::Vertex(id) => write!(f, "vertex {id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Granted,
    Queued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueuedRequest {
    pub robot: RobotId,
    pub priority: u64,
}

#[derive(Debug, Error, PartialEq)]
pub enum ReservationError {
    #[error("Robot {robot} does not hold {resource} (held by {holder:?})")]
    NotOwner {
        resource: ResourceId,
        robot: RobotId,
        holder: Option<RobotId>,
    },
}

#[derive(Debug, Clone, Default)]
struct Reservation {
    holder: Option<RobotId>,
    queue: VecDeque<QueuedRequest>,
}

impl Reservation {
    fn is_vacant(&self) -> bool {
        self.holder.is_none() && self.queue.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReservationTable {
    entries: BTreeMap<ResourceId, Reservation>,
}

impl ReservationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `resource` for `robot`, or join the back of its wait queue.
    ///
    /// Re-requesting a resource the robot already holds returns `Granted`;
    /// re-requesting while already queued keeps the original queue position.
    pub fn request(&mut self, resource: ResourceId, robot: RobotId, priority: u64) -> RequestOutcome {
        let entry = self.entries.entry(resource).or_default();
        match entry.holder {
            None => {
                entry.holder = Some(robot);
                RequestOutcome::Granted
            }
            Some(holder) if holder == robot => RequestOutcome::Granted,
            Some(_) => {
                if !entry.queue.iter().any(|q| q.robot == robot) {
                    entry.queue.push_back(QueuedRequest { robot, priority });
                }
                RequestOutcome::Queued
            }
        }
    }

    /// Give `resource` up and hand it to the head of its queue.
    ///
    /// Returns the robot that now holds the resource, if any.
    pub fn release(&mut self, resource: ResourceId, robot: RobotId) -> Result<Option<RobotId>, ReservationError> {
        let holder = self.holder_of(resource);
        if holder != Some(robot) {
            return Err(ReservationError::NotOwner {
                resource,
                robot,
                holder,
            });
        }

        let Some(entry) = self.entries.get_mut(&resource) else {
            return Ok(None);
        };
        entry.holder = entry.queue.pop_front().map(|next| next.robot);
        let next = entry.holder;
        if entry.is_vacant() {
            self.entries.remove(&resource);
        }
        Ok(next)
    }

    /// Drop a queued request. Returns false if the robot was not queued.
    pub fn withdraw(&mut self, resource: ResourceId, robot: RobotId) -> bool {
        let Some(entry) = self.entries.get_mut(&resource) else {
            return false;
        };
        let before = entry.queue.len();
        entry.queue.retain(|q| q.robot != robot);
        let removed = entry.queue.len() != before;
        if entry.is_vacant() {
            self.entries.remove(&resource);
        }
        removed
    }

    pub fn holder_of(&self, resource: ResourceId) -> Option<RobotId> {
        self.entries.get(&resource).and_then(|entry| entry.holder)
    }

    /// Queued requests for `resource`, head first.
    pub fn waiters(&self, resource: ResourceId) -> Vec<QueuedRequest> {
        self.entries
            .get(&resource)
            .map(|entry| entry.queue.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Resources currently held by `robot`, in resource order.
    pub fn held_by(&self, robot: RobotId) -> Vec<ResourceId> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.holder == Some(robot))
            .map(|(resource, _)| *resource)
            .collect()
    }

    /// Every held resource with its holder, in resource order.
    pub fn holders(&self) -> impl Iterator<Item = (ResourceId, RobotId)> + '_ {
        self.entries
            .iter()
            .filter_map(|(resource, entry)| entry.holder.map(|robot| (*resource, robot)))
    }
}
