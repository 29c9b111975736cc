// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Navigation Graph
//!
//! Immutable model of the environment the fleet moves across:
//!
//! - [`Vertex`]: navigable location with coordinates and a charger flag.
//! - [`Lane`]: traversable connection between two vertices with a cost.
//! - [`NavGraph`]: validated, indexed graph queried by the pathfinder and
//!   the coordinator. Never mutated after construction.
//!
//! Loading graphs from files is the integrator's concern; this module only
//! accepts already-parsed [`GraphDefinition`]s.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Unique identifier of a [`Vertex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexId(pub u32);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.0)
    }
}

/// Unique identifier of a [`Lane`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaneId(pub u32);

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    pub x: f64,
    pub y: f64,

    /// Robots below the low-battery threshold recharge when they stop here
    #[serde(default)]
    pub is_charger: bool,

    /// Optional human-readable label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Vertex {
    pub fn new(id: u32, x: f64, y: f64) -> Self {
        Self {
            id: VertexId(id),
            x,
            y,
            is_charger: false,
            name: None,
        }
    }

    pub fn charger(mut self) -> Self {
        self.is_charger = true;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Label for logs and summaries, `V{id}` when unnamed.
    pub fn display_name(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.id.to_string(),
        }
    }
}

/// A traversable connection between two vertices.
///
/// A lane is a single reservable resource regardless of the direction it is
/// travelled in. `one_way` lanes only appear in the adjacency of `from`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    pub id: LaneId,
    pub from: VertexId,
    pub to: VertexId,

    /// Traversal cost used as the Dijkstra edge weight
    pub weight: f64,

    #[serde(default)]
    pub one_way: bool,
}

impl Lane {
    pub fn new(id: u32, from: u32, to: u32, weight: f64) -> Self {
        Self {
            id: LaneId(id),
            from: VertexId(from),
            to: VertexId(to),
            weight,
            one_way: false,
        }
    }

    pub fn one_way(mut self) -> Self {
        self.one_way = true;
        self
    }

    /// The endpoint opposite to `vertex`, if `vertex` is an endpoint at all.
    pub fn other_end(&self, vertex: VertexId) -> Option<VertexId> {
        if vertex == self.from {
            Some(self.to)
        } else if vertex == self.to {
            Some(self.from)
        } else {
            None
        }
    }
}

/// Already-parsed graph input: the shape external loaders produce.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDefinition {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
    #[serde(default)]
    pub lanes: Vec<Lane>,
}

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("Duplicate vertex id {0}")]
    DuplicateVertex(VertexId),

    #[error("Duplicate lane id {0}")]
    DuplicateLane(LaneId),

    #[error("Lane {lane} references unknown vertex {vertex}")]
    DanglingLane { lane: LaneId, vertex: VertexId },

    #[error("Lane {lane} has invalid weight {weight} (must be finite and positive)")]
    InvalidWeight { lane: LaneId, weight: f64 },
}

/// Validated navigation graph with insertion-ordered adjacency.
#[derive(Debug, Clone)]
pub struct NavGraph {
    vertices: Vec<Vertex>,
    lanes: Vec<Lane>,
    vertex_index: HashMap<VertexId, usize>,
    lane_index: HashMap<LaneId, usize>,
    // Per vertex slot: (neighbor vertex slot, lane slot), in lane insertion order
    adjacency: Vec<Vec<(usize, usize)>>,
}

impl NavGraph {
    pub fn new(vertices: Vec<Vertex>, lanes: Vec<Lane>) -> Result<Self, GraphError> {
        let mut vertex_index = HashMap::with_capacity(vertices.len());
        for (slot, vertex) in vertices.iter().enumerate() {
            if vertex_index.insert(vertex.id, slot).is_some() {
                return Err(GraphError::DuplicateVertex(vertex.id));
            }
        }

        let mut lane_index = HashMap::with_capacity(lanes.len());
        let mut adjacency = vec![Vec::new(); vertices.len()];
        for (slot, lane) in lanes.iter().enumerate() {
            if lane_index.insert(lane.id, slot).is_some() {
                return Err(GraphError::DuplicateLane(lane.id));
            }
            if !lane.weight.is_finite() || lane.weight <= 0.0 {
                return Err(GraphError::InvalidWeight {
                    lane: lane.id,
                    weight: lane.weight,
                });
            }
            let from = *vertex_index.get(&lane.from).ok_or(GraphError::DanglingLane {
                lane: lane.id,
                vertex: lane.from,
            })?;
            let to = *vertex_index.get(&lane.to).ok_or(GraphError::DanglingLane {
                lane: lane.id,
                vertex: lane.to,
            })?;

            adjacency[from].push((to, slot));
            if !lane.one_way {
                adjacency[to].push((from, slot));
            }
        }

        Ok(Self {
            vertices,
            lanes,
            vertex_index,
            lane_index,
            adjacency,
        })
    }

    pub fn from_definition(definition: GraphDefinition) -> Result<Self, GraphError> {
        Self::new(definition.vertices, definition.lanes)
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertex_index.get(&id).map(|&slot| &self.vertices[slot])
    }

    pub fn contains_vertex(&self, id: VertexId) -> bool {
        self.vertex_index.contains_key(&id)
    }

    pub fn lane(&self, id: LaneId) -> Option<&Lane> {
        self.lane_index.get(&id).map(|&slot| &self.lanes[slot])
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn is_charger(&self, id: VertexId) -> bool {
        self.vertex(id).is_some_and(|v| v.is_charger)
    }

    pub fn chargers(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.iter().filter(|v| v.is_charger)
    }

    pub fn display_name(&self, id: VertexId) -> String {
        self.vertex(id)
            .map(Vertex::display_name)
            .unwrap_or_else(|| id.to_string())
    }

    /// Vertices reachable in one hop from `id`, with the lane used, in lane
    /// insertion order. Empty for unknown vertices.
    pub fn neighbors(&self, id: VertexId) -> impl Iterator<Item = (VertexId, &Lane)> + '_ {
        let edges = self
            .vertex_index
            .get(&id)
            .map(|&slot| self.adjacency[slot].as_slice())
            .unwrap_or(&[]);
        edges
            .iter()
            .map(move |&(to, lane)| (self.vertices[to].id, &self.lanes[lane]))
    }

    /// First lane (in insertion order) that can be travelled from `a` to `b`.
    pub fn lane_between(&self, a: VertexId, b: VertexId) -> Option<&Lane> {
        self.neighbors(a).find(|(to, _)| *to == b).map(|(_, lane)| lane)
    }

    pub(crate) fn slot_of(&self, id: VertexId) -> Option<usize> {
        self.vertex_index.get(&id).copied()
    }

    pub(crate) fn vertex_at(&self, slot: usize) -> &Vertex {
        &self.vertices[slot]
    }

    pub(crate) fn lane_at(&self, slot: usize) -> &Lane {
        &self.lanes[slot]
    }

    pub(crate) fn edges_of(&self, slot: usize) -> &[(usize, usize)] {
        &self.adjacency[slot]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> NavGraph {
        NavGraph::new(
            vec![
                Vertex::new(1, 0.0, 0.0).named("dock"),
                Vertex::new(2, 1.0, 0.0),
                Vertex::new(3, 0.0, 1.0).charger(),
            ],
            vec![
                Lane::new(10, 1, 2, 1.0),
                Lane::new(11, 2, 3, 1.5),
                Lane::new(12, 3, 1, 2.0).one_way(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_neighbors_follow_lane_insertion_order() {
        let graph = triangle();
        let from_two: Vec<_> = graph.neighbors(VertexId(2)).map(|(v, l)| (v, l.id)).collect();
        assert_eq!(
            from_two,
            vec![(VertexId(1), LaneId(10)), (VertexId(3), LaneId(11))]
        );
    }

    #[test]
    fn test_one_way_lane_is_only_reachable_from_its_origin() {
        let graph = triangle();
        assert!(graph.lane_between(VertexId(3), VertexId(1)).is_some());
        assert!(graph.lane_between(VertexId(1), VertexId(3)).is_none());
    }

    #[test]
    fn test_charger_and_names() {
        let graph = triangle();
        assert!(graph.is_charger(VertexId(3)));
        assert!(!graph.is_charger(VertexId(99)));
        assert_eq!(graph.chargers().count(), 1);
        assert_eq!(graph.display_name(VertexId(1)), "dock");
        assert_eq!(graph.display_name(VertexId(2)), "V2");
    }

    #[test]
    fn test_validation_rejects_bad_input() {
        let dangling = NavGraph::new(vec![Vertex::new(1, 0.0, 0.0)], vec![Lane::new(1, 1, 7, 1.0)]);
        assert_eq!(
            dangling.unwrap_err(),
            GraphError::DanglingLane {
                lane: LaneId(1),
                vertex: VertexId(7)
            }
        );

        let duplicate = NavGraph::new(
            vec![Vertex::new(1, 0.0, 0.0), Vertex::new(1, 1.0, 1.0)],
            vec![],
        );
        assert_eq!(duplicate.unwrap_err(), GraphError::DuplicateVertex(VertexId(1)));

        let weightless = NavGraph::new(
            vec![Vertex::new(1, 0.0, 0.0), Vertex::new(2, 1.0, 1.0)],
            vec![Lane::new(1, 1, 2, 0.0)],
        );
        assert!(matches!(weightless, Err(GraphError::InvalidWeight { .. })));
    }

    #[test]
    fn test_definition_parses_from_yaml() {
        let yaml = r#"
vertices:
  - { id: 0, x: 0.0, y: 0.0 }
  - { id: 1, x: 3.0, y: 4.0, is_charger: true, name: charger-a }
lanes:
  - { id: 0, from: 0, to: 1, weight: 5.0 }
"#;
        let definition: GraphDefinition = serde_yaml::from_str(yaml).unwrap();
        let graph = NavGraph::from_definition(definition).unwrap();
        assert_eq!(graph.vertices().len(), 2);
        assert!(graph.is_charger(VertexId(1)));
        assert!(!graph.lanes()[0].one_way);
    }
}
