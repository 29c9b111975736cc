// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::graph::{LaneId, VertexId};
use serde::{Deserialize, Serialize};

/// Ordered vertex sequence computed for one task assignment.
///
/// `lanes[i]` connects `vertices[i]` to `vertices[i + 1]`, so a route always
/// has exactly one lane fewer than it has vertices. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    vertices: Vec<VertexId>,
    lanes: Vec<LaneId>,
    cost: f64,
}

impl Route {
    /// Built by the pathfinder, which only emits well-formed hop sequences.
    pub(crate) fn new(vertices: Vec<VertexId>, lanes: Vec<LaneId>, cost: f64) -> Self {
        assert!(!vertices.is_empty(), "a route has at least one vertex");
        assert_eq!(
            lanes.len() + 1,
            vertices.len(),
            "a route needs one lane per hop"
        );
        Self {
            vertices,
            lanes,
            cost,
        }
    }

    /// Route of a robot that is already at its goal.
    pub fn stationary(at: VertexId) -> Self {
        Self::new(vec![at], Vec::new(), 0.0)
    }

    pub fn origin(&self) -> VertexId {
        self.vertices[0]
    }

    pub fn destination(&self) -> VertexId {
        self.vertices[self.vertices.len() - 1]
    }

    pub fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    pub fn lanes(&self) -> &[LaneId] {
        &self.lanes
    }

    /// Total weight of the lanes along the route.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Number of vertices, origin and destination included.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn hops(&self) -> usize {
        self.lanes.len()
    }

    pub fn vertex(&self, index: usize) -> Option<VertexId> {
        self.vertices.get(index).copied()
    }

    /// Lane and target vertex of the hop leaving `vertices[index]`.
    pub fn hop_after(&self, index: usize) -> Option<(LaneId, VertexId)> {
        let lane = *self.lanes.get(index)?;
        Some((lane, self.vertices[index + 1]))
    }

    pub fn is_final_index(&self, index: usize) -> bool {
        index + 1 == self.vertices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hops_line_up_with_vertices() {
        let route = Route::new(
            vec![VertexId(1), VertexId(2), VertexId(3)],
            vec![LaneId(7), LaneId(8)],
            2.0,
        );
        assert_eq!(route.origin(), VertexId(1));
        assert_eq!(route.destination(), VertexId(3));
        assert_eq!(route.hop_after(0), Some((LaneId(7), VertexId(2))));
        assert_eq!(route.hop_after(1), Some((LaneId(8), VertexId(3))));
        assert_eq!(route.hop_after(2), None);
        assert!(route.is_final_index(2));
    }

    #[test]
    fn test_stationary_route_is_immediately_final() {
        let route = Route::stationary(VertexId(4));
        assert_eq!(route.len(), 1);
        assert_eq!(route.hops(), 0);
        assert!(route.is_final_index(0));
    }

    #[test]
    #[should_panic(expected = "one lane per hop")]
    fn test_mismatched_lanes_are_rejected() {
        Route::new(vec![VertexId(1), VertexId(2)], vec![], 0.0);
    }
}
