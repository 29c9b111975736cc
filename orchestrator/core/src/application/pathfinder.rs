// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Pathfinder
//!
//! Dijkstra shortest routes over a [`NavGraph`]. Stateless: every call builds
//! its own scratch buffers and only reads the graph, so routes for different
//! robots may be computed concurrently.
//!
//! Ties are resolved in discovery order. Frontier entries with equal cost pop
//! in the order they were pushed, and a vertex keeps the first predecessor
//! that reached it at its final cost.

use crate::domain::graph::{LaneId, NavGraph, VertexId};
use crate::domain::route::Route;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PathError {
    #[error("Unknown vertex {0}")]
    UnknownVertex(VertexId),

    #[error("No path from {from} to {to}")]
    NoPath { from: VertexId, to: VertexId },
}

#[derive(Debug, Clone, Copy)]
struct Frontier {
    cost: f64,
    seq: u64,
    slot: usize,
}

// Reversed so the max-heap pops the cheapest, earliest-discovered entry first
impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

/// Shortest route from `start` to `goal`.
///
/// `start == goal` yields a single-vertex route with zero cost.
pub fn find_route(graph: &NavGraph, start: VertexId, goal: VertexId) -> Result<Route, PathError> {
    let start_slot = graph.slot_of(start).ok_or(PathError::UnknownVertex(start))?;
    let goal_slot = graph.slot_of(goal).ok_or(PathError::UnknownVertex(goal))?;
    if start_slot == goal_slot {
        return Ok(Route::stationary(start));
    }

    let count = graph.vertices().len();
    let mut dist = vec![f64::INFINITY; count];
    // Predecessor vertex slot and the lane slot used to get here
    let mut prev: Vec<Option<(usize, usize)>> = vec![None; count];
    let mut settled = vec![false; count];
    let mut heap = BinaryHeap::new();
    let mut seq = 0u64;

    dist[start_slot] = 0.0;
    heap.push(Frontier {
        cost: 0.0,
        seq,
        slot: start_slot,
    });

    while let Some(Frontier { cost, slot, .. }) = heap.pop() {
        if settled[slot] {
            continue;
        }
        settled[slot] = true;
        if slot == goal_slot {
            break;
        }

        for &(next, lane) in graph.edges_of(slot) {
            if settled[next] {
                continue;
            }
            let candidate = cost + graph.lane_at(lane).weight;
            if candidate < dist[next] {
                dist[next] = candidate;
                prev[next] = Some((slot, lane));
                seq += 1;
                heap.push(Frontier {
                    cost: candidate,
                    seq,
                    slot: next,
                });
            }
        }
    }

    if !settled[goal_slot] {
        return Err(PathError::NoPath {
            from: start,
            to: goal,
        });
    }

    let mut vertices: Vec<VertexId> = vec![goal];
    let mut lanes: Vec<LaneId> = Vec::new();
    let mut cursor = goal_slot;
    while let Some((parent, lane)) = prev[cursor] {
        lanes.push(graph.lane_at(lane).id);
        vertices.push(graph.vertex_at(parent).id);
        cursor = parent;
    }
    vertices.reverse();
    lanes.reverse();

    Ok(Route::new(vertices, lanes, dist[goal_slot]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::{Lane, Vertex};

    fn diamond() -> NavGraph {
        // 1 -> 2 -> 4 and 1 -> 3 -> 4 both cost 2; 1 -> 4 direct costs 5
        NavGraph::new(
            (1..=4).map(|id| Vertex::new(id, id as f64, 0.0)).collect(),
            vec![
                Lane::new(1, 1, 2, 1.0),
                Lane::new(2, 1, 3, 1.0),
                Lane::new(3, 2, 4, 1.0),
                Lane::new(4, 3, 4, 1.0),
                Lane::new(5, 1, 4, 5.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_equal_cost_routes_prefer_first_discovered() {
        let route = find_route(&diamond(), VertexId(1), VertexId(4)).unwrap();
        assert_eq!(route.vertices(), &[VertexId(1), VertexId(2), VertexId(4)]);
        assert_eq!(route.lanes(), &[LaneId(1), LaneId(3)]);
        assert_eq!(route.cost(), 2.0);
    }

    #[test]
    fn test_lanes_are_usable_in_both_directions() {
        let route = find_route(&diamond(), VertexId(4), VertexId(1)).unwrap();
        assert_eq!(route.vertices(), &[VertexId(4), VertexId(2), VertexId(1)]);
    }

    #[test]
    fn test_cheaper_multi_hop_beats_direct_lane() {
        let graph = NavGraph::new(
            (1..=3).map(|id| Vertex::new(id, 0.0, 0.0)).collect(),
            vec![
                Lane::new(1, 1, 3, 10.0),
                Lane::new(2, 1, 2, 2.0),
                Lane::new(3, 2, 3, 2.5),
            ],
        )
        .unwrap();
        let route = find_route(&graph, VertexId(1), VertexId(3)).unwrap();
        assert_eq!(route.hops(), 2);
        assert_eq!(route.cost(), 4.5);
    }

    #[test]
    fn test_start_equals_goal() {
        let route = find_route(&diamond(), VertexId(3), VertexId(3)).unwrap();
        assert_eq!(route.len(), 1);
        assert_eq!(route.cost(), 0.0);
    }

    #[test]
    fn test_unreachable_and_unknown_vertices() {
        let graph = NavGraph::new(
            vec![
                Vertex::new(1, 0.0, 0.0),
                Vertex::new(2, 1.0, 0.0),
                Vertex::new(3, 5.0, 5.0),
            ],
            vec![Lane::new(1, 1, 2, 1.0), Lane::new(2, 3, 1, 1.0).one_way()],
        )
        .unwrap();

        assert_eq!(
            find_route(&graph, VertexId(1), VertexId(3)),
            Err(PathError::NoPath {
                from: VertexId(1),
                to: VertexId(3)
            })
        );
        assert!(find_route(&graph, VertexId(3), VertexId(2)).is_ok());
        assert_eq!(
            find_route(&graph, VertexId(1), VertexId(42)),
            Err(PathError::UnknownVertex(VertexId(42)))
        );
    }
}
