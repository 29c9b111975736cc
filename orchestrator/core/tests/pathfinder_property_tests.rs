// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use fleet_core::application::pathfinder::{find_route, PathError};
use fleet_core::domain::graph::{Lane, NavGraph, Vertex, VertexId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_graph(rng: &mut StdRng) -> NavGraph {
    let count = rng.random_range(2..=7u32);
    let vertices = (0..count)
        .map(|id| Vertex::new(id, rng.random_range(0.0..10.0), rng.random_range(0.0..10.0)))
        .collect();

    let mut lanes = Vec::new();
    for from in 0..count {
        for to in (from + 1)..count {
            if rng.random_bool(0.4) {
                let weight = rng.random_range(1..=9) as f64;
                let mut lane = Lane::new(lanes.len() as u32, from, to, weight);
                if rng.random_bool(0.25) {
                    lane = lane.one_way();
                }
                // Occasionally flip so one-way lanes point both ways across the sample
                if rng.random_bool(0.5) {
                    std::mem::swap(&mut lane.from, &mut lane.to);
                }
                lanes.push(lane);
            }
        }
    }
    NavGraph::new(vertices, lanes).unwrap()
}

/// Cheapest cost over every simple path, by exhaustive search.
fn brute_force(graph: &NavGraph, start: VertexId, goal: VertexId) -> Option<f64> {
    fn walk(graph: &NavGraph, at: VertexId, goal: VertexId, visited: &mut Vec<VertexId>, cost: f64, best: &mut Option<f64>) {
        if at == goal {
            *best = Some(best.map_or(cost, |b: f64| b.min(cost)));
            return;
        }
        let hops: Vec<(VertexId, f64)> = graph.neighbors(at).map(|(to, lane)| (to, lane.weight)).collect();
        for (next, weight) in hops {
            if visited.contains(&next) {
                continue;
            }
            visited.push(next);
            walk(graph, next, goal, visited, cost + weight, best);
            visited.pop();
        }
    }

    let mut best = None;
    walk(graph, start, goal, &mut vec![start], 0.0, &mut best);
    best
}

#[test]
fn test_route_cost_matches_brute_force_on_random_graphs() {
    let mut rng = StdRng::seed_from_u64(2432);
    for _ in 0..200 {
        let graph = random_graph(&mut rng);
        let ids: Vec<VertexId> = graph.vertices().iter().map(|v| v.id).collect();

        for &start in &ids {
            for &goal in &ids {
                let expected = brute_force(&graph, start, goal);
                match (find_route(&graph, start, goal), expected) {
                    (Ok(route), Some(cost)) => {
                        assert!((route.cost() - cost).abs() < 1e-9, "{start}->{goal}: {} vs {cost}", route.cost());
                        assert_eq!(route.origin(), start);
                        assert_eq!(route.destination(), goal);

                        // Every hop uses a lane that is traversable in that direction
                        let mut walked = 0.0;
                        for (i, lane_id) in route.lanes().iter().enumerate() {
                            let (from, to) = (route.vertices()[i], route.vertices()[i + 1]);
                            let lane = graph
                                .neighbors(from)
                                .find(|(next, lane)| *next == to && lane.id == *lane_id)
                                .map(|(_, lane)| lane)
                                .unwrap_or_else(|| panic!("{lane_id} does not lead {from}->{to}"));
                            walked += lane.weight;
                        }
                        assert!((walked - route.cost()).abs() < 1e-9);
                    }
                    (Err(PathError::NoPath { from, to }), None) => {
                        assert_eq!((from, to), (start, goal));
                    }
                    (result, expected) => panic!("{start}->{goal}: got {result:?}, brute force says {expected:?}"),
                }
            }
        }
    }
}

#[test]
fn test_repeated_queries_return_the_same_route() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..50 {
        let graph = random_graph(&mut rng);
        let last = VertexId(graph.vertices().len() as u32 - 1);
        let first = find_route(&graph, VertexId(0), last);
        let second = find_route(&graph, VertexId(0), last);
        assert_eq!(first, second);
    }
}

#[test]
fn test_concurrent_queries_share_one_graph() {
    let mut rng = StdRng::seed_from_u64(99);
    let graph = std::sync::Arc::new(random_graph(&mut rng));
    let expected = find_route(&graph, VertexId(0), VertexId(1));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let graph = graph.clone();
            std::thread::spawn(move || find_route(&graph, VertexId(0), VertexId(1)))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
