// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use fleet_core::domain::graph::{LaneId, VertexId};
use fleet_orchestrator::graph_file::{load_graph, parse_graph, resolve_vertex, GraphFormat};
use std::io::Write;

const BUILDING: &str = r#"{
    "building_name": "Warehouse",
    "levels": {
        "ground": {
            "vertices": [
                [0.0, 0.0, {"name": "Dock", "is_charger": true}],
                [3.0, 4.0, {"name": "Aisle"}],
                [3.0, 8.0, {}]
            ],
            "lanes": [
                [0, 1, {"speed_limit": 0.0}],
                [1, 0, {}],
                [1, 2, {}],
                [2, 2, {}]
            ]
        },
        "mezzanine": {
            "vertices": [[0.0, 0.0, {}]],
            "lanes": []
        }
    }
}"#;

fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_native_yaml() {
    let file = write_temp(
        ".yaml",
        r#"
vertices:
  - { id: 0, x: 0.0, y: 0.0, name: Dock, is_charger: true }
  - { id: 1, x: 2.0, y: 0.0 }
  - { id: 2, x: 4.0, y: 0.0 }
lanes:
  - { id: 0, from: 0, to: 1, weight: 2.0 }
  - { id: 1, from: 1, to: 2, weight: 2.0, one_way: true }
"#,
    );
    let loaded = load_graph(file.path()).unwrap();

    assert_eq!(loaded.format, GraphFormat::Native);
    assert_eq!(loaded.graph.vertices().len(), 3);
    assert!(loaded.graph.is_charger(VertexId(0)));
    assert!(loaded.graph.lane(LaneId(1)).unwrap().one_way);
    assert!(loaded.building_name.is_none());
}

#[test]
fn test_load_native_json() {
    let file = write_temp(
        ".json",
        r#"{
            "vertices": [{"id": 0, "x": 0.0, "y": 0.0}, {"id": 1, "x": 1.0, "y": 1.0}],
            "lanes": [{"id": 0, "from": 0, "to": 1, "weight": 1.5}]
        }"#,
    );
    let loaded = load_graph(file.path()).unwrap();
    assert_eq!(loaded.format, GraphFormat::Native);
    assert_eq!(loaded.graph.lanes()[0].weight, 1.5);
}

#[test]
fn test_building_graph_uses_first_level_and_merges_lanes() {
    let loaded = parse_graph(BUILDING, false).unwrap();
    let graph = &loaded.graph;

    assert_eq!(loaded.format, GraphFormat::Building);
    assert_eq!(loaded.building_name.as_deref(), Some("Warehouse"));
    assert_eq!(loaded.level_name.as_deref(), Some("ground"));
    assert_eq!(graph.vertices().len(), 3);

    // 0<->1 merged, 1->2 one-way, self-loop skipped
    assert_eq!(graph.lanes().len(), 2);
    let merged = graph.lane(LaneId(0)).unwrap();
    assert!(!merged.one_way);
    assert!((merged.weight - 5.0).abs() < 1e-9);
    let one_way = graph.lane(LaneId(1)).unwrap();
    assert!(one_way.one_way);
    assert!((one_way.weight - 4.0).abs() < 1e-9);

    assert!(graph.lane_between(VertexId(1), VertexId(0)).is_some());
    assert!(graph.neighbors(VertexId(2)).next().is_none());

    assert!(graph.is_charger(VertexId(0)));
    assert_eq!(graph.display_name(VertexId(1)), "Aisle");
    assert_eq!(graph.display_name(VertexId(2)), "V2");
}

#[test]
fn test_building_lane_to_missing_vertex_is_rejected() {
    let content = r#"{
        "building_name": "B",
        "levels": {"L1": {"vertices": [[0.0, 0.0, {}]], "lanes": [[0, 4, {}]]}}
    }"#;
    let err = parse_graph(content, false).unwrap_err();
    assert!(format!("{:#}", err).contains("references vertex 4"));
}

#[test]
fn test_building_without_levels_is_rejected() {
    let err = parse_graph(r#"{"building_name": "B", "levels": {}}"#, false).unwrap_err();
    assert!(format!("{:#}", err).contains("no levels"));
}

#[test]
fn test_native_graph_with_dangling_lane_is_rejected() {
    let file = write_temp(
        ".yml",
        r#"
vertices:
  - { id: 0, x: 0.0, y: 0.0 }
lanes:
  - { id: 0, from: 0, to: 9, weight: 1.0 }
"#,
    );
    assert!(load_graph(file.path()).is_err());
}

#[test]
fn test_missing_file_reports_path() {
    let err = load_graph(std::path::Path::new("/nonexistent/graph.json")).unwrap_err();
    assert!(format!("{:#}", err).contains("/nonexistent/graph.json"));
}

#[test]
fn test_resolve_vertex_by_index_label_and_name() {
    let loaded = parse_graph(BUILDING, false).unwrap();
    let graph = &loaded.graph;

    assert_eq!(resolve_vertex(graph, "2").unwrap(), VertexId(2));
    assert_eq!(resolve_vertex(graph, "V1").unwrap(), VertexId(1));
    assert_eq!(resolve_vertex(graph, " Dock ").unwrap(), VertexId(0));
    assert!(resolve_vertex(graph, "V7").is_err());
    assert!(resolve_vertex(graph, "Loading Bay").is_err());
}
