// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Navigation graph files
//!
//! Two layouts are accepted:
//!
//! - **Native**: `vertices` / `lanes` lists mirroring [`GraphDefinition`], as
//!   YAML (`.yaml`/`.yml`) or JSON.
//! - **Building**: JSON with `building_name` and `levels`, each level holding
//!   `vertices: [[x, y, {name, is_charger}]]` and `lanes: [[from, to, {..}]]`.
//!   Only the first level is loaded. Vertex ids are list indices, lane weights
//!   are Euclidean lengths, and a pair of opposite directed entries becomes a
//!   single bidirectional lane.

use anyhow::{Context, Result};
use fleet_core::domain::graph::{GraphDefinition, Lane, NavGraph, Vertex, VertexId};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Weight given to lanes whose endpoints coincide
const MIN_LANE_WEIGHT: f64 = 1e-6;

#[derive(Debug, Error)]
pub enum GraphFileError {
    #[error("Building graph has no levels")]
    NoLevels,

    #[error("Vertex {index} is malformed: {reason}")]
    MalformedVertex { index: usize, reason: String },

    #[error("Lane {index} is malformed: {reason}")]
    MalformedLane { index: usize, reason: String },

    #[error("Lane {index} references vertex {vertex} but the level has {count} vertices")]
    DanglingLane { index: usize, vertex: u64, count: usize },

    #[error("Unknown vertex '{0}'")]
    UnknownVertex(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Native,
    Building,
}

#[derive(Debug)]
pub struct LoadedGraph {
    pub graph: NavGraph,
    pub format: GraphFormat,
    pub building_name: Option<String>,
    pub level_name: Option<String>,
}

#[derive(Deserialize)]
struct BuildingFile {
    #[serde(default)]
    building_name: String,
    #[serde(default)]
    levels: Map<String, Value>,
}

#[derive(Deserialize)]
struct BuildingLevel {
    #[serde(default)]
    vertices: Vec<Value>,
    #[serde(default)]
    lanes: Vec<Value>,
}

/// Read and validate a graph file, picking the layout from its extension and contents.
pub fn load_graph(path: &Path) -> Result<LoadedGraph> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read graph file {:?}", path))?;
    let yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml")
    );
    parse_graph(&content, yaml).with_context(|| format!("Failed to load graph {:?}", path))
}

pub fn parse_graph(content: &str, yaml: bool) -> Result<LoadedGraph> {
    if yaml {
        let definition: GraphDefinition =
            serde_yaml::from_str(content).context("Invalid YAML graph definition")?;
        return native(definition);
    }

    let value: Value = serde_json::from_str(content).context("Invalid JSON")?;
    if value.get("levels").is_some() {
        let file: BuildingFile =
            serde_json::from_value(value).context("Invalid building graph")?;
        building(file)
    } else {
        let definition: GraphDefinition =
            serde_json::from_value(value).context("Invalid JSON graph definition")?;
        native(definition)
    }
}

fn native(definition: GraphDefinition) -> Result<LoadedGraph> {
    let graph = NavGraph::from_definition(definition).context("Invalid navigation graph")?;
    Ok(LoadedGraph {
        graph,
        format: GraphFormat::Native,
        building_name: None,
        level_name: None,
    })
}

fn building(file: BuildingFile) -> Result<LoadedGraph> {
    let (level_name, level) = file.levels.into_iter().next().ok_or(GraphFileError::NoLevels)?;
    let level: BuildingLevel = serde_json::from_value(level)
        .with_context(|| format!("Invalid level '{}'", level_name))?;

    let vertices = level
        .vertices
        .iter()
        .enumerate()
        .map(|(index, raw)| parse_vertex(index, raw))
        .collect::<Result<Vec<_>, _>>()?;
    let lanes = merge_lanes(&vertices, &level.lanes)?;

    debug!(
        building = %file.building_name,
        level = %level_name,
        vertices = vertices.len(),
        lanes = lanes.len(),
        "Parsed building navigation graph"
    );

    let graph = NavGraph::new(vertices, lanes).context("Invalid navigation graph")?;
    Ok(LoadedGraph {
        graph,
        format: GraphFormat::Building,
        building_name: Some(file.building_name).filter(|name| !name.is_empty()),
        level_name: Some(level_name),
    })
}

fn parse_vertex(index: usize, raw: &Value) -> Result<Vertex, GraphFileError> {
    let malformed = |reason: &str| GraphFileError::MalformedVertex {
        index,
        reason: reason.to_string(),
    };
    let items = raw
        .as_array()
        .ok_or_else(|| malformed("expected [x, y, {attributes}]"))?;
    let x = items
        .first()
        .and_then(Value::as_f64)
        .ok_or_else(|| malformed("missing x coordinate"))?;
    let y = items
        .get(1)
        .and_then(Value::as_f64)
        .ok_or_else(|| malformed("missing y coordinate"))?;
    let id = u32::try_from(index).map_err(|_| malformed("too many vertices"))?;

    let mut vertex = Vertex::new(id, x, y);
    if let Some(attributes) = items.get(2).and_then(Value::as_object) {
        if attributes
            .get("is_charger")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            vertex = vertex.charger();
        }
        if let Some(name) = attributes
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
        {
            vertex = vertex.named(name);
        }
    }
    Ok(vertex)
}

fn lane_ends(index: usize, raw: &Value, count: usize) -> Result<(u32, u32), GraphFileError> {
    let items = raw.as_array().ok_or_else(|| GraphFileError::MalformedLane {
        index,
        reason: "expected [from, to, {attributes}]".to_string(),
    })?;
    let end = |position: usize| -> Result<u32, GraphFileError> {
        let vertex = items
            .get(position)
            .and_then(Value::as_u64)
            .ok_or_else(|| GraphFileError::MalformedLane {
                index,
                reason: "endpoints must be vertex indices".to_string(),
            })?;
        match u32::try_from(vertex) {
            Ok(id) if (id as usize) < count => Ok(id),
            _ => Err(GraphFileError::DanglingLane {
                index,
                vertex,
                count,
            }),
        }
    };
    Ok((end(0)?, end(1)?))
}

fn merge_lanes(vertices: &[Vertex], raw_lanes: &[Value]) -> Result<Vec<Lane>, GraphFileError> {
    let mut lanes: Vec<Lane> = Vec::new();
    // Directed (from, to) pair -> position in `lanes`
    let mut directed: HashMap<(u32, u32), usize> = HashMap::new();

    for (index, raw) in raw_lanes.iter().enumerate() {
        let (from, to) = lane_ends(index, raw, vertices.len())?;
        if from == to {
            warn!(lane = index, vertex = from, "Skipping self-loop lane");
            continue;
        }
        if directed.contains_key(&(from, to)) {
            continue;
        }
        if let Some(&slot) = directed.get(&(to, from)) {
            lanes[slot].one_way = false;
            directed.insert((from, to), slot);
            continue;
        }

        let (a, b) = (&vertices[from as usize], &vertices[to as usize]);
        let weight = (a.x - b.x).hypot(a.y - b.y).max(MIN_LANE_WEIGHT);
        let id = u32::try_from(lanes.len()).map_err(|_| GraphFileError::MalformedLane {
            index,
            reason: "too many lanes".to_string(),
        })?;
        directed.insert((from, to), lanes.len());
        lanes.push(Lane::new(id, from, to, weight).one_way());
    }
    Ok(lanes)
}

/// Resolve a user-supplied vertex reference: `3`, `V3` or a vertex name.
pub fn resolve_vertex(graph: &NavGraph, reference: &str) -> Result<VertexId, GraphFileError> {
    let trimmed = reference.trim();
    let numeric = trimmed
        .strip_prefix('V')
        .or_else(|| trimmed.strip_prefix('v'))
        .unwrap_or(trimmed);
    if let Ok(id) = numeric.parse::<u32>() {
        if graph.contains_vertex(VertexId(id)) {
            return Ok(VertexId(id));
        }
    }
    graph
        .vertices()
        .iter()
        .find(|vertex| vertex.name.as_deref() == Some(trimmed))
        .map(|vertex| vertex.id)
        .ok_or_else(|| GraphFileError::UnknownVertex(reference.to_string()))
}
