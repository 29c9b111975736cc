// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Graph file commands
//!
//! Commands: inspect

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use fleet_core::domain::graph::{NavGraph, VertexId};

use crate::graph_file::{load_graph, GraphFormat, LoadedGraph};

#[derive(Subcommand)]
pub enum GraphCommand {
    /// Summarize a navigation graph file
    Inspect {
        /// Navigation graph file (native YAML/JSON or building JSON)
        #[arg(short, long, value_name = "FILE")]
        graph: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn handle_command(command: GraphCommand) -> Result<()> {
    match command {
        GraphCommand::Inspect { graph, json } => inspect(graph, json).await,
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct GraphSummary {
    pub format: &'static str,
    pub building: Option<String>,
    pub level: Option<String>,
    pub vertices: usize,
    pub lanes: usize,
    pub one_way_lanes: usize,
    pub chargers: Vec<String>,
    pub named_vertices: Vec<String>,
    /// Vertices with no lane in or out
    pub isolated: Vec<VertexId>,
}

impl GraphSummary {
    pub fn of(loaded: &LoadedGraph) -> Self {
        let graph = &loaded.graph;
        Self {
            format: match loaded.format {
                GraphFormat::Native => "native",
                GraphFormat::Building => "building",
            },
            building: loaded.building_name.clone(),
            level: loaded.level_name.clone(),
            vertices: graph.vertices().len(),
            lanes: graph.lanes().len(),
            one_way_lanes: graph.lanes().iter().filter(|lane| lane.one_way).count(),
            chargers: graph.chargers().map(|vertex| vertex.display_name()).collect(),
            named_vertices: graph
                .vertices()
                .iter()
                .filter_map(|vertex| vertex.name.clone())
                .collect(),
            isolated: isolated_vertices(graph),
        }
    }
}

fn isolated_vertices(graph: &NavGraph) -> Vec<VertexId> {
    graph
        .vertices()
        .iter()
        .map(|vertex| vertex.id)
        .filter(|&id| {
            !graph
                .lanes()
                .iter()
                .any(|lane| lane.from == id || lane.to == id)
        })
        .collect()
}

async fn inspect(path: PathBuf, json: bool) -> Result<()> {
    let loaded = load_graph(&path)?;
    let summary = GraphSummary::of(&loaded);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{} ({} format)", path.display().to_string().bold(), summary.format);
    if let Some(building) = &summary.building {
        println!("  Building: {}", building);
    }
    if let Some(level) = &summary.level {
        println!("  Level: {}", level);
    }
    println!("  Vertices: {}", summary.vertices);
    println!(
        "  Lanes: {} ({} one-way)",
        summary.lanes, summary.one_way_lanes
    );
    if summary.chargers.is_empty() {
        println!("  Chargers: {}", "(none)".dimmed());
    } else {
        println!("  Chargers: {}", summary.chargers.join(", ").cyan());
    }
    if !summary.named_vertices.is_empty() {
        println!("  Named: {}", summary.named_vertices.join(", "));
    }
    if !summary.isolated.is_empty() {
        let isolated: Vec<String> = summary.isolated.iter().map(ToString::to_string).collect();
        println!(
            "{}",
            format!("  Isolated vertices: {}", isolated.join(", ")).yellow()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_file::parse_graph;

    #[test]
    fn test_summary_counts_building_graph() {
        let content = r#"{
            "building_name": "Depot",
            "levels": {
                "L1": {
                    "vertices": [
                        [0.0, 0.0, {"name": "Dock", "is_charger": true}],
                        [3.0, 4.0, {"name": ""}],
                        [6.0, 8.0, {}],
                        [9.0, 9.0, {"name": "Spare"}]
                    ],
                    "lanes": [[0, 1, {}], [1, 0, {}], [1, 2, {}]]
                }
            }
        }"#;
        let loaded = parse_graph(content, false).unwrap();
        let summary = GraphSummary::of(&loaded);

        assert_eq!(summary.format, "building");
        assert_eq!(summary.building.as_deref(), Some("Depot"));
        assert_eq!(summary.level.as_deref(), Some("L1"));
        assert_eq!(summary.vertices, 4);
        assert_eq!(summary.lanes, 2);
        assert_eq!(summary.one_way_lanes, 1);
        assert_eq!(summary.chargers, vec!["Dock".to_string()]);
        assert_eq!(summary.named_vertices, vec!["Dock".to_string(), "Spare".to_string()]);
        assert_eq!(summary.isolated, vec![VertexId(3)]);
    }
}
