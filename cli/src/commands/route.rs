// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Shortest-route lookup on a graph file

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::json;
use std::path::PathBuf;

use fleet_core::application::find_route;

use crate::graph_file::{load_graph, resolve_vertex};

#[derive(Args)]
pub struct RouteArgs {
    /// Navigation graph file (native YAML/JSON or building JSON)
    #[arg(short, long, value_name = "FILE")]
    pub graph: PathBuf,

    /// Start vertex: index, V<index> or name
    #[arg(long, value_name = "VERTEX")]
    pub from: String,

    /// Goal vertex: index, V<index> or name
    #[arg(long, value_name = "VERTEX")]
    pub to: String,

    /// Print the route as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: RouteArgs) -> Result<()> {
    let loaded = load_graph(&args.graph)?;
    let graph = &loaded.graph;
    let from = resolve_vertex(graph, &args.from)?;
    let to = resolve_vertex(graph, &args.to)?;

    let route = find_route(graph, from, to)
        .with_context(|| format!("Failed to route {} -> {}", args.from, args.to))?;

    if args.json {
        let vertices: Vec<_> = route
            .vertices()
            .iter()
            .map(|&id| json!({ "id": id, "name": graph.display_name(id) }))
            .collect();
        let output = json!({
            "from": from,
            "to": to,
            "vertices": vertices,
            "lanes": route.lanes(),
            "hops": route.hops(),
            "cost": route.cost(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "Route {} → {}",
        graph.display_name(from).bold(),
        graph.display_name(to).bold()
    );
    for (index, &vertex) in route.vertices().iter().enumerate() {
        let marker = if graph.is_charger(vertex) {
            " (charger)".cyan().to_string()
        } else {
            String::new()
        };
        match route.lanes().get(index) {
            Some(lane) => println!(
                "  {:>3}. {} [{}]{}  via {}",
                index,
                graph.display_name(vertex),
                vertex,
                marker,
                lane
            ),
            None => println!(
                "  {:>3}. {} [{}]{}",
                index,
                graph.display_name(vertex),
                vertex,
                marker
            ),
        }
    }
    println!(
        "{}",
        format!("✓ {} hops, cost {:.3}", route.hops(), route.cost()).green()
    );

    Ok(())
}
