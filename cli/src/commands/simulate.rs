// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Scenario simulation
//!
//! Loads a graph and a scenario, drives the coordinator until the fleet
//! settles, writes the activity log and prints a per-robot summary.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use parking_lot::Mutex;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use fleet_core::application::{
    CoordinatorSettings, FleetCoordinator, RobotSnapshot, RunOutcome, TickDriver,
};
use fleet_core::domain::events::{RobotLifecycleEvent, TransitionDetail};
use fleet_core::domain::fleet_config::FleetConfigManifest;
use fleet_core::domain::graph::NavGraph;
use fleet_core::domain::robot::{RobotState, RobotStatus};
use fleet_core::infrastructure::{DomainEvent, EventBus, EventBusError, EventReceiver};

use crate::activity_log::{ActivityLog, SIMULATION_END, SYSTEM_START};
use crate::graph_file::load_graph;
use crate::scenario::{Scenario, ScenarioPlan};

#[derive(Args)]
pub struct SimulateArgs {
    /// Navigation graph file (native YAML/JSON or building JSON)
    #[arg(short, long, value_name = "FILE")]
    pub graph: PathBuf,

    /// Scenario file (YAML)
    #[arg(short, long, value_name = "FILE")]
    pub scenario: PathBuf,

    /// Stop after this many ticks (default: spec.simulation.max_ticks)
    #[arg(long, value_name = "N")]
    pub max_ticks: Option<u64>,

    /// Pace ticks on the configured interval and print events as they happen
    #[arg(long)]
    pub realtime: bool,

    /// Activity log destination
    #[arg(long, value_name = "FILE", default_value = "logs/fleet_logs.txt")]
    pub log_file: PathBuf,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: SimulateArgs, config_override: Option<PathBuf>) -> Result<()> {
    let config = FleetConfigManifest::load_or_default(config_override)
        .context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;
    let spec = &config.spec;

    let loaded = load_graph(&args.graph)?;
    let scenario = Scenario::from_file(&args.scenario)?;

    let bus = EventBus::new(spec.events.channel_capacity);
    let log = Arc::new(
        ActivityLog::create(&args.log_file)
            .await?
            .forward_to(bus.clone()),
    );
    log.record(
        SYSTEM_START,
        json!({
            "graph_file": args.graph.display().to_string(),
            "building": loaded.building_name,
            "level": loaded.level_name,
            "vertices": loaded.graph.vertices().len(),
            "lanes": loaded.graph.lanes().len(),
        }),
    );

    let graph = Arc::new(loaded.graph);
    let mut coordinator =
        FleetCoordinator::new(graph.clone(), CoordinatorSettings::from(spec), log.clone());
    let mut plan = ScenarioPlan::spawn(&scenario, &mut coordinator, &log)?;
    let coordinator = Arc::new(Mutex::new(coordinator));

    let max_ticks = args.max_ticks.unwrap_or(spec.simulation.max_ticks);
    let mut driver = TickDriver::new(coordinator.clone(), max_ticks);
    let mut printer = None;
    if args.realtime {
        driver = driver.realtime(Duration::from_millis(spec.simulation.tick_interval_ms));
        if !args.json {
            printer = Some(EventPrinter::spawn(bus.subscribe(), graph.clone()));
        }
    }

    info!(
        scenario = scenario.display_name(),
        robots = plan.robot_ids().count(),
        max_ticks,
        realtime = args.realtime,
        "Starting simulation"
    );
    let outcome = driver
        .run(|fleet| plan.apply(fleet, &log), shutdown_signal())
        .await;

    let robots = coordinator.lock().robots();
    log.record(
        SIMULATION_END,
        json!({
            "ticks": outcome.ticks,
            "final_tick": outcome.final_tick,
            "reason": outcome.reason.as_str(),
            "tasks_assigned": plan.assigned(),
            "tasks_failed": plan.failures().len(),
        }),
    );
    let lines = log
        .close()
        .await
        .with_context(|| format!("Failed to finalize activity log {:?}", log.path()))?;
    if let Some(printer) = printer {
        printer.stop().await;
    }

    if args.json {
        let failures: Vec<_> = plan
            .failures()
            .iter()
            .map(|failure| {
                json!({
                    "robot_id": failure.robot,
                    "to": failure.destination,
                    "tick": failure.tick,
                    "error": failure.error.to_string(),
                })
            })
            .collect();
        let output = json!({
            "scenario": scenario.display_name(),
            "ticks": outcome.ticks,
            "final_tick": outcome.final_tick,
            "reason": outcome.reason.as_str(),
            "tasks_assigned": plan.assigned(),
            "failures": failures,
            "log_file": log.path().display().to_string(),
            "log_lines": lines,
            "robots": robots,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_summary(&scenario, &outcome, &plan, &robots, &graph);
    println!(
        "Activity log: {} ({} entries)",
        log.path().display(),
        lines
    );
    Ok(())
}

/// Resolves on Ctrl-C. Never resolves if the signal handler cannot be installed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Interrupt received, stopping simulation");
}

/// Prints lifecycle events from the bus while a real-time run is in progress.
struct EventPrinter {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl EventPrinter {
    fn spawn(mut receiver: EventReceiver, graph: Arc<NavGraph>) -> Self {
        let (stop, mut stopped) = oneshot::channel();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    event = receiver.recv() => match event {
                        Ok(DomainEvent::RobotLifecycle(event)) => {
                            println!("{}", describe_event(&event, &graph));
                        }
                        Ok(DomainEvent::Tick(_)) | Err(EventBusError::Lagged(_)) => {}
                        Err(_) => break,
                    },
                    _ = &mut stopped => break,
                }
            }
            for event in receiver.drain() {
                if let DomainEvent::RobotLifecycle(event) = event {
                    println!("{}", describe_event(&event, &graph));
                }
            }
        });
        Self { stop, handle }
    }

    async fn stop(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Event printer task failed");
        }
    }
}

fn describe_event(event: &RobotLifecycleEvent, graph: &NavGraph) -> String {
    let what = match &event.extra {
        TransitionDetail::Spawned { vertex } => format!("spawned at {}", graph.display_name(*vertex)),
        TransitionDetail::TaskAssigned {
            destination,
            hops,
            cost,
            ..
        } => format!(
            "task to {} ({} hops, cost {:.2})",
            graph.display_name(*destination),
            hops,
            cost
        ),
        TransitionDetail::EnteredLane { lane, from, to } => format!(
            "entered {} {} → {}",
            lane,
            graph.display_name(*from),
            graph.display_name(*to)
        ),
        TransitionDetail::Queued { resource } => format!("queued for {}", resource),
        TransitionDetail::Arrived { vertex } => format!("arrived at {}", graph.display_name(*vertex)),
        TransitionDetail::ChargingStarted { vertex, battery } => format!(
            "charging at {} from {:.0}%",
            graph.display_name(*vertex),
            battery
        ),
        TransitionDetail::Charged { battery } => format!("charged to {:.0}%", battery),
        TransitionDetail::Cancelled { vertex } => {
            format!("cancelled at {}", graph.display_name(*vertex))
        }
    };
    format!(
        "[tick {:>4}] {} {:<9} {}",
        event.tick,
        event.robot_id.to_string().bold(),
        format_status(event.new_status),
        what
    )
}

fn format_status(status: RobotStatus) -> colored::ColoredString {
    match status {
        RobotStatus::Idle => "idle".normal(),
        RobotStatus::Moving => "moving".cyan(),
        RobotStatus::Waiting => "waiting".yellow(),
        RobotStatus::Charging => "charging".blue(),
        RobotStatus::Complete => "complete".green(),
    }
}

fn describe_position(robot: &RobotSnapshot, graph: &NavGraph) -> String {
    match robot.state {
        RobotState::Moving {
            from, to, progress, ..
        } => format!(
            "{} → {} ({:.0}%)",
            graph.display_name(from),
            graph.display_name(to),
            progress * 100.0
        ),
        RobotState::Waiting { at, on } => format!("{} (waiting for {})", graph.display_name(at), on),
        RobotState::Idle { at } | RobotState::Charging { at } | RobotState::Complete { at } => {
            graph.display_name(at)
        }
    }
}

fn print_summary(
    scenario: &Scenario,
    outcome: &RunOutcome,
    plan: &ScenarioPlan,
    robots: &[RobotSnapshot],
    graph: &NavGraph,
) {
    println!();
    println!(
        "{} {}",
        "Scenario".bold(),
        scenario.display_name().bold()
    );
    println!(
        "  Stopped after {} ticks ({})",
        outcome.ticks,
        outcome.reason.as_str()
    );
    println!("  Tasks assigned: {}", plan.assigned());
    println!();

    if robots.is_empty() {
        println!("{}", "No robots in scenario".yellow());
    } else {
        println!(
            "  {:<6} {:<10} {:>8}  {:<14} {}",
            "ROBOT".bold(),
            "STATUS".bold(),
            "BATTERY".bold(),
            "DESTINATION".bold(),
            "POSITION".bold()
        );
        for robot in robots {
            let destination = robot
                .destination
                .map(|vertex| graph.display_name(vertex))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {:<6} {:<10} {:>7.1}%  {:<14} {}",
                robot.id.to_string(),
                format_status(robot.status),
                robot.battery,
                destination,
                describe_position(robot, graph)
            );
        }
    }

    if !plan.failures().is_empty() {
        println!();
        println!(
            "{}",
            format!("{} task assignment(s) failed:", plan.failures().len()).red()
        );
        for failure in plan.failures() {
            println!(
                "  {} → {} at tick {}: {}",
                failure.robot,
                graph.display_name(failure.destination),
                failure.tick,
                failure.error
            );
        }
    }
    println!();
}
