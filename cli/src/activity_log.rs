// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Activity Log - Persistent record of a fleet session
//
// Writes one line per entry to a text file:
//
//   2026-03-01 09:30:00 - INFO - ROBOT_TRANSITION: {"tick":4,...}
//
// Entries are queued on an unbounded channel and written by a background
// task, so emitting never blocks the coordinator. The log also acts as the
// coordinator's event sink and forwards every event to the event bus for
// live observers. Entries keep the order in which they were emitted.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use fleet_core::domain::events::{FleetEventSink, RobotLifecycleEvent, TickSummary};
use fleet_core::infrastructure::event_bus::EventBus;
use parking_lot::Mutex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const SYSTEM_START: &str = "SYSTEM_START";
pub const ROBOT_SPAWNED: &str = "ROBOT_SPAWNED";
pub const TASK_ASSIGNED: &str = "TASK_ASSIGNED";
pub const TASK_ASSIGNMENT_FAILED: &str = "TASK_ASSIGNMENT_FAILED";
pub const TASK_CANCELLED: &str = "TASK_CANCELLED";
pub const ROBOT_TRANSITION: &str = "ROBOT_TRANSITION";
pub const SIMULATION_END: &str = "SIMULATION_END";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render one log line (without the trailing newline).
pub fn format_line(at: DateTime<Local>, event_type: &str, details: &Value) -> String {
    format!(
        "{} - INFO - {}: {}",
        at.format(TIMESTAMP_FORMAT),
        event_type,
        details
    )
}

enum LogCommand {
    Entry {
        at: DateTime<Utc>,
        event_type: &'static str,
        details: Value,
    },
    Close,
}

pub struct ActivityLog {
    path: PathBuf,
    sender: mpsc::UnboundedSender<LogCommand>,
    writer: Mutex<Option<JoinHandle<Result<u64>>>>,
    bus: Option<EventBus>,
}

impl ActivityLog {
    /// Open (truncating) `path`, creating its parent directory if needed, and
    /// start the writer task.
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create log directory {:?}", parent))?;
        }
        let file = File::create(&path)
            .await
            .with_context(|| format!("Failed to open activity log {:?}", path))?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_entries(BufWriter::new(file), receiver));
        debug!(path = ?path, "Activity log opened");

        Ok(Self {
            path,
            sender,
            writer: Mutex::new(Some(writer)),
            bus: None,
        })
    }

    /// Forward coordinator events to `bus` after recording them.
    pub fn forward_to(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, event_type: &'static str, details: Value) {
        self.enqueue(Utc::now(), event_type, details);
    }

    fn enqueue(&self, at: DateTime<Utc>, event_type: &'static str, details: Value) {
        let entry = LogCommand::Entry {
            at,
            event_type,
            details,
        };
        if self.sender.send(entry).is_err() {
            warn!(event_type, "Activity log is closed, dropping entry");
        }
    }

    /// Flush outstanding entries and stop the writer. Returns the number of
    /// lines written. Later entries are dropped.
    pub async fn close(&self) -> Result<u64> {
        let Some(writer) = self.writer.lock().take() else {
            return Ok(0);
        };
        // The writer only exits early on an I/O error, reported by the join below
        let _ = self.sender.send(LogCommand::Close);
        let lines = writer.await.context("Activity log writer panicked")??;
        debug!(path = ?self.path, lines, "Activity log closed");
        Ok(lines)
    }
}

impl FleetEventSink for ActivityLog {
    fn emit(&self, event: RobotLifecycleEvent) {
        match serde_json::to_value(&event) {
            Ok(details) => self.enqueue(event.emitted_at, ROBOT_TRANSITION, details),
            Err(e) => warn!(error = %e, "Failed to serialize lifecycle event"),
        }
        if let Some(bus) = &self.bus {
            bus.emit(event);
        }
    }

    fn tick_completed(&self, summary: &TickSummary) {
        if let Some(bus) = &self.bus {
            bus.tick_completed(summary);
        }
    }
}

async fn write_entries(
    mut out: BufWriter<File>,
    mut receiver: mpsc::UnboundedReceiver<LogCommand>,
) -> Result<u64> {
    let mut lines = 0u64;
    while let Some(command) = receiver.recv().await {
        match command {
            LogCommand::Entry {
                at,
                event_type,
                details,
            } => {
                let mut line = format_line(at.with_timezone(&Local), event_type, &details);
                line.push('\n');
                out.write_all(line.as_bytes())
                    .await
                    .context("Failed to write activity log")?;
                lines += 1;
            }
            LogCommand::Close => break,
        }
    }
    out.flush().await.context("Failed to flush activity log")?;
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fleet_core::domain::events::TransitionDetail;
    use fleet_core::domain::graph::VertexId;
    use fleet_core::domain::robot::{RobotId, RobotStatus};
    use fleet_core::infrastructure::event_bus::DomainEvent;
    use serde_json::json;

    #[test]
    fn test_format_line() {
        let at = Local.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let line = format_line(at, TASK_ASSIGNED, &json!({"robot_id": 1, "to": 3}));
        assert_eq!(
            line,
            r#"2026-03-01 09:30:00 - INFO - TASK_ASSIGNED: {"robot_id":1,"to":3}"#
        );
    }

    #[tokio::test]
    async fn test_entries_are_written_in_order_and_forwarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("fleet_logs.txt");
        let bus = EventBus::new(16);
        let mut receiver = bus.subscribe();
        let log = ActivityLog::create(&path).await.unwrap().forward_to(bus);

        log.record(SYSTEM_START, json!({"vertices": 3}));
        log.emit(RobotLifecycleEvent::new(
            0,
            RobotId(1),
            None,
            RobotStatus::Idle,
            TransitionDetail::Spawned { vertex: VertexId(2) },
        ));
        assert_eq!(log.close().await.unwrap(), 2);
        // Entries after close are dropped
        log.record(SIMULATION_END, json!({}));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(r#"- INFO - SYSTEM_START: {"vertices":3}"#));
        assert!(lines[1].contains("- INFO - ROBOT_TRANSITION: {\"tick\":0,\"robot_id\":1,"));

        assert!(matches!(receiver.try_recv(), Ok(DomainEvent::RobotLifecycle(_))));
    }
}
