// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Fleet CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Graph file loading, scenarios, the activity log and command handlers

pub mod activity_log;
pub mod commands;
pub mod graph_file;
pub mod scenario;
