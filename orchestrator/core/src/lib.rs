// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Fleet Orchestrator Core
//!
//! Coordination engine for robots sharing a navigation graph: shortest-path
//! routing, lane and vertex reservations, and the per-robot lifecycle driven
//! one tick at a time.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, coordinator and event plumbing consumed by the CLI

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
