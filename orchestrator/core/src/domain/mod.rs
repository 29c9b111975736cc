// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain Layer
//!
//! Pure fleet model: navigation graph, routes, robots, reservations and the
//! lifecycle events they produce. No I/O beyond configuration loading.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Types and invariants shared by the coordinator and its collaborators

pub mod events;
pub mod fleet_config;
pub mod graph;
pub mod reservation;
pub mod robot;
pub mod route;
