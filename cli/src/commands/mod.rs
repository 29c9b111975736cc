// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the fleet CLI

pub mod config;
pub mod graph;
pub mod route;
pub mod simulate;

pub use self::config::ConfigCommand;
pub use self::graph::GraphCommand;
pub use self::route::RouteArgs;
pub use self::simulate::SimulateArgs;
