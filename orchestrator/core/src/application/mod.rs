// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod coordinator;
pub mod driver;
pub mod pathfinder;

// Re-export the command surface for convenience
pub use coordinator::{CoordinatorSettings, FleetCoordinator, FleetError, RobotSnapshot};
pub use driver::{RunOutcome, StopReason, TickDriver};
pub use pathfinder::{find_route, PathError};
