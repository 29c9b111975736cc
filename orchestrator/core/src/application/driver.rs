// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Tick Driver - Real-time loop around the fleet coordinator
//
// Holds the coordinator behind a mutex and runs ticks either back to back or
// on a tokio interval. The lock is taken once per iteration and covers the
// scheduling hook plus the whole tick, so commands issued from other tasks
// always land between ticks.

use crate::application::coordinator::FleetCoordinator;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No robot is active and the hook has nothing left to schedule
    Quiescent,
    /// `max_ticks` ticks were executed
    TickLimit,
    /// The shutdown future resolved
    Shutdown,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Quiescent => "quiescent",
            StopReason::TickLimit => "tick_limit",
            StopReason::Shutdown => "shutdown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Ticks executed by this run
    pub ticks: u64,
    /// Coordinator tick counter when the run stopped
    pub final_tick: u64,
    pub reason: StopReason,
}

pub struct TickDriver {
    coordinator: Arc<Mutex<FleetCoordinator>>,
    tick_interval: Option<Duration>,
    max_ticks: u64,
}

impl TickDriver {
    pub fn new(coordinator: Arc<Mutex<FleetCoordinator>>, max_ticks: u64) -> Self {
        Self {
            coordinator,
            tick_interval: None,
            max_ticks,
        }
    }

    /// Pace ticks with a wall-clock interval instead of running them back to back.
    pub fn realtime(mut self, period: Duration) -> Self {
        self.tick_interval = Some(period);
        self
    }

    pub fn coordinator(&self) -> Arc<Mutex<FleetCoordinator>> {
        self.coordinator.clone()
    }

    /// Run ticks until the fleet settles, the tick limit is hit or `shutdown` resolves.
    ///
    /// `before_tick` runs under the lock ahead of every tick and returns
    /// whether it still has work scheduled for later ticks.
    pub async fn run<F, S>(&self, mut before_tick: F, shutdown: S) -> RunOutcome
    where
        F: FnMut(&mut FleetCoordinator) -> bool,
        S: Future<Output = ()>,
    {
        let mut interval = self.tick_interval.map(|period| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        tokio::pin!(shutdown);

        info!(
            max_ticks = self.max_ticks,
            realtime = self.tick_interval.is_some(),
            "Tick driver started"
        );

        let mut ticks = 0u64;
        loop {
            let pace = async {
                match interval.as_mut() {
                    Some(interval) => {
                        interval.tick().await;
                    }
                    None => tokio::task::yield_now().await,
                }
            };
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    return self.finish(ticks, StopReason::Shutdown);
                }
                _ = pace => {}
            }

            let summary = {
                let mut fleet = self.coordinator.lock();
                let pending = before_tick(&mut fleet);
                if !pending && fleet.is_quiescent() {
                    drop(fleet);
                    return self.finish(ticks, StopReason::Quiescent);
                }
                if ticks >= self.max_ticks {
                    drop(fleet);
                    return self.finish(ticks, StopReason::TickLimit);
                }
                fleet.tick()
            };
            ticks += 1;

            debug!(
                tick = summary.tick,
                moving = summary.moving,
                waiting = summary.waiting,
                charging = summary.charging,
                "Tick completed"
            );
        }
    }

    fn finish(&self, ticks: u64, reason: StopReason) -> RunOutcome {
        let final_tick = self.coordinator.lock().current_tick();
        info!(ticks, final_tick, reason = ?reason, "Tick driver stopped");
        RunOutcome {
            ticks,
            final_tick,
            reason,
        }
    }
}
