//! # Readers and writers
//!
//! Both follow the same script: show up after a random delay, queue for admission, spend a fixed time
//! inside, leave, report. The wait being measured is "showed up" to "admitted".
//!
//! Reporting happens after leaving, so an actor never holds the gate or the exclusion lock
//! while it waits for the metrics lock.

use std::{fmt, thread, time::Duration};

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};
use tracing::info;

use crate::{
    clock::Stopwatch,
    config::SimConfig,
    coordinator::Coordinator,
    metrics::{MetricsCollector, WaitSample},
};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Reader,
    Writer,
}

/// Readers are numbered 1..=N, writers continue with N+1..=N+M
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Actor {
    pub id: usize,
    pub role: Role,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.role, self.id)
    }
}

impl Actor {
    pub fn thread_name(&self) -> String {
        format!("{}-{}", self.role, self.id)
    }
}

/// What an actor is going to do, drawn up front so the thread itself needs no rng
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub actor: Actor,
    pub arrival: Duration,
    pub hold: Duration,
}

impl Plan {
    pub fn draw(actor: Actor, config: &SimConfig) -> Self {
        let mut rng = match config.seed {
            // per-actor streams: the same actor gets the same delay no matter the spawn order
            Some(seed) => StdRng::seed_from_u64(seed ^ actor.id as u64),
            None => StdRng::from_entropy(),
        };
        let arrival = rng.gen_range(config.arrival_delay_min_ms..=config.arrival_delay_max_ms);
        let hold = match actor.role {
            Role::Reader => config.read_duration(),
            Role::Writer => config.write_duration(),
        };
        Self {
            actor,
            arrival: Duration::from_millis(arrival),
            hold,
        }
    }
}

/// Runs one actor start to finish on the current thread.
/// `run` is the run's clock, arrivals are reported relative to it.
pub fn perform(
    plan: Plan,
    increment: i64,
    run: Stopwatch,
    coordinator: &Coordinator,
    metrics: &MetricsCollector,
) {
    thread::sleep(plan.arrival);

    let sample = match plan.actor.role {
        Role::Reader => read(plan, run, coordinator),
        Role::Writer => write(plan, increment, run, coordinator),
    };

    metrics.record_wait(sample);
    metrics.record_completion();
}

fn read(plan: Plan, run: Stopwatch, coordinator: &Coordinator) -> WaitSample {
    let arrival = run.elapsed();
    let arrived = Stopwatch::start();
    let session = coordinator.enter_read();
    let wait = arrived.elapsed();

    let value = session.read();
    info!(actor = %plan.actor, value, "read the resource");
    thread::sleep(plan.hold);

    let admission = session.admission();
    drop(session);
    WaitSample {
        actor: plan.actor,
        arrival,
        wait,
        admission,
    }
}

fn write(plan: Plan, increment: i64, run: Stopwatch, coordinator: &Coordinator) -> WaitSample {
    let arrival = run.elapsed();
    let arrived = Stopwatch::start();
    let mut session = coordinator.enter_write();
    let wait = arrived.elapsed();

    let value = session.write(increment);
    info!(actor = %plan.actor, value, "updated the resource");
    thread::sleep(plan.hold);

    let admission = session.admission();
    drop(session);
    WaitSample {
        actor: plan.actor,
        arrival,
        wait,
        admission,
    }
}
