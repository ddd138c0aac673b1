//! # Driver
//!
//! Spawns one thread per actor, waits for all of them and turns the collected samples into a [RunReport].
//! Threads are scoped => they borrow the run's [Coordinator] and [MetricsCollector] directly,
//! nothing outlives the run.

use std::thread;

use serde::Serialize;
use tracing::{info, warn};

use crate::{
    actor::{self, Actor, Plan, Role},
    clock::Stopwatch,
    config::SimConfig,
    coordinator::{Coordinator, Occupancy},
    error::{SimError, SimResult},
    metrics::{summarize_roles, MetricsCollector, RoleSummary, RunMetrics, WaitSample},
    sync::GatePolicy,
};

/// How many readers and writers take part. Holds at least one actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Population {
    readers: usize,
    writers: usize,
}

impl Population {
    /// Counts come straight from the user, hence signed
    pub fn new(readers: i64, writers: i64) -> SimResult<Self> {
        let count = |what: &str, n: i64| {
            usize::try_from(n).map_err(|_| {
                SimError::InvalidConfig(format!("{what} count must not be negative, got {n}"))
            })
        };
        let population = Self {
            readers: count("reader", readers)?,
            writers: count("writer", writers)?,
        };
        if population.total() == 0 {
            return Err(SimError::InvalidConfig(
                "at least one reader or writer is required".to_string(),
            ));
        }
        Ok(population)
    }

    pub fn readers(&self) -> usize {
        self.readers
    }

    pub fn writers(&self) -> usize {
        self.writers
    }

    pub fn total(&self) -> usize {
        self.readers + self.writers
    }

    /// Readers first, 1..=N, then writers N+1..=N+M
    pub fn actors(&self) -> impl Iterator<Item = Actor> {
        let readers = (1..=self.readers).map(|id| Actor {
            id,
            role: Role::Reader,
        });
        let writers = (self.readers + 1..=self.total()).map(|id| Actor {
            id,
            role: Role::Writer,
        });
        readers.chain(writers)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub population: Population,
    pub gate: GatePolicy,
    pub metrics: RunMetrics,
    pub roles: Vec<RoleSummary>,
    pub final_value: i64,
    pub occupancy: Occupancy,
    /// Sorted by admission order
    pub samples: Vec<WaitSample>,
}

pub fn run_simulation(population: Population, config: &SimConfig) -> SimResult<RunReport> {
    config.validate()?;
    check_headroom(config, population.writers())?;

    let coordinator = Coordinator::new(config.initial_value, config.gate);
    let metrics = MetricsCollector::with_capacity(population.total())?;
    let plans: Vec<Plan> = population
        .actors()
        .map(|actor| Plan::draw(actor, config))
        .collect();

    info!(
        readers = population.readers(),
        writers = population.writers(),
        gate = %config.gate,
        "starting simulation"
    );
    let clock = Stopwatch::start();
    spawn_and_join(&plans, config.increment, clock, &coordinator, &metrics)?;
    let total_wall_time = clock.elapsed();

    let run_metrics = metrics.compute_aggregate(total_wall_time);
    let occupancy = coordinator.occupancy();
    if occupancy.violations != 0 {
        warn!(violations = occupancy.violations, "writers shared the resource");
    }
    let gate = coordinator.gate_policy();
    let final_value = coordinator.into_value();
    let (mut samples, _) = metrics.into_parts();
    samples.sort_by_key(|s| s.admission);

    info!(
        final_value,
        seconds = run_metrics.total_duration,
        "simulation finished"
    );
    Ok(RunReport {
        population,
        gate,
        metrics: run_metrics,
        roles: summarize_roles(&samples),
        final_value,
        occupancy,
        samples,
    })
}

/// Every writer adds the increment once, the final value has to fit
fn check_headroom(config: &SimConfig, writers: usize) -> SimResult<()> {
    i64::try_from(writers)
        .ok()
        .and_then(|k| config.increment.checked_mul(k))
        .and_then(|total| config.initial_value.checked_add(total))
        .map(|_| ())
        .ok_or_else(|| {
            SimError::InvalidConfig(format!(
                "{writers} writers adding {} to {} overflow the resource",
                config.increment, config.initial_value
            ))
        })
}

fn spawn_and_join(
    plans: &[Plan],
    increment: i64,
    run: Stopwatch,
    coordinator: &Coordinator,
    metrics: &MetricsCollector,
) -> SimResult<()> {
    thread::scope(|s| {
        let mut handles = Vec::with_capacity(plans.len());
        let mut outcome = Ok(());

        for &plan in plans {
            let spawned = thread::Builder::new()
                .name(plan.actor.thread_name())
                .spawn_scoped(s, move || {
                    actor::perform(plan, increment, run, coordinator, metrics)
                });
            match spawned {
                Ok(handle) => handles.push((plan.actor, handle)),
                Err(source) => {
                    // the ones already running still get joined below
                    outcome = Err(SimError::Spawn {
                        actor: plan.actor,
                        source,
                    });
                    break;
                }
            }
        }

        // join everybody even after a failure, the first error wins
        for (actor, handle) in handles {
            if handle.join().is_err() && outcome.is_ok() {
                outcome = Err(SimError::ActorPanicked { actor });
            }
        }
        outcome
    })
}
