//! # Metrics
//!
//! Actors report concurrently, the collector keeps everything behind its own mutex.
//! That mutex has nothing to do with the protocol and nobody takes it while holding protocol locks.
//!
//! The aggregate is computed once, after every actor has been joined:
//! - mean wait = Σ wait / N
//! - variance = Σ wait² / N - mean² (population variance)
//! - fairness = standard deviation of the wait
//! - throughput = completed operations / wall time
//! - overhead = mean wait / N

use std::{collections::BTreeMap, time::Duration};

use parking_lot::Mutex;
use serde::Serialize;
use strum::IntoEnumIterator;

use crate::{
    actor::{Actor, Role},
    error::{SimError, SimResult},
};

/// How long one actor queued for admission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WaitSample {
    pub actor: Actor,
    /// When the actor reached the gate, since the start of the run
    pub arrival: Duration,
    pub wait: Duration,
    /// Position in the admission order, starting at 0
    pub admission: u64,
}

#[derive(Debug, Default)]
struct Ledger {
    samples: Vec<WaitSample>,
    completed: usize,
}

pub struct MetricsCollector {
    ledger: Mutex<Ledger>,
}

impl MetricsCollector {
    /// Storage for every sample is reserved up front, actors never allocate while reporting
    pub fn with_capacity(actors: usize) -> SimResult<Self> {
        let mut samples = Vec::new();
        samples
            .try_reserve_exact(actors)
            .map_err(|source| SimError::Allocation {
                requested: actors,
                source,
            })?;
        Ok(Self {
            ledger: Mutex::new(Ledger {
                samples,
                completed: 0,
            }),
        })
    }

    pub fn record_wait(&self, sample: WaitSample) {
        self.ledger.lock().samples.push(sample);
    }

    pub fn record_completion(&self) {
        self.ledger.lock().completed += 1;
    }

    pub fn completed(&self) -> usize {
        self.ledger.lock().completed
    }

    pub fn compute_aggregate(&self, total_wall_time: Duration) -> RunMetrics {
        let ledger = self.ledger.lock();
        let waits: Vec<f64> = ledger
            .samples
            .iter()
            .map(|s| s.wait.as_secs_f64())
            .collect();
        RunMetrics::from_waits(&waits, ledger.completed, total_wall_time)
    }

    pub fn into_parts(self) -> (Vec<WaitSample>, usize) {
        let ledger = self.ledger.into_inner();
        (ledger.samples, ledger.completed)
    }
}

/// Everything is in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunMetrics {
    pub actors: usize,
    pub completed_ops: usize,
    pub total_duration: f64,
    pub mean_wait: f64,
    pub variance: f64,
    /// Standard deviation of the wait, 0 means everybody waited the same
    pub fairness: f64,
    /// Operations per second
    pub throughput: f64,
    pub overhead: f64,
}

impl RunMetrics {
    pub fn from_waits(waits: &[f64], completed_ops: usize, total_wall_time: Duration) -> Self {
        let total_duration = total_wall_time.as_secs_f64();
        let throughput = if total_duration > 0.0 {
            completed_ops as f64 / total_duration
        } else {
            0.0
        };

        let actors = waits.len();
        if actors == 0 {
            return Self {
                actors,
                completed_ops,
                total_duration,
                mean_wait: 0.0,
                variance: 0.0,
                fairness: 0.0,
                throughput,
                overhead: 0.0,
            };
        }

        let n = actors as f64;
        let sum: f64 = waits.iter().sum();
        let sum_of_squares: f64 = waits.iter().map(|w| w * w).sum();
        let mean_wait = sum / n;
        // E[x²] - E[x]² may dip a hair below zero for equal samples
        let variance = (sum_of_squares / n - mean_wait * mean_wait).max(0.0);

        Self {
            actors,
            completed_ops,
            total_duration,
            mean_wait,
            variance,
            fairness: variance.sqrt(),
            throughput,
            overhead: mean_wait / n,
        }
    }
}

/// Waits of a single role
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoleSummary {
    pub role: Role,
    pub actors: usize,
    pub mean_wait: f64,
    pub max_wait: f64,
}

/// One entry per role, roles without actors included
pub fn summarize_roles(samples: &[WaitSample]) -> Vec<RoleSummary> {
    let mut by_role: BTreeMap<Role, Vec<f64>> = Role::iter().map(|r| (r, Vec::new())).collect();
    for sample in samples {
        by_role
            .entry(sample.actor.role)
            .or_default()
            .push(sample.wait.as_secs_f64());
    }

    by_role
        .into_iter()
        .map(|(role, waits)| {
            let actors = waits.len();
            let mean_wait = if actors == 0 {
                0.0
            } else {
                waits.iter().sum::<f64>() / actors as f64
            };
            RoleSummary {
                role,
                actors,
                mean_wait,
                max_wait: waits.into_iter().fold(0.0, f64::max),
            }
        })
        .collect()
}
