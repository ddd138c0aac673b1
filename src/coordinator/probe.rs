//! Occupancy counters around the critical sections.
//!
//! They don't take part in the protocol, they watch it: every session bumps its counter right
//! after admission and drops it right before release, and checks what the opposite role is doing.
//! A correct protocol never records a violation.

use std::sync::atomic::{AtomicUsize, Ordering::SeqCst};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct OccupancyProbe {
    readers: AtomicUsize,
    writers: AtomicUsize,
    peak_readers: AtomicUsize,
    violations: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Occupancy {
    /// The most readers seen inside together
    pub peak_readers: usize,
    /// Times a writer shared the resource with anybody
    pub violations: usize,
}

impl OccupancyProbe {
    pub fn reader_in(&self) {
        let readers = self.readers.fetch_add(1, SeqCst) + 1;
        self.peak_readers.fetch_max(readers, SeqCst);
        if self.writers.load(SeqCst) != 0 {
            self.violations.fetch_add(1, SeqCst);
        }
    }

    pub fn reader_out(&self) {
        self.readers.fetch_sub(1, SeqCst);
    }

    pub fn writer_in(&self) {
        let others = self.writers.fetch_add(1, SeqCst);
        if others != 0 || self.readers.load(SeqCst) != 0 {
            self.violations.fetch_add(1, SeqCst);
        }
    }

    pub fn writer_out(&self) {
        self.writers.fetch_sub(1, SeqCst);
    }

    pub fn readers_inside(&self) -> usize {
        self.readers.load(SeqCst)
    }

    pub fn writers_inside(&self) -> usize {
        self.writers.load(SeqCst)
    }

    pub fn summary(&self) -> Occupancy {
        Occupancy {
            peak_readers: self.peak_readers.load(SeqCst),
            violations: self.violations.load(SeqCst),
        }
    }
}
