//! # The gate
//!
//! A single-slot token every actor holds while making its admission decision, never longer.
//! Two flavours:
//! - [GatePolicy::Semaphore] - a binary semaphore, the textbook "turn" token.
//!   It's first-come-first-served only among threads already contending for it,
//!   a thread that arrived earlier may still lose the race after a release.
//! - [GatePolicy::Ticket] - a [TicketLock], strictly in the order the gate was reached.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use super::{
    semaphore::{BinarySemaphore, Permit},
    ticket::{TicketGuard, TicketLock},
};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GatePolicy {
    Semaphore,
    #[default]
    Ticket,
}

pub enum Gate {
    Semaphore(BinarySemaphore),
    Ticket(TicketLock),
}

impl Gate {
    pub fn new(policy: GatePolicy) -> Self {
        match policy {
            GatePolicy::Semaphore => Self::Semaphore(BinarySemaphore::new()),
            GatePolicy::Ticket => Self::Ticket(TicketLock::new()),
        }
    }

    pub fn policy(&self) -> GatePolicy {
        match self {
            Self::Semaphore(_) => GatePolicy::Semaphore,
            Self::Ticket(_) => GatePolicy::Ticket,
        }
    }

    /// Blocks until it's the caller's turn. The turn ends when the pass is dropped.
    pub fn pass(&self) -> GatePass<'_> {
        match self {
            Self::Semaphore(semaphore) => GatePass::Semaphore(semaphore.acquire()),
            Self::Ticket(lock) => GatePass::Ticket(lock.lock()),
        }
    }
}

#[must_use = "the turn ends as soon as the pass is dropped"]
pub enum GatePass<'a> {
    Semaphore(Permit<'a>),
    Ticket(TicketGuard<'a>),
}

impl GatePass<'_> {
    /// The number drawn at a ticket gate, the semaphore one doesn't number its turns
    pub fn ticket(&self) -> Option<u32> {
        match self {
            Self::Semaphore(_) => None,
            Self::Ticket(guard) => Some(guard.ticket()),
        }
    }
}
