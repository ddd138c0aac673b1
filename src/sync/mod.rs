//! # Blocking primitives for the admission protocol
//!
//! Two locks are needed and neither of them is a plain mutex:
//! - the writer exclusion lock is taken by the first reader and given back by the *last* one,
//!   i.e. it is released from another thread => a binary semaphore, see [semaphore::BinarySemaphore]
//! - the gate every actor passes through before an admission decision, see [gate::Gate]
//!
//! Both sleep on a futex through the [atomic-wait](https://crates.io/crates/atomic-wait) crate:
//! - `wait(&AtomicU32, u32)` - blocks only while the atomic holds the given value, may wake up spuriously
//! - `wake_one(&AtomicU32)` - wakes a single waiter
//! - `wake_all(&AtomicU32)` - wakes everybody waiting on the atomic
//!
//! Nothing here busy-polls beyond a short bounded spin before going to sleep.

pub mod gate;
pub mod semaphore;
pub mod ticket;

pub use gate::{Gate, GatePass, GatePolicy};
pub use semaphore::{BinarySemaphore, OwnedPermit, Permit};
pub use ticket::{TicketGuard, TicketLock};
