//! # Admission protocol
//!
//! One [Coordinator] per run owns everything the actors share:
//! - the resource itself, a plain integer in an [UnsafeCell]
//! - the reader room: how many readers are inside, behind a short-lived mutex
//! - the writer exclusion lock, a [BinarySemaphore]
//! - the [Gate] everybody passes before deciding to go in
//!
//! Reader, see [Coordinator::enter_read]:
//! 1. pass the gate
//! 2. in the room: count += 1, the first one in takes the exclusion lock for the whole group
//! 3. leave the gate
//! 4. read
//! 5. in the room: count -= 1, the last one out gives the exclusion lock back
//!
//! Writer, see [Coordinator::enter_write]:
//! 1. pass the gate
//! 2. take the exclusion lock
//! 3. leave the gate
//! 4. write
//! 5. give the exclusion lock back
//!
//! The writer waits for exclusion *while holding the gate*. That's the whole trick against starvation:
//! a reader that shows up later can't even get to the room until the writer is in.
//! The first reader of a group may wait at the gate too, but only for a single writer's turn.
//!
//! Steps 4-5 are the [ReadSession] / [WriteSession] guards: the integer is only reachable through them,
//! and dropping them (including on unwind) is the only way out.
//!
//! ## Memory ordering
//! A writer's store happens-before the next reader group's loads: the writer releases the semaphore,
//! the first reader acquires it, later readers synchronize with the first one through the room's mutex.

mod probe;

use std::{
    cell::UnsafeCell,
    sync::{
        atomic::{AtomicU64, Ordering::Relaxed},
        Arc,
    },
};

use parking_lot::Mutex;
use tracing::debug;

use crate::sync::{BinarySemaphore, Gate, GatePolicy, OwnedPermit, Permit};

pub use probe::{Occupancy, OccupancyProbe};

pub struct Coordinator {
    resource: Resource,
    room: Mutex<ReaderRoom>,
    exclusion: Arc<BinarySemaphore>,
    gate: Gate,
    /// bumped by every actor while it still holds the gate => the admission order
    admissions: AtomicU64,
    probe: OccupancyProbe,
}

/// The shared integer. Nothing locks it, the protocol does: writers alone or readers together.
struct Resource(UnsafeCell<i64>);

/// SAFETY: the cell is only reached through [ReadSession] and [WriteSession],
/// and a [WriteSession] never coexists with any other session
unsafe impl Sync for Resource {}

#[derive(Default)]
struct ReaderRoom {
    active: usize,
    /// the group's hold on the exclusion lock, taken by the first reader, dropped by the last one
    session: Option<OwnedPermit>,
}

impl Coordinator {
    pub fn new(initial_value: i64, gate: GatePolicy) -> Self {
        Self {
            resource: Resource(UnsafeCell::new(initial_value)),
            room: Mutex::new(ReaderRoom::default()),
            exclusion: Arc::new(BinarySemaphore::new()),
            gate: Gate::new(gate),
            admissions: AtomicU64::new(0),
            probe: OccupancyProbe::default(),
        }
    }

    pub fn gate_policy(&self) -> GatePolicy {
        self.gate.policy()
    }

    /// Blocks until the caller may read along with the other readers
    pub fn enter_read(&self) -> ReadSession<'_> {
        let pass = self.gate.pass();
        {
            let mut room = self.room.lock();
            room.active += 1;
            if room.active == 1 {
                // only the first reader can block here, and only behind a single writer
                debug!(ticket = ?pass.ticket(), "first reader in, locking writers out");
                room.session = Some(self.exclusion.acquire_owned());
            }
        }
        let admission = self.admissions.fetch_add(1, Relaxed);
        drop(pass);

        self.probe.reader_in();
        ReadSession {
            coordinator: self,
            admission,
        }
    }

    /// Blocks until the caller has the resource to itself
    pub fn enter_write(&self) -> WriteSession<'_> {
        let pass = self.gate.pass();
        let permit = self.exclusion.acquire();
        debug!(ticket = ?pass.ticket(), "writer took exclusion");
        let admission = self.admissions.fetch_add(1, Relaxed);
        drop(pass);

        self.probe.writer_in();
        WriteSession {
            coordinator: self,
            _permit: permit,
            admission,
        }
    }

    pub fn active_readers(&self) -> usize {
        self.room.lock().active
    }

    pub fn is_exclusive_held(&self) -> bool {
        self.exclusion.is_taken()
    }

    pub fn occupancy(&self) -> Occupancy {
        self.probe.summary()
    }

    /// The final value, once every actor is done and the coordinator isn't shared anymore
    pub fn into_value(self) -> i64 {
        self.resource.0.into_inner()
    }
}

/// A reader's stay inside. Leaves the room on drop.
pub struct ReadSession<'a> {
    coordinator: &'a Coordinator,
    admission: u64,
}

impl ReadSession<'_> {
    pub fn read(&self) -> i64 {
        // SAFETY: the reader group holds the exclusion lock => no writer session exists
        unsafe { *self.coordinator.resource.0.get() }
    }

    /// Position in the overall admission order, starting at 0
    pub fn admission(&self) -> u64 {
        self.admission
    }
}

impl Drop for ReadSession<'_> {
    fn drop(&mut self) {
        self.coordinator.probe.reader_out();
        let mut room = self.coordinator.room.lock();
        room.active -= 1;
        if room.active == 0 {
            debug!("last reader out, letting writers in");
            room.session = None;
        }
    }
}

/// A writer's exclusive stay. The exclusion permit goes back on drop.
pub struct WriteSession<'a> {
    coordinator: &'a Coordinator,
    _permit: Permit<'a>,
    admission: u64,
}

impl WriteSession<'_> {
    pub fn read(&self) -> i64 {
        // SAFETY: the permit makes this session the only one around
        unsafe { *self.coordinator.resource.0.get() }
    }

    /// Adds `delta` and returns the new value.
    ///
    /// # Panics
    /// On overflow in debug builds. `run_simulation` rejects configurations whose
    /// final value doesn't fit before any writer starts.
    pub fn write(&mut self, delta: i64) -> i64 {
        // SAFETY: the permit makes this session the only one around, &mut self keeps it to one borrow
        let value = unsafe { &mut *self.coordinator.resource.0.get() };
        *value += delta;
        *value
    }

    pub fn admission(&self) -> u64 {
        self.admission
    }
}

impl Drop for WriteSession<'_> {
    fn drop(&mut self) {
        // runs before the permit field is dropped, so the probe never sees a released writer
        self.coordinator.probe.writer_out();
    }
}

#[cfg(test)]
mod test {
    use std::{
        panic::{catch_unwind, AssertUnwindSafe},
        sync::atomic::{AtomicBool, Ordering::SeqCst},
        thread::{scope, sleep},
        time::Duration,
    };

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_readers_share_writers_dont() {
        let coordinator = Coordinator::new(1, GatePolicy::Ticket);

        let first = coordinator.enter_read();
        let second = coordinator.enter_read();
        assert_eq!(coordinator.active_readers(), 2);
        assert!(coordinator.is_exclusive_held());
        assert_eq!((first.read(), second.read()), (1, 1));
        assert_eq!((first.admission(), second.admission()), (0, 1));

        drop(first);
        // the group still holds it
        assert!(coordinator.is_exclusive_held());
        drop(second);
        assert!(!coordinator.is_exclusive_held());
        assert_eq!(coordinator.active_readers(), 0);

        let mut writer = coordinator.enter_write();
        assert_eq!(writer.write(3), 4);
        assert_eq!(writer.admission(), 2);
        drop(writer);

        assert_eq!(coordinator.into_value(), 4);
    }

    #[test]
    fn test_writer_waits_for_the_last_reader() {
        let coordinator = Coordinator::new(0, GatePolicy::Ticket);
        let readers_done = AtomicBool::new(false);

        scope(|s| {
            let reader = coordinator.enter_read();
            let writer = s.spawn(|| {
                let mut session = coordinator.enter_write();
                assert!(readers_done.load(SeqCst), "writer got in next to a reader");
                session.write(1);
            });
            sleep(Duration::from_millis(100));
            assert!(!writer.is_finished());
            readers_done.store(true, SeqCst);
            drop(reader);
        });

        assert_eq!(coordinator.occupancy().violations, 0);
        assert_eq!(coordinator.into_value(), 1);
    }

    /// reader A is inside, writer W queues, reader B shows up after W:
    /// B must not join A's group and overtake W
    #[test]
    fn test_queued_writer_is_not_overtaken() {
        for policy in GatePolicy::iter() {
            let coordinator = Coordinator::new(0, policy);

            let (writer_admission, late_reader) = scope(|s| {
                let early_reader = coordinator.enter_read();
                let writer = s.spawn(|| {
                    let mut session = coordinator.enter_write();
                    session.write(3);
                    sleep(Duration::from_millis(50));
                    session.admission()
                });
                sleep(Duration::from_millis(50));
                let late = s.spawn(|| {
                    let session = coordinator.enter_read();
                    (session.admission(), session.read())
                });
                sleep(Duration::from_millis(50));
                // B is stuck behind W, which is stuck behind A
                assert_eq!(coordinator.active_readers(), 1);
                drop(early_reader);
                (writer.join().unwrap(), late.join().unwrap())
            });

            assert_eq!(writer_admission, 1, "{policy}");
            assert_eq!(late_reader, (2, 3), "{policy}: late reader must see the write");
        }
    }

    #[test]
    fn test_unwinding_session_releases() {
        let coordinator = Coordinator::new(0, GatePolicy::Semaphore);

        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut session = coordinator.enter_write();
            session.write(1);
            panic!("writer failed halfway");
        }));
        assert!(result.is_err());
        assert!(!coordinator.is_exclusive_held());

        let result = catch_unwind(AssertUnwindSafe(|| {
            let _session = coordinator.enter_read();
            panic!("reader failed halfway");
        }));
        assert!(result.is_err());
        assert_eq!(coordinator.active_readers(), 0);

        // nothing is left locked
        let session = coordinator.enter_read();
        assert_eq!(session.read(), 1);
        drop(session);
        drop(coordinator.enter_write());
    }
}
