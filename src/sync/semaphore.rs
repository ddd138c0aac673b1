//! # Binary semaphore
//! The state machine is the three-valued futex mutex: 0 - free, 1 - taken, 2 - taken and somebody sleeps on it.
//!
//! The difference from a mutex is ownership. A permit isn't tied to the thread that acquired it:
//! [OwnedPermit] keeps the semaphore alive through an [Arc] and can be parked in shared state,
//! so one reader takes the permit and another one drops it.
//!
//! There are no fairness guarantees: whoever wins the swap after a release gets the permit,
//! which is what a POSIX `sem_t` gives too. Ordering is the gate's business.

use std::{
    hint,
    sync::{
        atomic::{
            AtomicU32,
            Ordering::{Acquire, Relaxed, Release},
        },
        Arc,
    },
};

use atomic_wait::{wait, wake_one};

const FREE: u32 = 0;
const TAKEN: u32 = 1;
const CONTENDED: u32 = 2;

pub struct BinarySemaphore {
    state: AtomicU32,
}

impl Default for BinarySemaphore {
    fn default() -> Self {
        Self::new()
    }
}

impl BinarySemaphore {
    /// The permit is available from the start
    pub const fn new() -> Self {
        Self {
            state: AtomicU32::new(FREE),
        }
    }

    /// Blocks until the permit is ours
    pub fn acquire(&self) -> Permit<'_> {
        self.take();
        Permit { semaphore: self }
    }

    /// Same as [Self::acquire], but the permit may outlive the borrow and travel between threads
    pub fn acquire_owned(self: &Arc<Self>) -> OwnedPermit {
        self.take();
        OwnedPermit {
            semaphore: Arc::clone(self),
        }
    }

    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        self.state
            .compare_exchange(FREE, TAKEN, Acquire, Relaxed)
            .ok()
            .map(|_| Permit { semaphore: self })
    }

    pub fn is_taken(&self) -> bool {
        self.state.load(Relaxed) != FREE
    }

    fn take(&self) {
        if self
            .state
            .compare_exchange(FREE, TAKEN, Acquire, Relaxed)
            .is_err()
        {
            Self::take_contended(&self.state);
        }
    }

    #[cold]
    fn take_contended(state: &AtomicU32) {
        let mut spin_count = 0;

        // holders are short-lived more often than not, spin a bit before the syscall
        while state.load(Relaxed) == TAKEN && spin_count < 100 {
            spin_count += 1;
            hint::spin_loop();
        }

        if state.compare_exchange(FREE, TAKEN, Acquire, Relaxed).is_ok() {
            return;
        }

        // leave CONTENDED behind so the releasing side knows to wake somebody
        while state.swap(CONTENDED, Acquire) != FREE {
            wait(state, CONTENDED);
        }
    }

    fn give_back(&self) {
        if self.state.swap(FREE, Release) == CONTENDED {
            wake_one(&self.state);
        }
    }
}

/// Borrowed permit, released on drop
pub struct Permit<'a> {
    semaphore: &'a BinarySemaphore,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.semaphore.give_back();
    }
}

/// Permit that can be stored and released by any thread
pub struct OwnedPermit {
    semaphore: Arc<BinarySemaphore>,
}

impl Drop for OwnedPermit {
    fn drop(&mut self) {
        self.semaphore.give_back();
    }
}

#[cfg(test)]
mod test {
    use std::{
        sync::atomic::{AtomicBool, AtomicUsize, Ordering::SeqCst},
        thread::{scope, sleep},
        time::Duration,
    };

    use super::*;

    #[test]
    fn test_permit_is_exclusive() {
        let semaphore = BinarySemaphore::new();
        let inside = AtomicUsize::new(0);
        let overlaps = AtomicUsize::new(0);

        scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..200 {
                        let _permit = semaphore.acquire();
                        if inside.fetch_add(1, SeqCst) != 0 {
                            overlaps.fetch_add(1, SeqCst);
                        }
                        hint::spin_loop();
                        inside.fetch_sub(1, SeqCst);
                    }
                });
            }
        });

        assert_eq!(overlaps.load(SeqCst), 0);
        assert!(!semaphore.is_taken());
    }

    #[test]
    fn test_owned_permit_released_by_another_thread() {
        let semaphore = Arc::new(BinarySemaphore::new());
        let permit = semaphore.acquire_owned();
        assert!(semaphore.try_acquire().is_none());

        let released = AtomicBool::new(false);
        scope(|s| {
            let waiter = s.spawn(|| {
                let _permit = semaphore.acquire();
                // the only way to get here is the other thread dropping the permit
                assert!(released.load(SeqCst));
            });
            s.spawn(|| {
                sleep(Duration::from_millis(50));
                released.store(true, SeqCst);
                drop(permit);
            });
            waiter.join().unwrap();
        });

        assert!(semaphore.try_acquire().is_some());
    }
}
