//! # Ticket lock
//!
//! A strict FIFO lock: every caller draws a number, the lock serves numbers in order.
//! Two counters do the job:
//! - `next_ticket` - the number the next caller will draw
//! - `now_serving` - the number allowed in
//!
//! Waiters sleep on `now_serving` like the condvar's counter in the futex condvar: a waiter
//! passes the value it has seen to `wait`, so a bump between the load and the syscall isn't missed.
//!
//! Unlocking has to `wake_all`, since the futex has no idea which sleeper holds the next number.
//! Those who woke up with the wrong number go straight back to sleep.
//!
//! Both counters wrap around, it's fine as long as there are fewer than 2^32 waiters at once.

use std::sync::atomic::{
    AtomicU32,
    Ordering::{Acquire, Relaxed, Release},
};

use atomic_wait::{wait, wake_all};

pub struct TicketLock {
    next_ticket: AtomicU32,
    now_serving: AtomicU32,
}

impl Default for TicketLock {
    fn default() -> Self {
        Self::new()
    }
}

impl TicketLock {
    pub const fn new() -> Self {
        Self {
            next_ticket: AtomicU32::new(0),
            now_serving: AtomicU32::new(0),
        }
    }

    pub fn lock(&self) -> TicketGuard<'_> {
        // drawing a number needs no ordering, the hand-over on now_serving carries it
        let ticket = self.next_ticket.fetch_add(1, Relaxed);
        loop {
            let serving = self.now_serving.load(Acquire);
            if serving == ticket {
                return TicketGuard { lock: self, ticket };
            }
            wait(&self.now_serving, serving);
        }
    }

    /// How many callers hold or wait for the lock right now
    pub fn queue_len(&self) -> u32 {
        let next = self.next_ticket.load(Relaxed);
        next.wrapping_sub(self.now_serving.load(Relaxed))
    }
}

pub struct TicketGuard<'a> {
    lock: &'a TicketLock,
    ticket: u32,
}

impl TicketGuard<'_> {
    pub fn ticket(&self) -> u32 {
        self.ticket
    }
}

impl Drop for TicketGuard<'_> {
    fn drop(&mut self) {
        self.lock.now_serving.fetch_add(1, Release);
        wake_all(&self.lock.now_serving);
    }
}

#[cfg(test)]
mod test {
    use std::{
        thread::{scope, sleep},
        time::Duration,
    };

    use parking_lot::Mutex;

    use super::*;

    #[test]
    fn test_served_in_draw_order() {
        let lock = TicketLock::new();
        let served = Mutex::new(Vec::new());

        let first = lock.lock();
        scope(|s| {
            for i in 0..5 {
                let lock = &lock;
                let served = &served;
                s.spawn(move || {
                    // stagger the arrivals so the draw order is known
                    sleep(Duration::from_millis(30 * (i + 1)));
                    let guard = lock.lock();
                    served.lock().push((i, guard.ticket()));
                });
            }
            // everybody has drawn by now
            sleep(Duration::from_millis(300));
            assert_eq!(lock.queue_len(), 6);
            drop(first);
        });

        let served = served.into_inner();
        assert_eq!(
            served,
            vec![(0, 1), (1, 2), (2, 3), (3, 4), (4, 5)],
            "tickets must be served in the order they were drawn"
        );
        assert_eq!(lock.queue_len(), 0);
    }

    #[test]
    fn test_counters_wrap() {
        let lock = TicketLock {
            next_ticket: AtomicU32::new(u32::MAX),
            now_serving: AtomicU32::new(u32::MAX),
        };
        drop(lock.lock());
        let guard = lock.lock();
        assert_eq!(guard.ticket(), 0);
    }
}
