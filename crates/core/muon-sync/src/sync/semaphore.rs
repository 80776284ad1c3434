//! Counting semaphore.
//!
//! [`Semaphore`] guards a finite pool of identical units. `acquire` takes
//! one unit, blocking the calling thread while none are available;
//! `release` puts one back and wakes at most one waiting thread.

use alloc::string::String;

use super::spinlock::SpinLock;
use super::waitchannel::WaitChannel;
use super::{OutOfMemory, dup_name};
use crate::thread::ThreadHost;

/// State protected by the semaphore's spin lock.
struct SemInner {
    count: u32,
    wchan: WaitChannel,
}

/// A counting semaphore.
///
/// The count never goes below zero: an `acquire` against a zero count
/// sleeps until a `release` arrives. Wakeup order among multiple sleepers
/// is unspecified — a freshly woken thread re-checks the count and may
/// find a later arrival already took the unit.
///
/// # Example
///
/// ```ignore
/// let slots = Semaphore::new(host, "dma-slots", 4)?;
///
/// slots.acquire(); // may block until a slot frees up
/// /* ... use one of the four DMA slots ... */
/// slots.release();
/// ```
pub struct Semaphore {
    name: String,
    host: &'static dyn ThreadHost,
    inner: SpinLock<SemInner>,
}

impl Semaphore {
    /// Creates a semaphore holding `initial_count` units.
    ///
    /// # Errors
    ///
    /// Fails if duplicating the name exhausts the kernel heap; any
    /// partially built state is released before returning.
    pub fn new(
        host: &'static dyn ThreadHost,
        name: &str,
        initial_count: u32,
    ) -> Result<Self, OutOfMemory> {
        Ok(Self {
            name: dup_name(name)?,
            host,
            inner: SpinLock::new(SemInner {
                count: initial_count,
                wchan: WaitChannel::new(name, host)?,
            }),
        })
    }

    /// Returns the semaphore's diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of currently available units.
    pub fn count(&self) -> u32 {
        self.inner.lock().count
    }

    /// Acquires one unit, blocking while none are available.
    ///
    /// On return, the count was strictly positive at the moment of the
    /// decrement and is now exactly one less.
    ///
    /// # Panics
    ///
    /// If called from interrupt context. Checked even when the acquire
    /// would complete without blocking.
    pub fn acquire(&self) {
        assert!(
            !self.host.in_interrupt(),
            "semaphore `{}`: acquire from interrupt context",
            self.name
        );

        let mut inner = self.inner.lock();
        while inner.count == 0 {
            // Queue under the lock, then sleep with the lock dropped.
            let waiter = inner.wchan.enqueue();
            drop(inner);
            waiter.block();
            inner = self.inner.lock();
        }
        assert!(
            inner.count > 0,
            "semaphore `{}`: count underflow",
            self.name
        );
        inner.count -= 1;
    }

    /// Releases one unit and wakes at most one waiting thread.
    ///
    /// Never blocks.
    ///
    /// # Panics
    ///
    /// If the count would overflow.
    pub fn release(&self) {
        let mut inner = self.inner.lock();
        inner.count = match inner.count.checked_add(1) {
            Some(count) => count,
            None => panic!("semaphore `{}`: count overflow", self.name),
        };
        inner.wchan.wake_one();
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;
    use crate::sync::test_host;

    fn new_sem(name: &str, count: u32) -> Semaphore {
        Semaphore::new(test_host::host(), name, count).unwrap()
    }

    #[test]
    fn acquire_decrements() {
        let sem = new_sem("s", 2);
        sem.acquire();
        assert_eq!(sem.count(), 1);
        sem.acquire();
        assert_eq!(sem.count(), 0);
    }

    #[test]
    fn release_increments() {
        let sem = new_sem("s", 0);
        sem.release();
        assert_eq!(sem.count(), 1);
    }

    #[test]
    fn name_is_kept() {
        let sem = new_sem("net-rx", 1);
        assert_eq!(sem.name(), "net-rx");
    }

    #[test]
    fn count_tracks_acquire_release_history() {
        // count == c0 - (acquires - releases) at every observation point.
        let sem = new_sem("s", 3);
        sem.acquire();
        sem.acquire();
        assert_eq!(sem.count(), 1);
        sem.release();
        assert_eq!(sem.count(), 2);
        sem.acquire();
        sem.acquire();
        assert_eq!(sem.count(), 0);
        sem.release();
        sem.release();
        sem.release();
        assert_eq!(sem.count(), 3);
    }

    #[test]
    fn zero_count_blocks_until_release() {
        let sem = Arc::new(new_sem("gate", 0));
        let (tx, rx) = mpsc::channel();

        let worker = {
            let sem = Arc::clone(&sem);
            std::thread::spawn(move || {
                test_host::attach();
                sem.acquire();
                tx.send(()).unwrap();
            })
        };

        // Nothing released yet: the worker must still be blocked.
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        sem.release();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        worker.join().unwrap();
        assert_eq!(sem.count(), 0);
    }

    #[test]
    fn one_release_wakes_at_most_one() {
        let sem = Arc::new(new_sem("gate", 0));
        let (tx, rx) = mpsc::channel();

        let workers: Vec<_> = (0..2)
            .map(|_| {
                let sem = Arc::clone(&sem);
                let tx = tx.clone();
                std::thread::spawn(move || {
                    test_host::attach();
                    sem.acquire();
                    tx.send(()).unwrap();
                })
            })
            .collect();

        // Let both workers reach the sleep.
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        sem.release();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        // Exactly one woke; the other is still blocked.
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        sem.release();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        for worker in workers {
            worker.join().unwrap();
        }
    }

    #[test]
    fn semaphore_as_mutex() {
        // Initial count of one makes the semaphore a mutual-exclusion
        // guard: A takes the unit, B blocks, A's release hands it to B.
        let sem = Arc::new(new_sem("mutex", 1));
        let (tx, rx) = mpsc::channel();

        sem.acquire();
        assert_eq!(sem.count(), 0);

        let other = {
            let sem = Arc::clone(&sem);
            std::thread::spawn(move || {
                test_host::attach();
                sem.acquire();
                tx.send(()).unwrap();
            })
        };

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        sem.release();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        other.join().unwrap();
        assert_eq!(sem.count(), 0);
    }

    #[test]
    #[should_panic(expected = "acquire from interrupt context")]
    fn acquire_in_interrupt_context_panics() {
        test_host::set_interrupt(true);
        let sem = new_sem("irq", 1);
        sem.acquire();
    }
}
