//! Mutual-exclusion lock with ownership tracking.
//!
//! [`Lock`] differs from a [`Semaphore`](super::Semaphore) with an
//! initial count of one in that it knows its owner: re-entrant
//! acquisition and release by a non-owner are contract violations caught
//! immediately instead of becoming silent deadlocks or corruption.

use alloc::string::String;

use super::spinlock::SpinLock;
use super::waitchannel::WaitChannel;
use super::{OutOfMemory, dup_name};
use crate::thread::{AtomicThreadId, ThreadHost};

/// State protected by the lock's spin lock.
struct LockInner {
    held: bool,
    wchan: WaitChannel,
}

/// A sleeping mutual-exclusion lock.
///
/// At most one thread holds the lock at any instant. The holder is
/// recorded so that misuse is caught: acquiring a lock the calling thread
/// already owns, or releasing one it does not, is fatal. Before the
/// threading subsystem is initialized there is no calling-thread
/// identity; the lock still works, with ownership tracking inactive.
///
/// Wakeup order among contending threads is unspecified.
pub struct Lock {
    name: String,
    host: &'static dyn ThreadHost,
    /// Lock-free mirror of the holder, written only under `inner`'s guard.
    owner: AtomicThreadId,
    inner: SpinLock<LockInner>,
}

impl Lock {
    /// Creates an unheld lock.
    ///
    /// # Errors
    ///
    /// Fails if duplicating the name exhausts the kernel heap; any
    /// partially built state is released before returning.
    pub fn new(host: &'static dyn ThreadHost, name: &str) -> Result<Self, OutOfMemory> {
        Ok(Self {
            name: dup_name(name)?,
            host,
            owner: AtomicThreadId::none(),
            inner: SpinLock::new(LockInner {
                held: false,
                wchan: WaitChannel::new(name, host)?,
            }),
        })
    }

    /// Returns the lock's diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Acquires the lock, blocking while another thread holds it.
    ///
    /// # Panics
    ///
    /// If called from interrupt context, or if the calling thread already
    /// owns the lock — re-entrant acquisition is not supported, and the
    /// check happens before any attempt to block.
    pub fn acquire(&self) {
        assert!(
            !self.host.in_interrupt(),
            "lock `{}`: acquire from interrupt context",
            self.name
        );

        if let Some(current) = self.host.current() {
            assert!(
                self.owner.load() != Some(current),
                "lock `{}`: re-entrant acquire by thread {}",
                self.name,
                current
            );
        }

        let mut inner = self.inner.lock();
        while inner.held {
            let waiter = inner.wchan.enqueue();
            drop(inner);
            waiter.block();
            // The lock may have been taken again between our wakeup and
            // this point; re-check rather than assume.
            inner = self.inner.lock();
        }
        inner.held = true;
        self.owner.store(self.host.current());
    }

    /// Releases the lock and wakes at most one waiting thread.
    ///
    /// Never blocks.
    ///
    /// # Panics
    ///
    /// If the lock is not held, or if ownership tracking is active and
    /// the calling thread is not the owner.
    pub fn release(&self) {
        let mut inner = self.inner.lock();
        assert!(
            inner.held,
            "lock `{}`: release of an unheld lock",
            self.name
        );
        if let Some(current) = self.host.current() {
            assert!(
                self.owner.load() == Some(current),
                "lock `{}`: release by a thread that does not own it",
                self.name
            );
        }
        inner.held = false;
        self.owner.store(None);
        inner.wchan.wake_one();
    }

    /// Returns `true` if the calling thread owns the lock.
    ///
    /// Lock-free and intended for assertions ("I must hold this lock
    /// here"). Before the threading subsystem is initialized there is no
    /// calling-thread identity and the answer is `false`.
    pub fn held_by_current(&self) -> bool {
        match self.host.current() {
            Some(current) => self.owner.load() == Some(current),
            None => false,
        }
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        let inner = self.inner.lock();
        assert!(!inner.held, "lock `{}` destroyed while held", self.name);
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;
    use crate::sync::test_host;

    fn new_lock(name: &str) -> Lock {
        Lock::new(test_host::host(), name).unwrap()
    }

    fn leaked(name: &str) -> &'static Lock {
        Box::leak(Box::new(new_lock(name)))
    }

    #[test]
    fn acquire_then_release() {
        test_host::attach();
        let lock = new_lock("basic");
        assert!(!lock.held_by_current());
        lock.acquire();
        assert!(lock.held_by_current());
        lock.release();
        assert!(!lock.held_by_current());
    }

    #[test]
    fn works_before_threading_is_initialized() {
        // This test thread never attaches: no current-thread identity,
        // ownership tracking inactive.
        let lock = new_lock("early-boot");
        lock.acquire();
        assert!(!lock.held_by_current());
        lock.release();
    }

    #[test]
    fn held_by_current_is_per_thread() {
        test_host::attach();
        let lock = Arc::new(new_lock("mine"));
        lock.acquire();

        let other = {
            let lock = Arc::clone(&lock);
            std::thread::spawn(move || {
                test_host::attach();
                lock.held_by_current()
            })
        };
        assert!(!other.join().unwrap());
        assert!(lock.held_by_current());
        lock.release();
    }

    #[test]
    fn contender_blocks_until_release() {
        test_host::attach();
        let lock = Arc::new(new_lock("gate"));
        let (tx, rx) = mpsc::channel();

        lock.acquire();
        let contender = {
            let lock = Arc::clone(&lock);
            std::thread::spawn(move || {
                test_host::attach();
                lock.acquire();
                tx.send(()).unwrap();
                lock.release();
            })
        };

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        lock.release();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        contender.join().unwrap();
    }

    #[test]
    fn excludes_concurrent_critical_sections() {
        let lock = Arc::new(new_lock("counter"));
        let counter = Arc::new(AtomicU64::new(0));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    test_host::attach();
                    for _ in 0..1000 {
                        lock.acquire();
                        // Split read-modify-write: only mutual exclusion
                        // keeps the final count exact.
                        let v = counter.load(Ordering::Relaxed);
                        counter.store(v + 1, Ordering::Relaxed);
                        lock.release();
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(counter.load(Ordering::Relaxed), 4000);
    }

    #[test]
    #[should_panic(expected = "re-entrant acquire")]
    fn reentrant_acquire_panics() {
        test_host::attach();
        let lock = leaked("recursive");
        lock.acquire();
        lock.acquire();
    }

    #[test]
    #[should_panic(expected = "release by a thread that does not own it")]
    fn release_by_non_owner_panics() {
        test_host::attach();
        let lock = leaked("stolen");

        let owner = std::thread::spawn(move || {
            test_host::attach();
            lock.acquire();
        });
        owner.join().unwrap();

        lock.release();
    }

    #[test]
    #[should_panic(expected = "release of an unheld lock")]
    fn release_unheld_panics() {
        let lock = new_lock("idle");
        lock.release();
    }

    #[test]
    #[should_panic(expected = "acquire from interrupt context")]
    fn acquire_in_interrupt_context_panics() {
        test_host::set_interrupt(true);
        let lock = new_lock("irq");
        lock.acquire();
    }

    #[test]
    #[should_panic(expected = "destroyed while held")]
    fn drop_while_held_panics() {
        test_host::attach();
        let lock = new_lock("leak-check");
        lock.acquire();
        drop(lock);
    }
}
