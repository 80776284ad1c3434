//! Condition variable.
//!
//! [`Condvar`] is a rendezvous point for threads that already hold a
//! [`Lock`]: `wait` gives up the lock, sleeps until another thread
//! signals, and re-acquires the lock before returning. It carries no
//! value of its own — only the waiter queue.

use alloc::string::String;

use super::lock::Lock;
use super::spinlock::SpinLock;
use super::waitchannel::WaitChannel;
use super::{OutOfMemory, dup_name};
use crate::thread::ThreadHost;

/// A condition variable.
///
/// All threads coordinating through one condition variable must use the
/// same [`Lock`], held across every `wait`, `signal`, and `broadcast`
/// call. The usual discipline applies: check the predicate under the
/// lock, `wait` while it is false, and re-check after waking — wakeups
/// are not 1:1 with signals and may be spurious or reordered.
///
/// # Example
///
/// ```ignore
/// // Consumer:
/// lock.acquire();
/// while !item_ready() {
///     cond.wait(&lock);
/// }
/// take_item();
/// lock.release();
///
/// // Producer:
/// lock.acquire();
/// put_item();
/// cond.signal();
/// lock.release();
/// ```
pub struct Condvar {
    name: String,
    host: &'static dyn ThreadHost,
    inner: SpinLock<WaitChannel>,
}

impl Condvar {
    /// Creates a condition variable with no waiters.
    ///
    /// # Errors
    ///
    /// Fails if duplicating the name exhausts the kernel heap; any
    /// partially built state is released before returning.
    pub fn new(host: &'static dyn ThreadHost, name: &str) -> Result<Self, OutOfMemory> {
        Ok(Self {
            name: dup_name(name)?,
            host,
            inner: SpinLock::new(WaitChannel::new(name, host)?),
        })
    }

    /// Returns the condition variable's diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Releases `lock`, blocks until signaled, and re-acquires `lock`.
    ///
    /// The calling thread must hold `lock`. On return it holds `lock`
    /// again; the awaited predicate must be re-checked in a loop.
    ///
    /// # Panics
    ///
    /// If called from interrupt context, or (through [`Lock::release`])
    /// if the calling thread does not hold `lock`.
    pub fn wait(&self, lock: &Lock) {
        assert!(
            !self.host.in_interrupt(),
            "condvar `{}`: wait from interrupt context",
            self.name
        );

        // Queue first, under our own spin lock, so a signal sent the
        // instant the lock is released cannot be lost. Our spin lock and
        // the lock's are never held at the same time — the two primitives
        // coordinate purely by sequencing.
        let mut wchan = self.inner.lock();
        let waiter = wchan.enqueue();
        drop(wchan);

        lock.release();
        waiter.block();
        lock.acquire();
    }

    /// Wakes at most one thread blocked in [`wait`](Condvar::wait).
    ///
    /// The caller must hold the lock it shares with the waiters. Never
    /// blocks, and never touches that lock's state.
    pub fn signal(&self) {
        self.inner.lock().wake_one();
    }

    /// Wakes every thread blocked in [`wait`](Condvar::wait).
    ///
    /// Same contract as [`signal`](Condvar::signal).
    pub fn broadcast(&self) {
        self.inner.lock().wake_all();
    }
}
