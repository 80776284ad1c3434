//! Wait channel: a named queue of blocked threads.
//!
//! A [`WaitChannel`] belongs to exactly one higher-level primitive and
//! lives inside that primitive's [`SpinLock`](super::SpinLock), so every
//! queue operation takes `&mut self` — holding the protecting guard is
//! enforced by the type system rather than by convention.
//!
//! Sleeping is split in two: [`WaitChannel::enqueue`] registers the
//! calling thread under the guard and returns a [`Waiter`]; the caller
//! drops the guard and calls [`Waiter::block`]. A wakeup delivered in the
//! window between the two is absorbed by the entry's woken flag, so no
//! wakeup is lost and no spin lock is ever held across a sleep.

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};

use super::{OutOfMemory, dup_name};
use crate::thread::{ThreadHost, ThreadId};

/// One blocked (or about-to-block) thread.
struct WaitEntry {
    thread: ThreadId,
    woken: AtomicBool,
}

/// A named queue of blocked threads.
///
/// Wakeup order among multiple waiters is unspecified: a thread woken
/// from a channel re-checks the condition it slept on and may find a
/// later arrival already took it.
pub struct WaitChannel {
    name: String,
    host: &'static dyn ThreadHost,
    queue: VecDeque<Arc<WaitEntry>>,
}

impl WaitChannel {
    /// Creates an empty wait channel.
    ///
    /// # Errors
    ///
    /// Fails if duplicating `name` exhausts the kernel heap.
    pub fn new(name: &str, host: &'static dyn ThreadHost) -> Result<Self, OutOfMemory> {
        Ok(Self {
            name: dup_name(name)?,
            host,
            queue: VecDeque::new(),
        })
    }

    /// Returns the channel's diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if no thread is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queues the calling thread and returns the handle it must block on.
    ///
    /// Called while holding the protecting spin lock; the caller drops the
    /// guard before calling [`Waiter::block`]. Each call creates a fresh
    /// single-use entry, woken exactly once by whichever waker dequeues it.
    ///
    /// # Panics
    ///
    /// If no current thread exists — blocking before the threading
    /// subsystem is initialized is a contract violation.
    pub fn enqueue(&mut self) -> Waiter {
        let Some(thread) = self.host.current() else {
            panic!("wait channel `{}`: enqueue with no current thread", self.name);
        };
        let entry = Arc::new(WaitEntry {
            thread,
            woken: AtomicBool::new(false),
        });
        self.queue.push_back(Arc::clone(&entry));
        Waiter {
            entry,
            host: self.host,
        }
    }

    /// Wakes one queued thread, if any. Never blocks.
    ///
    /// Called while holding the protecting spin lock, which is what makes
    /// the dequeue atomic with respect to a concurrent sleeper's
    /// check-then-enqueue.
    pub fn wake_one(&mut self) {
        if let Some(entry) = self.queue.pop_front() {
            crate::ktrace!("wchan `{}`: wake thread {}", self.name, entry.thread);
            entry.woken.store(true, Ordering::Release);
            self.host.make_runnable(entry.thread);
        }
    }

    /// Wakes every queued thread. Never blocks.
    pub fn wake_all(&mut self) {
        let drained = core::mem::take(&mut self.queue);
        if drained.is_empty() {
            return;
        }
        crate::ktrace!("wchan `{}`: wake all ({} threads)", self.name, drained.len());
        for entry in drained {
            entry.woken.store(true, Ordering::Release);
            self.host.make_runnable(entry.thread);
        }
    }
}

impl Drop for WaitChannel {
    fn drop(&mut self) {
        assert!(
            self.queue.is_empty(),
            "wait channel `{}` destroyed with threads waiting",
            self.name
        );
    }
}

/// Handle a queued thread blocks on; single-use.
pub struct Waiter {
    entry: Arc<WaitEntry>,
    host: &'static dyn ThreadHost,
}

impl Waiter {
    /// Blocks the calling thread until its entry is woken.
    ///
    /// Must be called with no spin lock held. Re-checks the entry's woken
    /// flag around every park, absorbing both spurious unblocks and
    /// wakeups delivered before the park.
    pub fn block(self) {
        while !self.entry.woken.load(Ordering::Acquire) {
            self.host.block_current();
        }
    }
}
