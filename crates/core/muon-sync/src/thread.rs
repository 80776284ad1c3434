//! Thread identity and the injected scheduler interface.
//!
//! The synchronization core never schedules anything itself. Everything it
//! needs from the thread system — who is running, whether the current
//! context may block, and the ability to block and unblock a thread — is
//! expressed by [`ThreadHost`] and injected at primitive creation, so the
//! core stays testable without a kernel.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

/// Unique thread identifier.
///
/// Compared by value. `u64::MAX` is reserved as [`AtomicThreadId`]'s empty
/// encoding and must not be issued by a [`ThreadHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ThreadId(u64);

impl ThreadId {
    /// Creates a new `ThreadId`.
    pub const fn new(val: u64) -> Self {
        Self(val)
    }

    /// Returns the raw `u64` value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reserved encoding for "no thread".
const NONE: u64 = u64::MAX;

/// An atomically readable `Option<ThreadId>`.
///
/// Used for lock ownership: writers update the cell only while holding the
/// owning primitive's spin lock, while readers
/// ([`Lock::held_by_current`](crate::sync::Lock::held_by_current)) load it
/// without taking any lock.
pub struct AtomicThreadId(AtomicU64);

impl AtomicThreadId {
    /// Creates an empty cell.
    pub const fn none() -> Self {
        Self(AtomicU64::new(NONE))
    }

    /// Loads the stored thread id, if any.
    pub fn load(&self) -> Option<ThreadId> {
        match self.0.load(Ordering::Acquire) {
            NONE => None,
            raw => Some(ThreadId(raw)),
        }
    }

    /// Stores a new thread id (or clears the cell with `None`).
    pub fn store(&self, thread: Option<ThreadId>) {
        let raw = match thread {
            Some(t) => t.0,
            None => NONE,
        };
        self.0.store(raw, Ordering::Release);
    }
}

/// The scheduler surface consumed by the synchronization primitives.
///
/// Implemented by the kernel's thread system; the test suite carries a
/// std-thread-backed double. All methods may be called concurrently from
/// any thread.
///
/// # Blocking contract
///
/// [`block_current`] and [`make_runnable`] carry wakeup-token semantics:
/// if `make_runnable(t)` is delivered while `t` is not blocked, `t`'s next
/// `block_current` returns immediately instead of sleeping, and
/// `block_current` may also return spuriously. Callers therefore re-check
/// their wait condition around every block; the wait channel does this for
/// the primitives built on it.
///
/// [`block_current`]: ThreadHost::block_current
/// [`make_runnable`]: ThreadHost::make_runnable
pub trait ThreadHost: Sync {
    /// Returns the identity of the calling thread, or `None` before the
    /// threading subsystem is initialized.
    fn current(&self) -> Option<ThreadId>;

    /// Returns `true` if the calling context is an interrupt handler or
    /// any other context that must not block.
    fn in_interrupt(&self) -> bool;

    /// Blocks the calling thread until a matching [`make_runnable`],
    /// subject to the token semantics above.
    ///
    /// [`make_runnable`]: ThreadHost::make_runnable
    fn block_current(&self);

    /// Makes a blocked thread runnable again.
    ///
    /// Never blocks; safe to call while holding a spin lock.
    fn make_runnable(&self, thread: ThreadId);
}
