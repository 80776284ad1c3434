//! Std-thread-backed [`ThreadHost`] for unit tests.
//!
//! Threads that participate in blocking tests call [`attach`] once; the
//! host then knows their identity and parks/unparks them with
//! `std::thread`'s token semantics, which match the [`ThreadHost`]
//! blocking contract exactly. A thread that never attaches has no
//! current-thread identity, which is how the pre-threading-initialization
//! paths are exercised. [`set_interrupt`] flips a per-thread flag for the
//! interrupt-context assertions.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::thread::Thread;

use crate::thread::{ThreadHost, ThreadId};

thread_local! {
    static CURRENT: Cell<Option<ThreadId>> = const { Cell::new(None) };
    static IN_INTERRUPT: Cell<bool> = const { Cell::new(false) };
}

pub(crate) struct TestHost {
    next_id: AtomicU64,
    threads: Mutex<HashMap<u64, Thread>>,
}

impl ThreadHost for TestHost {
    fn current(&self) -> Option<ThreadId> {
        CURRENT.with(Cell::get)
    }

    fn in_interrupt(&self) -> bool {
        IN_INTERRUPT.with(Cell::get)
    }

    fn block_current(&self) {
        std::thread::park();
    }

    fn make_runnable(&self, thread: ThreadId) {
        if let Some(handle) = self.threads.lock().unwrap().get(&thread.as_u64()) {
            handle.unpark();
        }
    }
}

/// Returns the process-wide test host.
pub(crate) fn host() -> &'static TestHost {
    static HOST: OnceLock<TestHost> = OnceLock::new();
    HOST.get_or_init(|| TestHost {
        next_id: AtomicU64::new(0),
        threads: Mutex::new(HashMap::new()),
    })
}

/// Registers the calling thread with the host and returns its id.
pub(crate) fn attach() -> ThreadId {
    let host = host();
    let id = ThreadId::new(host.next_id.fetch_add(1, Ordering::Relaxed));
    host.threads
        .lock()
        .unwrap()
        .insert(id.as_u64(), std::thread::current());
    CURRENT.with(|c| c.set(Some(id)));
    id
}

/// Marks the calling thread as being in (or out of) interrupt context.
pub(crate) fn set_interrupt(on: bool) {
    IN_INTERRUPT.with(|c| c.set(on));
}

#[cfg(not(loom))]
mod tests {
    use super::*;

    #[test]
    fn unattached_thread_has_no_identity() {
        assert_eq!(host().current(), None);
    }

    #[test]
    fn attach_assigns_distinct_ids() {
        let mine = attach();
        assert_eq!(host().current(), Some(mine));
        let other = std::thread::spawn(|| attach()).join().unwrap();
        assert_ne!(mine, other);
    }

    #[test]
    fn make_runnable_unparks() {
        let id = attach();
        // Token semantics: an unpark delivered before the park makes the
        // next park return immediately.
        host().make_runnable(id);
        host().block_current();
    }
}
