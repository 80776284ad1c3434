//! Loom compatibility shim.
//!
//! When compiled with `cfg(loom)`, re-exports loom's atomic types so the
//! spin lock can be model-checked under loom's deterministic scheduler;
//! otherwise re-exports `core::sync::atomic`. Cell accesses are not
//! shimmed — the spin lock guard hands out plain references, so the loom
//! tests assert mutual exclusion through tracked atomics instead.

#[cfg(loom)]
pub(crate) use loom::sync::atomic::{AtomicBool, Ordering};

#[cfg(not(loom))]
pub(crate) use core::sync::atomic::{AtomicBool, Ordering};
