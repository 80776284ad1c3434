//! Thread synchronization primitives for the Muon kernel.
//!
//! This crate contains the host-testable synchronization core extracted
//! from `muon-kernel`: counting semaphores, ownership-tracking locks, and
//! condition variables, layered on a spin lock and a wait channel. The
//! scheduler surface the primitives consume (thread identity,
//! interrupt-context queries, block/unblock) is injected through
//! [`thread::ThreadHost`].
//!
//! By living outside the kernel crate, these types can be tested with
//! `cargo test` and loom on the host without a kernel target.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod log;
pub mod sync;
pub mod thread;
