// crates/server-process-tree/src/lib.rs
//! Best-effort termination of a worker process and everything it spawned.
//!
//! Callers hold a [`WorkerHandle`] and a [`Terminate`] strategy picked once
//! at startup by [`default_terminator`]. Termination never reports failure:
//! the returned future resolves when the attempt is over, killed or not.

pub mod handle;
pub mod terminate;
pub mod tree;

pub use handle::{ExitNotifier, WorkerHandle};
pub use terminate::{default_terminator, ProcessTreeTerminator, Terminate, DEFAULT_KILL_GRACE};

#[cfg(unix)]
pub use terminate::ProcessGroupTerminator;
