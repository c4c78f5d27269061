//! Run-time enforcement of library-call policies
//!
//! This crate is the privileged half of the sandbox: it holds one
//! automaton per sandboxed process and advances it on every marker the
//! process emits. A process whose marker sequence is accepted by no
//! automaton path is killed.
//!
//! # Overview
//!
//! - [`Engine`]: the pid → policy table. Policies arrive as install
//!   blobs (see the `policy` crate) or decoded requests; each marker
//!   observation steps the process's NFA frontier in place, and an
//!   empty frontier delivers `SIGKILL` through a [`ProcessKiller`].
//! - [`InterceptAdapter`]: the seam towards the interception
//!   mechanism (syscall probe, LSM hook, eBPF program, or a ptrace
//!   shim). Whatever the mechanism, it must keep the emitting process
//!   suspended until delivery returns; otherwise the program could
//!   race past the automaton and execute library calls before a
//!   violation becomes observable.
//!
//! # Concurrency
//!
//! The table is read-mostly: observations take the table lock shared
//! and the per-policy lock exclusive, so processes under different
//! policies advance in parallel while events of one process are
//! totally ordered. Install and uninstall take the table lock
//! exclusively.

mod adapter;
mod engine;
mod error;
mod kill;

pub use adapter::{InterceptAdapter, MarkerEvent};
pub use engine::{Engine, Verdict, MAX_EDGES};
pub use error::{EngineError, EngineResult};
pub use kill::{ProcessKiller, SigKiller};
