//! Interception adapter
//!
//! The seam between the privileged interception mechanism and the
//! engine. The mechanism itself (syscall probe, LSM hook, eBPF
//! program, or a userland ptrace shim) lives outside this crate; it
//! calls [`InterceptAdapter::deliver`] with the pid it observed and
//! the 32-bit argument the program passed to `emit`.
//!
//! # Delivery contract
//!
//! Delivery is synchronous with respect to the program's progress past
//! the marker: the interception mechanism must keep the emitting
//! process suspended until `deliver` returns. Without this, the
//! automaton could race behind the program and the process could
//! execute library calls before its violation becomes observable.
//!
//! Within one process, events arrive in program order and are further
//! serialised by the engine's per-policy lock; events from different
//! processes are delivered in parallel and need no ordering.

use crate::{
    engine::{Engine, Verdict},
    kill::ProcessKiller,
};

/// One marker emission as seen at the interception point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerEvent {
    /// The emitting process, as identified in the privileged context.
    pub pid: u32,
    /// The 32-bit argument of the `emit` call.
    pub marker: i32,
}

/// Forwards marker events to the enforcement engine.
pub struct InterceptAdapter<'e, K: ProcessKiller> {
    engine: &'e Engine<K>,
}

impl<'e, K: ProcessKiller> InterceptAdapter<'e, K> {
    /// Create an adapter delivering into `engine`.
    pub fn new(engine: &'e Engine<K>) -> Self {
        Self { engine }
    }

    /// Deliver one event. Blocks until the automaton has advanced (or
    /// the violation is handled); the caller resumes the process only
    /// after this returns.
    pub fn deliver(&self, event: MarkerEvent) -> Verdict {
        self.engine.observe(event.pid, event.marker)
    }
}
