//! Enforcement engine
//!
//! A process-wide table from pid to installed policy, advanced on
//! every observed marker. The table is owned by an explicit [`Engine`]
//! value rather than a global: embedders create one at startup, hand
//! out references, and drop it on teardown.

use std::{
    collections::HashMap,
    sync::{Mutex, RwLock},
};

use automaton::{epsilon_closure, initial_frontier, step, Frontier, IdMode, Transition};
use policy::InstallRequest;
use tracing::{error, info};

use crate::{
    error::{EngineError, EngineResult},
    kill::{ProcessKiller, SigKiller},
};

/// Sanity cap on the number of edges in one installed policy.
pub const MAX_EDGES: usize = 1 << 20;

/// Outcome of one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No policy installed for this pid; the process is unsandboxed.
    NoPolicy,
    /// The automaton advanced; `states` nodes remain active.
    Active { states: usize },
    /// The frontier drained; the process was killed.
    Violation,
}

/// Per-process enforcement state.
///
/// Exclusively owns its copy of the transitions and both bitsets. The
/// scratch frontier is sized at install time so observations never
/// allocate.
struct ProcessPolicy {
    pid: u32,
    num_nodes: u32,
    id_mode: IdMode,
    transitions: Vec<Transition>,
    frontier: Frontier,
    scratch: Frontier,
}

impl ProcessPolicy {
    fn new(request: InstallRequest) -> Self {
        let num_nodes = request.num_nodes as usize;
        let frontier = initial_frontier(&request.transitions, num_nodes);
        Self {
            pid: request.pid,
            num_nodes: request.num_nodes,
            id_mode: request.id_mode,
            transitions: request.transitions,
            frontier,
            scratch: Frontier::new(num_nodes),
        }
    }

    /// Advance on one observed marker; true iff the frontier drained.
    fn observe(&mut self, observed: i32) -> bool {
        step(
            &self.transitions,
            &mut self.frontier,
            &mut self.scratch,
            observed,
        );
        self.frontier.is_empty()
    }
}

/// The pid → policy table.
///
/// Generic over the killer so tests can record instead of signalling;
/// production embeddings use [`Engine::new`] and get [`SigKiller`].
pub struct Engine<K: ProcessKiller = SigKiller> {
    table: RwLock<HashMap<u32, Mutex<ProcessPolicy>>>,
    killer: K,
}

impl Engine<SigKiller> {
    /// Create an engine that kills violators with `SIGKILL`.
    pub fn new() -> Self {
        Self::with_killer(SigKiller)
    }
}

impl Default for Engine<SigKiller> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ProcessKiller> Engine<K> {
    /// Create an engine with a custom killer.
    pub fn with_killer(killer: K) -> Self {
        Self {
            table: RwLock::new(HashMap::new()),
            killer,
        }
    }

    /// Install a policy, atomically replacing any prior policy for the
    /// same pid.
    ///
    /// The initial frontier activates every node with no incoming
    /// consuming edge (node 0 when there is none), ε-closed.
    ///
    /// # Errors
    ///
    /// Refused when the automaton has no nodes, exceeds the edge cap,
    /// or references out-of-range nodes. A refused install leaves any
    /// previously installed policy for the pid intact.
    pub fn install(&self, request: InstallRequest) -> EngineResult<()> {
        if request.num_nodes == 0 {
            return Err(EngineError::EmptyAutomaton);
        }
        if request.transitions.len() > MAX_EDGES {
            return Err(EngineError::TooManyEdges {
                count: request.transitions.len(),
                max: MAX_EDGES,
            });
        }
        for (index, t) in request.transitions.iter().enumerate() {
            if t.src >= request.num_nodes || t.dst >= request.num_nodes {
                return Err(EngineError::EdgeOutOfRange {
                    index,
                    src: t.src,
                    dst: t.dst,
                    num_nodes: request.num_nodes,
                });
            }
        }

        let policy = ProcessPolicy::new(request);
        info!(
            pid = policy.pid,
            nodes = policy.num_nodes,
            edges = policy.transitions.len(),
            mode = %policy.id_mode,
            "loaded policy"
        );

        let mut table = self.table.write().expect("policy table poisoned");
        table.insert(policy.pid, Mutex::new(policy));
        Ok(())
    }

    /// Decode an install blob and install it.
    pub fn install_blob(&self, bytes: &[u8]) -> EngineResult<()> {
        let request = policy::decode(bytes)?;
        self.install(request)
    }

    /// Advance the automaton of `pid` on an observed marker.
    ///
    /// Unknown pids are a silent no-op (the process is unsandboxed).
    /// When the frontier drains, the process is killed and the policy
    /// stays installed, so every further observation keeps failing
    /// until the entry is removed.
    pub fn observe(&self, pid: u32, observed: i32) -> Verdict {
        let table = self.table.read().expect("policy table poisoned");
        let Some(entry) = table.get(&pid) else {
            return Verdict::NoPolicy;
        };

        let mut policy = entry.lock().expect("process policy poisoned");
        if policy.observe(observed) {
            error!(pid, observed, "policy violation, killing process");
            self.killer.kill(pid);
            Verdict::Violation
        } else {
            Verdict::Active {
                states: policy.frontier.count(),
            }
        }
    }

    /// Remove the policy for `pid`. Returns whether one was installed.
    pub fn uninstall(&self, pid: u32) -> bool {
        let mut table = self.table.write().expect("policy table poisoned");
        table.remove(&pid).is_some()
    }

    /// Whether a policy is installed for `pid`.
    pub fn is_sandboxed(&self, pid: u32) -> bool {
        let table = self.table.read().expect("policy table poisoned");
        table.contains_key(&pid)
    }

    /// Number of active states for `pid`, for inspection and tests.
    pub fn active_states(&self, pid: u32) -> Option<usize> {
        let table = self.table.read().expect("policy table poisoned");
        let entry = table.get(&pid)?;
        let policy = entry.lock().expect("process policy poisoned");

        debug_assert!({
            // The frontier must be ε-closed after every install/step
            let mut closed = policy.frontier.clone();
            epsilon_closure(&policy.transitions, &mut closed);
            closed == policy.frontier
        });
        Some(policy.frontier.count())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };

    use automaton::{IdMode, Transition};
    use policy::InstallRequest;

    use super::{Engine, Verdict, MAX_EDGES};
    use crate::{error::EngineError, kill::ProcessKiller};

    /// Records kills instead of delivering signals.
    #[derive(Default)]
    pub(crate) struct RecordingKiller {
        pub killed: Mutex<Vec<u32>>,
        pub count: AtomicUsize,
    }

    impl ProcessKiller for Arc<RecordingKiller> {
        fn kill(&self, pid: u32) {
            self.killed.lock().unwrap().push(pid);
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub(crate) fn test_engine() -> (Engine<Arc<RecordingKiller>>, Arc<RecordingKiller>) {
        let killer = Arc::new(RecordingKiller::default());
        (Engine::with_killer(killer.clone()), killer)
    }

    fn call(src: u32, dst: u32, match_id: i32) -> Transition {
        Transition {
            src,
            dst,
            match_id,
            epsilon: false,
        }
    }

    fn eps(src: u32, dst: u32) -> Transition {
        Transition {
            src,
            dst,
            match_id: -1,
            epsilon: true,
        }
    }

    fn request(pid: u32, num_nodes: u32, transitions: Vec<Transition>) -> InstallRequest {
        InstallRequest {
            pid,
            num_nodes,
            id_mode: IdMode::Dummy,
            transitions,
        }
    }

    /// Linear chain: open(0) -> read(1) -> close(2), dummy ids 0,1,2.
    fn linear_request(pid: u32) -> InstallRequest {
        request(pid, 3, vec![call(0, 1, 0), call(1, 2, 1)])
    }

    #[test]
    fn test_linear_chain_consumes_site_ids() {
        let (engine, killer) = test_engine();
        engine.install(linear_request(10)).unwrap();

        assert_eq!(engine.active_states(10), Some(1));
        assert_eq!(engine.observe(10, 0), Verdict::Active { states: 1 });
        assert_eq!(engine.observe(10, 1), Verdict::Active { states: 1 });

        // The final site has no outgoing consuming edge: its own
        // marker drains the frontier.
        assert_eq!(engine.observe(10, 2), Verdict::Violation);
        assert_eq!(*killer.killed.lock().unwrap(), vec![10]);
    }

    #[test]
    fn test_out_of_order_marker_violates() {
        let (engine, killer) = test_engine();
        engine.install(linear_request(11)).unwrap();

        assert_eq!(engine.observe(11, 1), Verdict::Violation);
        assert_eq!(*killer.killed.lock().unwrap(), vec![11]);
    }

    #[test]
    fn test_unknown_marker_violates() {
        let (engine, killer) = test_engine();
        engine.install(request(12, 1, vec![])).unwrap();

        assert_eq!(engine.observe(12, 99), Verdict::Violation);
        assert_eq!(killer.count.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_policy_is_silent_noop() {
        let (engine, killer) = test_engine();

        assert_eq!(engine.observe(999, 0), Verdict::NoPolicy);
        assert!(killer.killed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_epsilon_branch_closure_in_start_set() {
        // open(0) with ε edges to read(1) and write(2): all three are
        // starts (no consuming in-edges anywhere), already ε-closed.
        let (engine, _killer) = test_engine();
        engine
            .install(request(13, 3, vec![eps(0, 1), eps(0, 2)]))
            .unwrap();

        assert_eq!(engine.active_states(13), Some(3));
    }

    #[test]
    fn test_step_applies_closure() {
        // 0 --m0--> 1 --ε--> 2: observing 0 activates 1 and 2.
        let (engine, _killer) = test_engine();
        engine
            .install(request(14, 3, vec![call(0, 1, 0), eps(1, 2)]))
            .unwrap();

        assert_eq!(engine.observe(14, 0), Verdict::Active { states: 2 });
    }

    #[test]
    fn test_policy_stays_installed_after_violation() {
        let (engine, killer) = test_engine();
        engine.install(linear_request(15)).unwrap();

        assert_eq!(engine.observe(15, 7), Verdict::Violation);
        assert!(engine.is_sandboxed(15));

        // Still failing: the empty frontier is terminal
        assert_eq!(engine.observe(15, 0), Verdict::Violation);
        assert_eq!(killer.count.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn test_replace_policy_resets_frontier() {
        let (engine, _killer) = test_engine();

        // Policy A accepts marker 0 first
        engine.install(request(16, 2, vec![call(0, 1, 0)])).unwrap();
        // Policy B accepts marker 5 first
        engine.install(request(16, 2, vec![call(0, 1, 5)])).unwrap();

        // A sequence accepted only by A now violates
        assert_eq!(engine.observe(16, 0), Verdict::Violation);
    }

    #[test]
    fn test_replace_policy_after_partial_progress() {
        let (engine, _killer) = test_engine();
        engine.install(linear_request(17)).unwrap();
        assert_eq!(engine.observe(17, 0), Verdict::Active { states: 1 });

        // Reinstalling the same automaton rewinds to the start set
        engine.install(linear_request(17)).unwrap();
        assert_eq!(engine.observe(17, 0), Verdict::Active { states: 1 });
    }

    #[test]
    fn test_uninstall_removes_policy() {
        let (engine, killer) = test_engine();
        engine.install(linear_request(18)).unwrap();

        assert!(engine.uninstall(18));
        assert!(!engine.uninstall(18));
        assert_eq!(engine.observe(18, 99), Verdict::NoPolicy);
        assert!(killer.killed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_install_rejects_zero_nodes() {
        let (engine, _killer) = test_engine();
        let result = engine.install(request(19, 0, vec![]));
        assert!(matches!(result, Err(EngineError::EmptyAutomaton)));
    }

    #[test]
    fn test_install_rejects_edge_out_of_range() {
        let (engine, _killer) = test_engine();
        let result = engine.install(request(20, 2, vec![call(0, 2, 0)]));
        assert!(matches!(
            result,
            Err(EngineError::EdgeOutOfRange { index: 0, dst: 2, .. })
        ));
    }

    #[test]
    fn test_install_rejects_too_many_edges() {
        let (engine, _killer) = test_engine();
        let transitions = vec![call(0, 0, 0); MAX_EDGES + 1];
        let result = engine.install(request(21, 1, transitions));
        assert!(matches!(result, Err(EngineError::TooManyEdges { .. })));
    }

    #[test]
    fn test_failed_install_keeps_previous_policy() {
        let (engine, _killer) = test_engine();
        engine.install(linear_request(22)).unwrap();

        assert!(engine.install(request(22, 2, vec![call(0, 9, 0)])).is_err());

        // The earlier policy still enforces
        assert!(engine.is_sandboxed(22));
        assert_eq!(engine.observe(22, 0), Verdict::Active { states: 1 });
    }

    #[test]
    fn test_dummy_collision_accepts_both_sites() {
        // Two sites share dummy id 5; both successors activate on 5.
        // Under unique mode the same shape distinguishes them.
        let (engine, _killer) = test_engine();
        engine
            .install(request(23, 4, vec![call(0, 1, 5), call(2, 3, 5), eps(0, 2)]))
            .unwrap();

        // Start set: {0, 2}; both consuming edges fire on 5.
        assert_eq!(engine.observe(23, 5), Verdict::Active { states: 2 });

        let unique = InstallRequest {
            pid: 24,
            num_nodes: 4,
            id_mode: IdMode::Unique,
            transitions: vec![call(0, 1, 1), call(2, 3, 3), eps(0, 2)],
        };
        engine.install(unique).unwrap();
        assert_eq!(engine.observe(24, 1), Verdict::Active { states: 1 });
    }

    #[test]
    fn test_cyclic_policy_loops_forever() {
        // read(0) <-> write(1) cycle: alternating markers never drain.
        let (engine, _killer) = test_engine();
        engine
            .install(request(25, 2, vec![call(0, 1, 0), call(1, 0, 1)]))
            .unwrap();

        for _ in 0..100 {
            assert_eq!(engine.observe(25, 0), Verdict::Active { states: 1 });
            assert_eq!(engine.observe(25, 1), Verdict::Active { states: 1 });
        }
    }

    #[test]
    fn test_independent_pids_advance_independently() {
        let (engine, killer) = test_engine();
        engine.install(linear_request(30)).unwrap();
        engine.install(linear_request(31)).unwrap();

        assert_eq!(engine.observe(30, 0), Verdict::Active { states: 1 });
        // Killing 31 does not disturb 30
        assert_eq!(engine.observe(31, 99), Verdict::Violation);
        assert_eq!(engine.observe(30, 1), Verdict::Active { states: 1 });
        assert_eq!(*killer.killed.lock().unwrap(), vec![31]);
    }

    #[test]
    fn test_concurrent_observations_different_pids() {
        let (engine, _killer) = test_engine();
        let engine = Arc::new(engine);

        for pid in 0..8u32 {
            engine
                .install(request(pid, 2, vec![call(0, 1, 0), call(1, 0, 1)]))
                .unwrap();
        }

        let handles: Vec<_> = (0..8u32)
            .map(|pid| {
                let engine = engine.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        assert_eq!(engine.observe(pid, 0), Verdict::Active { states: 1 });
                        assert_eq!(engine.observe(pid, 1), Verdict::Active { states: 1 });
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
