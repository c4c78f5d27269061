//! Frontier operations
//!
//! The engine-facing form of an automaton is a flat transition list
//! plus a node count; these functions advance a [`Frontier`] over it.
//! All three operations read the transitions and mutate only the
//! frontier, and none of them allocates: `step` writes into a
//! caller-provided scratch frontier sized at install time.

use crate::frontier::Frontier;

/// One resolved transition of an installed automaton.
///
/// For ε transitions `match_id` is meaningless and ignored; the wire
/// format writes `-1` there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub src: u32,
    pub dst: u32,
    pub match_id: i32,
    pub epsilon: bool,
}

/// Extend `frontier` with every node reachable over ε transitions.
///
/// Runs to a fixed point; terminates because the frontier only grows
/// and is bounded by the node count.
pub fn epsilon_closure(transitions: &[Transition], frontier: &mut Frontier) {
    let mut changed = true;
    while changed {
        changed = false;
        for t in transitions {
            if t.epsilon && frontier.test(t.src as usize) && !frontier.test(t.dst as usize) {
                frontier.set(t.dst as usize);
                changed = true;
            }
        }
    }
}

/// Advance `frontier` on one observed marker value.
///
/// The new frontier contains the destination of every non-ε transition
/// whose source is active and whose `match_id` equals `observed`,
/// ε-closed. When no transition matches, the frontier becomes empty,
/// which is the terminal violation state.
pub fn step(
    transitions: &[Transition],
    frontier: &mut Frontier,
    scratch: &mut Frontier,
    observed: i32,
) {
    scratch.clear_all();
    for t in transitions {
        if !t.epsilon && t.match_id == observed && frontier.test(t.src as usize) {
            scratch.set(t.dst as usize);
        }
    }
    frontier.copy_from(scratch);
    epsilon_closure(transitions, frontier);
}

/// Compute the initial frontier for a freshly installed automaton.
///
/// Activates every node with no incoming non-ε transition, falling
/// back to node 0 when that selects nothing, then applies ε-closure.
pub fn initial_frontier(transitions: &[Transition], num_nodes: usize) -> Frontier {
    let mut frontier = Frontier::new(num_nodes);
    if num_nodes == 0 {
        return frontier;
    }

    let mut in_degree = vec![0usize; num_nodes];
    for t in transitions {
        if !t.epsilon {
            in_degree[t.dst as usize] += 1;
        }
    }

    let mut any = false;
    for (node, &degree) in in_degree.iter().enumerate() {
        if degree == 0 {
            frontier.set(node);
            any = true;
        }
    }
    if !any {
        frontier.set(0);
    }

    epsilon_closure(transitions, &mut frontier);
    frontier
}
