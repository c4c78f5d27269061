// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Library-call automaton model
//!
//! This crate provides the data structures shared by the policy
//! extractor and the enforcement engine:
//!
//! - **Graph construction** ([`Graph`], [`Node`], [`Edge`]): one
//!   over-approximating NFA per function, with one node per
//!   library-call site and labelled or ε edges between sites.
//! - **Identifier assignment** ([`IdAssigner`], [`IdMode`]): each site
//!   gets a unique id (site order) and a dummy id (site order modulo a
//!   configurable modulus).
//! - **Run-time state** ([`Frontier`], [`nfa`]): the set of active
//!   states as a bitset, advanced by [`nfa::step`] on each observed
//!   marker and kept ε-closed by [`nfa::epsilon_closure`].
//!
//! # Matching convention
//!
//! A marker is emitted immediately *before* its call site executes, so
//! the emission happens while the site's node is active. Every non-ε
//! transition therefore matches on its **source** node's identifier:
//! observing a site's own id is what moves the automaton out of that
//! site. An automaton whose transitions match on the destination id
//! accepts a different (wrong) language.

pub mod frontier;
pub mod graph;
pub mod ids;
pub mod nfa;

pub use frontier::Frontier;
pub use graph::{Edge, EdgeLabel, Graph, GraphError, Node, StartSetPolicy, UNASSIGNED_ID};
pub use ids::{IdAssigner, IdMode, SiteIds, DEFAULT_MODULUS};
pub use nfa::{epsilon_closure, initial_frontier, step, Transition};
