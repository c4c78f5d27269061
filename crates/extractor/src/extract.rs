// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-function automaton extraction
//!
//! Walks each function's basic blocks and builds one over-approximating
//! NFA of its library-call sites:
//!
//! - one node per site, allocated in program order (block order, then
//!   site order within the block), so node index equals site order;
//! - consuming edges between consecutive sites of one block, labelled
//!   and matched on the **source** site;
//! - ε edges from a block's last site to the first site of every
//!   successor block that has sites, skipping call-free blocks
//!   transitively so reachability is never lost through them.
//!
//! The start set derives from the graph under the configured
//! [`StartSetPolicy`]; the engine recomputes it from the installed
//! edges, so the policy here only affects tooling output.

use std::collections::{HashSet, VecDeque};

use automaton::{Graph, IdAssigner, IdMode, SiteIds, StartSetPolicy, DEFAULT_MODULUS};
use policy::{CallSite, FunctionPolicy};

use crate::{
    instrument::MARKER_FN,
    ir::{BlockIndex, FunctionCfg, Module},
};

/// Selects which calls count as library calls.
///
/// A call qualifies iff its callee is an external declaration whose
/// name does not start with the intrinsic prefix and is not the marker
/// function itself (the marker is bookkeeping, not a library call).
#[derive(Debug, Clone)]
pub struct CallFilter {
    /// Prefix of toolchain intrinsics to exclude.
    pub intrinsic_prefix: String,
}

impl Default for CallFilter {
    fn default() -> Self {
        Self {
            intrinsic_prefix: "llvm.".to_string(),
        }
    }
}

impl CallFilter {
    /// Whether a call to `callee` is a library call in `module`.
    pub fn is_library_call(&self, module: &Module, callee: &str) -> bool {
        module.is_declaration(callee)
            && !callee.starts_with(&self.intrinsic_prefix)
            && callee != MARKER_FN
    }
}

/// Extraction parameters.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Modulus for dummy-id assignment.
    pub modulus: u32,
    /// Identifier mode recorded in the artifact.
    pub id_mode: IdMode,
    /// Start-set derivation policy.
    pub start_policy: StartSetPolicy,
    /// Library-call candidate filter.
    pub filter: CallFilter,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            modulus: DEFAULT_MODULUS,
            id_mode: IdMode::Dummy,
            start_policy: StartSetPolicy::default(),
            filter: CallFilter::default(),
        }
    }
}

/// One library-call site with its assigned identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSite {
    /// Callee name.
    pub callee: String,
    /// 1-indexed source line of the call.
    pub line: usize,
    /// Identifiers assigned in program order.
    pub ids: SiteIds,
}

/// Extraction result for one function.
pub struct FunctionExtraction {
    /// The function's automaton.
    pub graph: Graph,
    /// Site records in program order; `sites[i]` is node `i`.
    pub sites: Vec<ExtractedSite>,
}

impl FunctionExtraction {
    /// Build the artifact entry for this function.
    pub fn to_policy(&self, config: &ExtractConfig) -> FunctionPolicy {
        let calls_in_order = self
            .sites
            .iter()
            .map(|site| CallSite {
                name: site.callee.clone(),
                unique_id: site.ids.unique_id,
                dummy_id: site.ids.dummy_id,
                reset_count: site.ids.reset_count,
                ir_location: format!("line {}", site.line),
            })
            .collect();
        FunctionPolicy::from_graph(&self.graph, config.modulus, config.id_mode, calls_in_order)
    }

    /// The start set under the configured policy.
    pub fn start_set(&self, config: &ExtractConfig) -> Vec<usize> {
        self.graph.start_set(config.start_policy)
    }
}

/// Extraction result for a whole module.
pub struct ModuleExtraction {
    /// One entry per defined function, in source order.
    pub functions: Vec<FunctionExtraction>,
}

impl ModuleExtraction {
    /// Build the aggregated artifact.
    pub fn to_artifact(&self, config: &ExtractConfig) -> policy::PolicyArtifact {
        policy::PolicyArtifact {
            functions: self.functions.iter().map(|f| f.to_policy(config)).collect(),
        }
    }
}

/// Extract an automaton for every function of the module.
pub fn extract_module(module: &Module, config: &ExtractConfig) -> ModuleExtraction {
    let functions = module
        .functions
        .iter()
        .map(|function| extract_function(module, function, config))
        .collect();
    ModuleExtraction { functions }
}

/// Extract the automaton of a single function.
pub fn extract_function(
    module: &Module,
    function: &FunctionCfg,
    config: &ExtractConfig,
) -> FunctionExtraction {
    let mut graph = Graph::new(function.name());
    let mut assigner = IdAssigner::new(config.modulus);
    let mut sites = Vec::new();

    // Node allocation in program order; remember each block's first
    // and last site node for the edge passes below.
    let mut block_span: Vec<Option<(usize, usize)>> = Vec::new();
    for block_index in function.blocks() {
        let block = function.block(block_index);
        let mut first_last: Option<(usize, usize)> = None;
        let mut previous: Option<usize> = None;

        for call in &block.calls {
            if !config.filter.is_library_call(module, &call.callee) {
                continue;
            }
            let node = graph.add_node(call.callee.clone());
            let ids = assigner.next_site();
            graph.assign_ids(node, ids);
            sites.push(ExtractedSite {
                callee: call.callee.clone(),
                line: call.line,
                ids,
            });

            // Consecutive sites of one block: leaving the previous
            // site consumes its own identifier.
            if let Some(prev_node) = previous {
                let prev_callee = sites[prev_node].callee.clone();
                graph.add_call_edge(prev_node, node, prev_callee);
            }

            first_last = Some((first_last.map_or(node, |(first, _)| first), node));
            previous = Some(node);
        }
        block_span.push(first_last);
    }

    // ε edges across blocks; call-free blocks are skipped transitively.
    let blocks: Vec<BlockIndex> = function.blocks().collect();
    for (index, &block_index) in blocks.iter().enumerate() {
        let Some((_, exit_node)) = block_span[index] else {
            continue;
        };
        for entry_node in reachable_entries(function, block_index, &block_span) {
            graph.add_epsilon_edge(exit_node, entry_node);
        }
    }

    debug_assert!(graph.validate().is_ok());
    FunctionExtraction { graph, sites }
}

/// First-site nodes of every block with sites that is reachable from
/// `from` through call-free blocks only (BFS with a visited set, so
/// cycles of empty blocks terminate).
fn reachable_entries(
    function: &FunctionCfg,
    from: BlockIndex,
    block_span: &[Option<(usize, usize)>],
) -> Vec<usize> {
    let mut entries = Vec::new();
    let mut seen: HashSet<BlockIndex> = HashSet::new();
    let mut queue: VecDeque<BlockIndex> = function.successors(from).collect();

    while let Some(block) = queue.pop_front() {
        if !seen.insert(block) {
            continue;
        }
        match block_span[block.index()] {
            Some((entry, _)) => entries.push(entry),
            None => queue.extend(function.successors(block)),
        }
    }

    entries
}
