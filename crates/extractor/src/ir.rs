// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Resolved module model
//!
//! The output of label resolution: a module's external declarations
//! plus one block-level CFG per defined function, backed by petgraph.
//! Block node indices follow program order (the order blocks appear in
//! the source), which downstream extraction relies on for deterministic
//! site numbering.

use std::collections::HashSet;

use petgraph::graph::DiGraph;

pub type BlockIndex = petgraph::graph::NodeIndex;

pub(crate) type InnerBlockGraph = DiGraph<BlockData, ()>;

/// One call instruction inside a basic block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSiteRef {
    /// Callee name (without the leading `@`).
    pub callee: String,
    /// 1-indexed source line of the call.
    pub line: usize,
}

/// Data stored in each basic block node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockData {
    /// Block label, `None` for an unlabelled entry block.
    pub label: Option<String>,
    /// Every call in the block, in order. Filtering to library calls
    /// happens during extraction, not here.
    pub calls: Vec<CallSiteRef>,
}

/// Block-level control flow graph of one function.
pub struct FunctionCfg {
    name: String,
    graph: InnerBlockGraph,
}

impl FunctionCfg {
    pub(crate) fn new(name: String, graph: InnerBlockGraph) -> Self {
        Self { name, graph }
    }

    /// Function name (without the leading `@`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Iterate over all block indices in program order.
    pub fn blocks(&self) -> impl Iterator<Item = BlockIndex> {
        self.graph.node_indices()
    }

    /// Number of basic blocks.
    pub fn block_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Access a block's data.
    pub fn block(&self, index: BlockIndex) -> &BlockData {
        &self.graph[index]
    }

    /// Iterate over the CFG successors of a block.
    pub fn successors(&self, block: BlockIndex) -> impl Iterator<Item = BlockIndex> + '_ {
        self.graph.neighbors(block)
    }
}

/// A resolved module: declarations plus defined functions.
pub struct Module {
    /// Names of external declarations (functions with no body).
    pub declarations: HashSet<String>,
    /// Defined functions in source order.
    pub functions: Vec<FunctionCfg>,
}

impl Module {
    /// Whether `name` refers to an external declaration.
    pub fn is_declaration(&self, name: &str) -> bool {
        self.declarations.contains(name)
    }
}
