// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Policy artifact (JSON)
//!
//! The artifact is the portable, self-describing output of the
//! extractor: one entry per function, each carrying its call sites in
//! program order (for debugging), the node arrays, and the edge list.
//! ε edges use the distinguished label `"ϵ"` and `-1` in both match
//! fields. Parsing then re-serialising preserves semantic content;
//! whitespace and key order are not significant.

use automaton::{Edge, EdgeLabel, Graph, IdMode, Transition, UNASSIGNED_ID};
use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, PolicyResult};

/// Edge label marking an ε transition.
pub const EPSILON_LABEL: &str = "ϵ";

/// One call site in program order, kept for debugging and tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub name: String,
    #[serde(rename = "uniqueID")]
    pub unique_id: i32,
    #[serde(rename = "dummyID")]
    pub dummy_id: i32,
    #[serde(rename = "resetCount")]
    pub reset_count: i32,
    #[serde(rename = "irLocation")]
    pub ir_location: String,
}

/// One edge of a function's automaton as serialised in the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEdge {
    pub src: u32,
    pub dst: u32,
    /// Callee name of the source site, or [`EPSILON_LABEL`].
    pub label: String,
    #[serde(rename = "matchDummy")]
    pub match_dummy: i32,
    #[serde(rename = "matchUnique")]
    pub match_unique: i32,
}

impl ArtifactEdge {
    pub fn is_epsilon(&self) -> bool {
        self.label == EPSILON_LABEL
    }
}

/// Policy for a single function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionPolicy {
    #[serde(rename = "functionName")]
    pub function_name: String,
    #[serde(rename = "mod")]
    pub modulus: u32,
    #[serde(rename = "idMode")]
    pub id_mode: IdMode,
    #[serde(rename = "callsInOrder")]
    pub calls_in_order: Vec<CallSite>,
    #[serde(rename = "nodeLabels")]
    pub node_labels: Vec<String>,
    #[serde(rename = "nodeDummyIDs")]
    pub node_dummy_ids: Vec<i32>,
    #[serde(rename = "nodeUniqueIDs")]
    pub node_unique_ids: Vec<i32>,
    pub edges: Vec<ArtifactEdge>,
}

impl FunctionPolicy {
    /// Build the artifact entry for one extracted graph.
    ///
    /// `calls_in_order` must be the site records in program order;
    /// node index `i` corresponds to `calls_in_order[i]`.
    pub fn from_graph(
        graph: &Graph,
        modulus: u32,
        id_mode: IdMode,
        calls_in_order: Vec<CallSite>,
    ) -> Self {
        let node_labels = graph.nodes().iter().map(|n| n.pretty.clone()).collect();
        let node_dummy_ids = graph.nodes().iter().map(|n| n.dummy_id).collect();
        let node_unique_ids = graph.nodes().iter().map(|n| n.unique_id).collect();

        let edges = graph
            .edges()
            .iter()
            .map(|edge| Self::edge_from_graph(graph, edge))
            .collect();

        Self {
            function_name: graph.function_name().to_string(),
            modulus,
            id_mode,
            calls_in_order,
            node_labels,
            node_dummy_ids,
            node_unique_ids,
            edges,
        }
    }

    fn edge_from_graph(graph: &Graph, edge: &Edge) -> ArtifactEdge {
        match &edge.label {
            EdgeLabel::Epsilon => ArtifactEdge {
                src: edge.src as u32,
                dst: edge.dst as u32,
                label: EPSILON_LABEL.to_string(),
                match_dummy: UNASSIGNED_ID,
                match_unique: UNASSIGNED_ID,
            },
            EdgeLabel::Call(callee) => {
                let src = &graph.nodes()[edge.src];
                ArtifactEdge {
                    src: edge.src as u32,
                    dst: edge.dst as u32,
                    label: callee.clone(),
                    match_dummy: src.dummy_id,
                    match_unique: src.unique_id,
                }
            }
        }
    }

    /// Number of automaton nodes.
    pub fn num_nodes(&self) -> usize {
        self.node_labels.len()
    }

    /// Check internal consistency: node arrays agree in length, edge
    /// endpoints are in range, and ε labels pair with `-1` matches.
    pub fn validate(&self) -> PolicyResult<()> {
        let invalid = |reason: String| PolicyError::InvalidFunction {
            function: self.function_name.clone(),
            reason,
        };

        let nodes = self.node_labels.len();
        if self.node_dummy_ids.len() != nodes || self.node_unique_ids.len() != nodes {
            return Err(invalid(format!(
                "node arrays disagree: {} labels, {} dummy ids, {} unique ids",
                nodes,
                self.node_dummy_ids.len(),
                self.node_unique_ids.len()
            )));
        }

        for (index, edge) in self.edges.iter().enumerate() {
            if edge.src as usize >= nodes || edge.dst as usize >= nodes {
                return Err(invalid(format!(
                    "edge {} ({} -> {}) out of range for {} nodes",
                    index, edge.src, edge.dst, nodes
                )));
            }
            if edge.is_epsilon() {
                if edge.match_dummy != UNASSIGNED_ID || edge.match_unique != UNASSIGNED_ID {
                    return Err(invalid(format!(
                        "ε edge {} carries match ids {}/{}",
                        index, edge.match_dummy, edge.match_unique
                    )));
                }
            } else if edge.match_dummy < 0 || edge.match_unique < 0 {
                return Err(invalid(format!(
                    "consuming edge {} is missing a match id",
                    index
                )));
            }
        }

        Ok(())
    }

    /// Resolve the edges into engine transitions under `mode`.
    pub fn transitions(&self, mode: IdMode) -> Vec<Transition> {
        self.edges
            .iter()
            .map(|edge| {
                let match_id = if edge.is_epsilon() {
                    UNASSIGNED_ID
                } else {
                    match mode {
                        IdMode::Dummy => edge.match_dummy,
                        IdMode::Unique => edge.match_unique,
                    }
                };
                Transition {
                    src: edge.src,
                    dst: edge.dst,
                    match_id,
                    epsilon: edge.is_epsilon(),
                }
            })
            .collect()
    }
}

/// The aggregated artifact: one entry per extracted function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyArtifact {
    pub functions: Vec<FunctionPolicy>,
}

impl PolicyArtifact {
    /// Parse an artifact from JSON text and validate every function.
    pub fn parse(json: &str) -> PolicyResult<Self> {
        let artifact: Self = serde_json::from_str(json)?;
        for function in &artifact.functions {
            function.validate()?;
        }
        Ok(artifact)
    }

    /// Serialise to pretty-printed JSON.
    pub fn to_json(&self) -> PolicyResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Select one function's policy by index.
    pub fn select(&self, index: usize) -> PolicyResult<&FunctionPolicy> {
        self.functions
            .get(index)
            .ok_or(PolicyError::FunctionIndexOutOfRange {
                index,
                count: self.functions.len(),
            })
    }
}
