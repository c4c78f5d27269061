// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! DOT visualisation of extracted automata
//!
//! One digraph per function, laid out left to right. Node labels show
//! the callee plus both identifiers; ε edges are labelled with the
//! distinguished epsilon glyph.

use std::{fs, io, path::Path};

use automaton::{EdgeLabel, Graph};
use policy::EPSILON_LABEL;

/// Render one automaton as a DOT digraph.
pub fn to_dot(graph: &Graph) -> String {
    let mut out = String::new();
    out.push_str(&format!("digraph \"{}\" {{\n", graph.function_name()));
    out.push_str("  rankdir=LR;\n");

    for (index, node) in graph.nodes().iter().enumerate() {
        let mut label = format!("n{index}");
        if !node.pretty.is_empty() {
            label.push_str(&format!("\\n{}", node.pretty));
        }
        if node.dummy_id >= 0 {
            label.push_str(&format!("\\n(dummy={})", node.dummy_id));
        }
        if node.unique_id >= 0 {
            label.push_str(&format!("\\n(uid={})", node.unique_id));
        }
        out.push_str(&format!("  n{index} [shape=circle,label=\"{label}\"];\n"));
    }

    for edge in graph.edges() {
        let label = match &edge.label {
            EdgeLabel::Epsilon => EPSILON_LABEL,
            EdgeLabel::Call(callee) => callee,
        };
        out.push_str(&format!(
            "  n{} -> n{} [label=\"{label}\"];\n",
            edge.src, edge.dst
        ));
    }

    out.push_str("}\n");
    out
}

/// Write one `<function>.dot` file per graph into `dir`, creating the
/// directory if needed.
pub fn write_dot_files<'a>(
    dir: &Path,
    graphs: impl IntoIterator<Item = &'a Graph>,
) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    for graph in graphs {
        let path = dir.join(format!("{}.dot", graph.function_name()));
        fs::write(path, to_dot(graph))?;
    }
    Ok(())
}
