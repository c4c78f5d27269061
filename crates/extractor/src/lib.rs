// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Policy extraction and instrumentation for textual IR
//!
//! This crate turns a module of textual IR into enforceable policies:
//!
//! - Parse the IR ([`parser`]) in two phases: text parsing, then label
//!   resolution into a block-level CFG per function ([`ir`]).
//! - Extract one over-approximating library-call automaton per
//!   function ([`extract`]): a node per call site, consuming edges
//!   between consecutive sites of a block, ε edges across blocks
//!   (call-free blocks are skipped transitively).
//! - Instrument the IR ([`instrument`]): a marker-emission call is
//!   inserted immediately before every library-call site, carrying the
//!   site's identifier under the active id mode.
//! - Visualise each automaton as DOT ([`dot`]).

pub mod dot;
pub mod error;
pub mod extract;
pub mod instrument;
pub mod ir;
pub mod parser;

use std::collections::HashMap;

use automaton::IdMode;

pub use error::ParseError;
pub use extract::{extract_module, CallFilter, ExtractConfig, FunctionExtraction, ModuleExtraction};
pub use instrument::{instrument, MARKER_FN};
pub use ir::{BlockData, CallSiteRef, FunctionCfg, Module};
pub use parser::{ParsedIr, ParsedLine, Statement};

/// Map from source line number to the marker id emitted before it,
/// across every function of an extraction.
pub fn marker_map(extraction: &ModuleExtraction, mode: IdMode) -> HashMap<usize, i32> {
    extraction
        .functions
        .iter()
        .flat_map(|f| f.sites.iter())
        .map(|site| (site.line, site.ids.select(mode)))
        .collect()
}
