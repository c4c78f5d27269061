// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Marker instrumentation pass
//!
//! Rewrites the IR text so that every library-call site is preceded by
//! a marker emission:
//!
//! ```text
//!   %fd = call @open(%path)
//! ```
//!
//! becomes
//!
//! ```text
//!   call @emit(i32 0)
//!   %fd = call @open(%path)
//! ```
//!
//! The marker call carries the site's identifier under the active id
//! mode and is inserted immediately *before* the site, so the marker
//! is observed while the site's automaton node is active. All other
//! lines are emitted verbatim; a `declare @emit` is prepended once
//! when the module lacks one.

use std::collections::HashMap;

use crate::parser::{ParsedLine, Statement};

/// Name of the externally declared marker function (`emit(int32)`).
pub const MARKER_FN: &str = "emit";

/// Instrument parsed IR lines.
///
/// `markers` maps a source line number to the identifier emitted
/// before that line (see [`crate::marker_map`]).
pub fn instrument(lines: &[ParsedLine<'_>], markers: &HashMap<usize, i32>) -> String {
    let mut output = String::new();

    let has_declaration = lines
        .iter()
        .any(|line| matches!(line.statement, Statement::Declare(Some(name)) if name == MARKER_FN));
    if !has_declaration {
        output.push_str(&format!("declare @{MARKER_FN}\n"));
    }

    for line in lines {
        if let Some(&id) = markers.get(&line.line_number) {
            let indent = leading_whitespace(line.original);
            output.push_str(&format!("{indent}call @{MARKER_FN}(i32 {id})\n"));
        }
        output.push_str(line.original);
        output.push('\n');
    }

    output
}

fn leading_whitespace(line: &str) -> &str {
    let end = line
        .find(|c: char| !c.is_whitespace())
        .unwrap_or(line.len());
    &line[..end]
}
