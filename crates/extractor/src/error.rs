// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for IR parsing.

use thiserror::Error;

/// Errors from parsing or resolving textual IR.
///
/// Any of these means the module is unreadable and the run aborts;
/// extraction proper is per-function and does not fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// An instruction, label, or terminator outside any `define`.
    #[error("line {line}: statement outside of a function definition")]
    StatementOutsideFunction { line: usize },

    /// `define` while a previous function is still open.
    #[error("line {line}: 'define' inside function '{function}'")]
    NestedDefine { function: String, line: usize },

    /// `}` with no open function.
    #[error("line {line}: unmatched '}}'")]
    UnmatchedBrace { line: usize },

    /// A block label used twice within one function.
    #[error("line {line}: duplicate block label '{label}'")]
    DuplicateLabel { label: String, line: usize },

    /// A branch target that names no block in the function.
    #[error("line {line}: branch to undefined label '{label}'")]
    UndefinedLabel { label: String, line: usize },

    /// End of input with an open function body.
    #[error("unterminated function '{function}' at end of input")]
    UnterminatedFunction { function: String },

    /// A recognised keyword with an unusable rest of line.
    #[error("line {line}: malformed {what}")]
    Malformed { what: &'static str, line: usize },
}
