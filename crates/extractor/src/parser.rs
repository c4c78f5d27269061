// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Textual IR parser.
//!
//! Parses the LLVM-flavoured textual IR consumed by the extractor.
//!
//! # Two-Phase Parsing
//!
//! Parsing happens in two phases:
//!
//! 1. **Text parsing** ([`ParsedIr::parse`]): splits input into lines
//!    and classifies each as a declaration, function delimiter, block
//!    label, call, terminator, or opaque instruction. No validation.
//!
//! 2. **Resolution** ([`ParsedIr::resolve`]): groups lines into
//!    functions and basic blocks, resolves branch labels to block
//!    indices, and produces the block-level CFG per function.
//!
//! Unrecognised lines inside a function are opaque instructions and
//! survive instrumentation verbatim; unrecognised top-level lines
//! (target declarations, metadata) are ignored.

use std::collections::{HashMap, HashSet};

use crate::{
    error::ParseError,
    ir::{BlockData, CallSiteRef, FunctionCfg, InnerBlockGraph, Module},
};

/// The classified content of one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement<'a> {
    /// `declare @name`. `None` when the name is missing.
    Declare(Option<&'a str>),
    /// `define @name {`. `None` when the name or brace is missing.
    DefineBegin(Option<&'a str>),
    /// `}` closing a function body.
    DefineEnd,
    /// `label:` starting a basic block.
    BlockLabel(&'a str),
    /// A line invoking `call @callee`. `None` when no callee parses.
    Call(Option<&'a str>),
    /// `br` terminator; the `label %x` targets in operand order.
    Branch(Vec<&'a str>),
    /// `ret` terminator.
    Ret,
    /// Any other non-empty line.
    Instruction,
    /// Blank or comment-only line.
    Empty,
}

/// A parsed line of IR.
#[derive(Debug, Clone)]
pub struct ParsedLine<'a> {
    /// The classified statement.
    pub statement: Statement<'a>,
    /// Original line number (1-indexed).
    pub line_number: usize,
    /// Original line text, comments included.
    pub original: &'a str,
}

/// Parsed IR text, ready for resolution or instrumentation.
pub struct ParsedIr<'a> {
    lines: Vec<ParsedLine<'a>>,
}

impl<'a> ParsedIr<'a> {
    /// Parse IR text into classified lines.
    pub fn parse(input: &'a str) -> Self {
        let lines = input
            .lines()
            .enumerate()
            .map(|(idx, text)| Self::parse_line(text, idx + 1))
            .collect();
        Self { lines }
    }

    /// Access the parsed lines.
    pub fn lines(&self) -> &[ParsedLine<'a>] {
        &self.lines
    }

    /// Resolve the parsed lines into a module.
    ///
    /// # Errors
    ///
    /// Fails when the module structure is unreadable: statements
    /// outside a function, nested or unterminated definitions,
    /// duplicate or undefined block labels, or recognised keywords
    /// with an unusable rest of line.
    pub fn resolve(&self) -> Result<Module, ParseError> {
        let mut declarations: HashSet<String> = HashSet::new();
        let mut functions = Vec::new();
        let mut current: Option<FunctionBuilder> = None;

        for line in &self.lines {
            let line_number = line.line_number;
            match &line.statement {
                Statement::Empty => {}
                Statement::Declare(name) => {
                    if current.is_some() {
                        return Err(ParseError::Malformed {
                            what: "declaration inside a function body",
                            line: line_number,
                        });
                    }
                    let name = (*name).ok_or(ParseError::Malformed {
                        what: "declaration",
                        line: line_number,
                    })?;
                    declarations.insert(name.to_string());
                }
                Statement::DefineBegin(name) => {
                    if let Some(builder) = &current {
                        return Err(ParseError::NestedDefine {
                            function: builder.name.clone(),
                            line: line_number,
                        });
                    }
                    let name = (*name).ok_or(ParseError::Malformed {
                        what: "function definition",
                        line: line_number,
                    })?;
                    current = Some(FunctionBuilder::new(name.to_string()));
                }
                Statement::DefineEnd => {
                    let builder = current
                        .take()
                        .ok_or(ParseError::UnmatchedBrace { line: line_number })?;
                    functions.push(builder.finish()?);
                }
                Statement::BlockLabel(label) => {
                    let builder = current
                        .as_mut()
                        .ok_or(ParseError::StatementOutsideFunction { line: line_number })?;
                    builder.start_block(label, line_number)?;
                }
                Statement::Call(callee) => {
                    let builder = current
                        .as_mut()
                        .ok_or(ParseError::StatementOutsideFunction { line: line_number })?;
                    let callee = (*callee).ok_or(ParseError::Malformed {
                        what: "call",
                        line: line_number,
                    })?;
                    builder.add_call(callee, line_number);
                }
                Statement::Branch(targets) => {
                    let builder = current
                        .as_mut()
                        .ok_or(ParseError::StatementOutsideFunction { line: line_number })?;
                    if targets.is_empty() {
                        return Err(ParseError::Malformed {
                            what: "branch",
                            line: line_number,
                        });
                    }
                    builder.add_branch(targets, line_number);
                }
                Statement::Ret => {
                    let builder = current
                        .as_mut()
                        .ok_or(ParseError::StatementOutsideFunction { line: line_number })?;
                    builder.mark_ret();
                }
                // Opaque instructions only matter for block membership;
                // top-level ones (target lines, metadata) are ignored.
                Statement::Instruction => {
                    if let Some(builder) = current.as_mut() {
                        builder.touch_block();
                    }
                }
            }
        }

        if let Some(builder) = current {
            return Err(ParseError::UnterminatedFunction {
                function: builder.name,
            });
        }

        Ok(Module {
            declarations,
            functions,
        })
    }

    /// Parse and classify a single line.
    fn parse_line(text: &'a str, line_number: usize) -> ParsedLine<'a> {
        let original = text;
        let text = Self::strip_comment(text).trim();

        let statement = if text.is_empty() {
            Statement::Empty
        } else if text == "}" {
            Statement::DefineEnd
        } else if let Some(rest) = text.strip_prefix("declare") {
            if rest.starts_with(char::is_whitespace) {
                Statement::Declare(Self::at_token(rest))
            } else {
                Statement::Instruction
            }
        } else if let Some(rest) = text.strip_prefix("define") {
            if rest.starts_with(char::is_whitespace) {
                let name = if rest.trim_end().ends_with('{') {
                    Self::at_token(rest)
                } else {
                    None
                };
                Statement::DefineBegin(name)
            } else {
                Statement::Instruction
            }
        } else if let Some(label) = Self::block_label(text) {
            Statement::BlockLabel(label)
        } else {
            let mut tokens = text.split_whitespace();
            match tokens.next() {
                Some("br") => Statement::Branch(Self::branch_targets(text)),
                Some("ret") => Statement::Ret,
                _ => {
                    if Self::has_call_keyword(text) {
                        Statement::Call(Self::call_callee(text))
                    } else {
                        Statement::Instruction
                    }
                }
            }
        };

        ParsedLine {
            statement,
            line_number,
            original,
        }
    }

    /// Remove comments: `;` and `//` to end of line.
    fn strip_comment(line: &str) -> &str {
        let mut end = line.len();
        if let Some(pos) = line.find(';') {
            end = end.min(pos);
        }
        if let Some(pos) = line.find("//") {
            end = end.min(pos);
        }
        &line[..end]
    }

    /// Parse `label:` lines. Valid label characters: alphanumeric,
    /// `_`, `.`, `$`; an optional leading `%` is stripped.
    fn block_label(text: &str) -> Option<&str> {
        let label = text.strip_suffix(':')?;
        let label = label.strip_prefix('%').unwrap_or(label);
        if !label.is_empty()
            && label
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '$')
        {
            Some(label)
        } else {
            None
        }
    }

    /// First `@name` token, stripped of `@` and any argument list.
    fn at_token(text: &str) -> Option<&str> {
        for token in text.split_whitespace() {
            if let Some(name) = token.strip_prefix('@') {
                let name = name.split('(').next().unwrap_or(name);
                let name = name.trim_end_matches(',');
                if !name.is_empty() {
                    return Some(name);
                }
            }
        }
        None
    }

    /// Whether the line contains a `call` keyword token.
    fn has_call_keyword(text: &str) -> bool {
        text.split_whitespace().any(|t| t == "call")
    }

    /// Callee of a call line: the first `@name` after the `call` token.
    fn call_callee(text: &str) -> Option<&str> {
        let mut seen_call = false;
        for token in text.split_whitespace() {
            if token == "call" {
                seen_call = true;
                continue;
            }
            if seen_call {
                if let Some(name) = token.strip_prefix('@') {
                    let name = name.split('(').next().unwrap_or(name);
                    let name = name.trim_end_matches(',');
                    if !name.is_empty() {
                        return Some(name);
                    }
                }
            }
        }
        None
    }

    /// Branch targets: every `label %name` operand pair, in order.
    fn branch_targets(text: &str) -> Vec<&str> {
        let mut targets = Vec::new();
        let mut tokens = text.split_whitespace().peekable();
        while let Some(token) = tokens.next() {
            if token == "label" {
                if let Some(next) = tokens.peek() {
                    if let Some(name) = next.strip_prefix('%') {
                        let name = name.trim_end_matches(',');
                        if !name.is_empty() {
                            targets.push(name);
                        }
                        tokens.next();
                    }
                }
            }
        }
        targets
    }
}

/// A basic block during resolution.
struct RawBlock {
    label: Option<String>,
    calls: Vec<CallSiteRef>,
    /// Branch targets with the line that referenced them.
    targets: Vec<(String, usize)>,
    has_branch: bool,
    has_ret: bool,
}

impl RawBlock {
    fn new(label: Option<String>) -> Self {
        Self {
            label,
            calls: Vec::new(),
            targets: Vec::new(),
            has_branch: false,
            has_ret: false,
        }
    }
}

/// Accumulates one function's blocks during resolution.
struct FunctionBuilder {
    name: String,
    blocks: Vec<RawBlock>,
    labels: HashMap<String, usize>,
}

impl FunctionBuilder {
    fn new(name: String) -> Self {
        Self {
            name,
            blocks: Vec::new(),
            labels: HashMap::new(),
        }
    }

    /// Start a labelled block.
    fn start_block(&mut self, label: &str, line: usize) -> Result<(), ParseError> {
        if self.labels.contains_key(label) {
            return Err(ParseError::DuplicateLabel {
                label: label.to_string(),
                line,
            });
        }
        self.labels.insert(label.to_string(), self.blocks.len());
        self.blocks.push(RawBlock::new(Some(label.to_string())));
        Ok(())
    }

    /// Ensure an (unlabelled) block exists for statements that appear
    /// before the first label.
    fn touch_block(&mut self) {
        if self.blocks.is_empty() {
            self.blocks.push(RawBlock::new(None));
        }
    }

    fn add_call(&mut self, callee: &str, line: usize) {
        self.touch_block();
        self.blocks
            .last_mut()
            .unwrap()
            .calls
            .push(CallSiteRef {
                callee: callee.to_string(),
                line,
            });
    }

    fn add_branch(&mut self, targets: &[&str], line: usize) {
        self.touch_block();
        let block = self.blocks.last_mut().unwrap();
        block.has_branch = true;
        for target in targets {
            block.targets.push((target.to_string(), line));
        }
    }

    fn mark_ret(&mut self) {
        self.touch_block();
        self.blocks.last_mut().unwrap().has_ret = true;
    }

    /// Resolve labels and build the block CFG.
    fn finish(self) -> Result<FunctionCfg, ParseError> {
        let mut graph = InnerBlockGraph::new();
        let nodes: Vec<_> = self
            .blocks
            .iter()
            .map(|block| {
                graph.add_node(BlockData {
                    label: block.label.clone(),
                    calls: block.calls.clone(),
                })
            })
            .collect();

        for (index, block) in self.blocks.iter().enumerate() {
            let mut seen = HashSet::new();
            for (target, line) in &block.targets {
                let target_index =
                    *self
                        .labels
                        .get(target)
                        .ok_or_else(|| ParseError::UndefinedLabel {
                            label: target.clone(),
                            line: *line,
                        })?;
                if seen.insert(target_index) {
                    graph.add_edge(nodes[index], nodes[target_index], ());
                }
            }
            // Fall through to the next block without an explicit terminator
            if !block.has_branch && !block.has_ret && index + 1 < self.blocks.len() {
                graph.add_edge(nodes[index], nodes[index + 1], ());
            }
        }

        Ok(FunctionCfg::new(self.name, graph))
    }
}
