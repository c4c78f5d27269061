// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Policy extraction CLI
//!
//! Reads textual IR, emits the aggregated policy artifact and one DOT
//! graph per function, and writes the instrumented IR to stdout (or a
//! file):
//!
//! ```bash
//! extractor input.ll --policy-out libcall_policy.json > input_instrumented.ll
//! ```

use std::{
    fs,
    io::{self, Read, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use automaton::{IdMode, DEFAULT_MODULUS};
use clap::{Parser, ValueEnum};
use extractor::{dot, extract_module, instrument, marker_map, ExtractConfig, ParsedIr};
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Dummy,
    Unique,
}

impl From<Mode> for IdMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Dummy => IdMode::Dummy,
            Mode::Unique => IdMode::Unique,
        }
    }
}

/// Derive library-call policies from textual IR and instrument it.
#[derive(Parser, Debug)]
#[command(name = "extractor", version)]
struct Args {
    /// Input IR file; '-' reads from stdin.
    #[arg(default_value = "-")]
    input: String,

    /// Path for the aggregated policy artifact.
    #[arg(long, default_value = "libcall_policy.json")]
    policy_out: PathBuf,

    /// Directory for per-function DOT graphs.
    #[arg(long, default_value = "libcall_dot")]
    dot_dir: PathBuf,

    /// Modulus for dummy-id assignment.
    #[arg(long, default_value_t = DEFAULT_MODULUS)]
    modulus: u32,

    /// Identifier mode emitted by the instrumented program.
    #[arg(long, value_enum, default_value_t = Mode::Dummy)]
    id_mode: Mode,

    /// Write the instrumented IR here instead of stdout.
    #[arg(long)]
    instrumented_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let input = if args.input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read stdin")?;
        buffer
    } else {
        fs::read_to_string(&args.input)
            .with_context(|| format!("failed to read {}", args.input))?
    };

    let parsed = ParsedIr::parse(&input);
    let module = parsed.resolve().context("failed to resolve IR module")?;

    let config = ExtractConfig {
        modulus: args.modulus,
        id_mode: args.id_mode.into(),
        ..ExtractConfig::default()
    };
    let extraction = extract_module(&module, &config);
    for function in &extraction.functions {
        info!(
            function = function.graph.function_name(),
            sites = function.sites.len(),
            edges = function.graph.edge_count(),
            "extracted automaton"
        );
    }

    let artifact = extraction.to_artifact(&config);
    let json = artifact.to_json().context("failed to serialise artifact")?;
    fs::write(&args.policy_out, json)
        .with_context(|| format!("failed to write {}", args.policy_out.display()))?;

    dot::write_dot_files(&args.dot_dir, extraction.functions.iter().map(|f| &f.graph))
        .with_context(|| format!("failed to write DOT files to {}", args.dot_dir.display()))?;

    let markers = marker_map(&extraction, config.id_mode);
    let instrumented = instrument(parsed.lines(), &markers);
    match &args.instrumented_out {
        Some(path) => fs::write(path, instrumented)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => io::stdout()
            .write_all(instrumented.as_bytes())
            .context("failed to write instrumented IR")?,
    }

    info!(
        functions = extraction.functions.len(),
        artifact = %args.policy_out.display(),
        mode = %config.id_mode,
        "policy extraction complete"
    );
    Ok(())
}
