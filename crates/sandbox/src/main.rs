//! Policy loader CLI
//!
//! Reads a policy artifact, selects one function's automaton, packs it
//! into the engine install blob, and writes the blob to the sandbox
//! device:
//!
//! ```bash
//! sandboxctl -p 4242 -j libcall_policy.json -f 0 --unique
//! ```
//!
//! Exit code 0 on success; non-zero on parse, validation, I/O, or
//! install failure.

use std::{fs, io, path::PathBuf};

use anyhow::{Context, Result};
use automaton::IdMode;
use clap::Parser;
use policy::PolicyArtifact;

const DEVICE_PATH: &str = "/dev/libcallsandbox";

/// Load a function's library-call automaton into the sandbox for a
/// target process.
#[derive(Parser, Debug)]
#[command(name = "sandboxctl", version)]
struct Args {
    /// Target process id.
    #[arg(short = 'p', long = "pid")]
    pid: u32,

    /// Path to the policy artifact.
    #[arg(short = 'j', long = "policy")]
    policy: PathBuf,

    /// Index of the function to enforce.
    #[arg(short = 'f', long = "function", default_value_t = 0)]
    function: usize,

    /// Match on unique ids instead of dummy ids.
    #[arg(long)]
    unique: bool,

    /// Sandbox device (or file) the install blob is written to.
    #[arg(short = 'd', long = "device", default_value = DEVICE_PATH)]
    device: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mode = if args.unique {
        IdMode::Unique
    } else {
        IdMode::Dummy
    };

    let json = fs::read_to_string(&args.policy)
        .with_context(|| format!("failed to read {}", args.policy.display()))?;
    let artifact = PolicyArtifact::parse(&json)
        .with_context(|| format!("failed to parse {}", args.policy.display()))?;

    let function = artifact.select(args.function)?;
    let blob = policy::encode(args.pid, function, mode)
        .with_context(|| format!("failed to encode policy for '{}'", function.function_name))?;

    fs::write(&args.device, &blob)
        .with_context(|| format!("failed to install policy via {}", args.device.display()))?;

    println!(
        "loaded policy: pid={} function={} nodes={} edges={} mode={}",
        args.pid,
        function.function_name,
        function.num_nodes(),
        function.edges.len(),
        mode
    );
    Ok(())
}
