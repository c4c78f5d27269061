//! Error types for the enforcement engine

use thiserror::Error;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Reasons an install is refused.
///
/// Install failures never disturb a previously installed policy for
/// the same pid; observation has no error path at all (a violation is
/// an outcome, not an error).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("policy has no nodes")]
    EmptyAutomaton,

    #[error("policy has {count} edges, exceeding the cap of {max}")]
    TooManyEdges { count: usize, max: usize },

    #[error("edge {index} ({src} -> {dst}) out of range for {num_nodes} nodes")]
    EdgeOutOfRange {
        index: usize,
        src: u32,
        dst: u32,
        num_nodes: u32,
    },

    #[error("malformed install blob: {0}")]
    MalformedBlob(#[from] policy::PolicyError),
}
