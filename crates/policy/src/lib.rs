// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Policy artifact and install-blob formats
//!
//! This crate owns the two serialised forms an automaton travels in:
//!
//! - The **policy artifact** ([`artifact`]): a self-describing JSON
//!   document aggregating one entry per function, produced by the
//!   extractor and consumed by the loader. Both identifier kinds are
//!   recorded for every node and edge, so one artifact can be enforced
//!   in either id mode.
//! - The **install blob** ([`blob`]): the packed little-endian wire
//!   format handed to the enforcement engine. It carries a single
//!   function's transitions with the match id already resolved for the
//!   selected mode; the engine derives the start set itself, so the
//!   blob stays the only source of truth for the automaton's shape.

pub mod artifact;
pub mod blob;
pub mod error;

pub use artifact::{ArtifactEdge, CallSite, FunctionPolicy, PolicyArtifact, EPSILON_LABEL};
pub use blob::{decode, encode, InstallRequest, EDGE_RECORD_LEN, HEADER_LEN};
pub use error::{PolicyError, PolicyResult};
