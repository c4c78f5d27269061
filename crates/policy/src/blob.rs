// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Engine install blob (packed, little-endian)
//!
//! Layout:
//!
//! ```text
//! header:  pid:u32  num_nodes:u32  num_edges:u32  id_mode:u32
//! edges:   num_edges × { src:u32  dst:u32  match_id:i32  is_epsilon:u8 }
//! ```
//!
//! `id_mode` is 0 for dummy, 1 for unique. For ε edges `match_id` is
//! written as `-1` and ignored by the engine. The blob deliberately
//! omits the start set: the engine derives it from the edges, so the
//! automaton's shape has a single source of truth.

use automaton::{IdMode, Transition, UNASSIGNED_ID};

use crate::{
    artifact::FunctionPolicy,
    error::{PolicyError, PolicyResult},
};

/// Header size in bytes.
pub const HEADER_LEN: usize = 16;
/// Packed edge record size in bytes.
pub const EDGE_RECORD_LEN: usize = 13;

const ID_MODE_DUMMY: u32 = 0;
const ID_MODE_UNIQUE: u32 = 1;

fn id_mode_tag(mode: IdMode) -> u32 {
    match mode {
        IdMode::Dummy => ID_MODE_DUMMY,
        IdMode::Unique => ID_MODE_UNIQUE,
    }
}

/// Decoded install blob, ready to hand to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub pid: u32,
    pub num_nodes: u32,
    pub id_mode: IdMode,
    pub transitions: Vec<Transition>,
}

/// Encode one function's automaton for installation.
///
/// Validates the function first; the match id of every consuming edge
/// is resolved for `mode`.
pub fn encode(pid: u32, function: &FunctionPolicy, mode: IdMode) -> PolicyResult<Vec<u8>> {
    function.validate()?;
    let transitions = function.transitions(mode);

    let mut bytes = Vec::with_capacity(HEADER_LEN + transitions.len() * EDGE_RECORD_LEN);
    bytes.extend_from_slice(&pid.to_le_bytes());
    bytes.extend_from_slice(&(function.num_nodes() as u32).to_le_bytes());
    bytes.extend_from_slice(&(transitions.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&id_mode_tag(mode).to_le_bytes());

    for t in &transitions {
        bytes.extend_from_slice(&t.src.to_le_bytes());
        bytes.extend_from_slice(&t.dst.to_le_bytes());
        let match_id = if t.epsilon { UNASSIGNED_ID } else { t.match_id };
        bytes.extend_from_slice(&match_id.to_le_bytes());
        bytes.push(t.epsilon as u8);
    }

    Ok(bytes)
}

/// Decode an install blob.
///
/// Rejects truncated input, trailing bytes, and unknown id-mode tags.
/// Endpoint range checks are the engine's job; the blob only promises
/// structural integrity.
pub fn decode(bytes: &[u8]) -> PolicyResult<InstallRequest> {
    if bytes.len() < HEADER_LEN {
        return Err(PolicyError::TruncatedBlob {
            expected: HEADER_LEN,
            actual: bytes.len(),
        });
    }

    let pid = read_u32(bytes, 0);
    let num_nodes = read_u32(bytes, 4);
    let num_edges = read_u32(bytes, 8) as usize;
    let id_mode = match read_u32(bytes, 12) {
        ID_MODE_DUMMY => IdMode::Dummy,
        ID_MODE_UNIQUE => IdMode::Unique,
        value => return Err(PolicyError::UnknownIdMode { value }),
    };

    let expected = HEADER_LEN + num_edges * EDGE_RECORD_LEN;
    if bytes.len() < expected {
        return Err(PolicyError::TruncatedBlob {
            expected,
            actual: bytes.len(),
        });
    }
    if bytes.len() > expected {
        return Err(PolicyError::TrailingBytes {
            extra: bytes.len() - expected,
        });
    }

    let mut transitions = Vec::with_capacity(num_edges);
    for index in 0..num_edges {
        let offset = HEADER_LEN + index * EDGE_RECORD_LEN;
        transitions.push(Transition {
            src: read_u32(bytes, offset),
            dst: read_u32(bytes, offset + 4),
            match_id: read_u32(bytes, offset + 8) as i32,
            epsilon: bytes[offset + 12] != 0,
        });
    }

    Ok(InstallRequest {
        pid,
        num_nodes,
        id_mode,
        transitions,
    })
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}
