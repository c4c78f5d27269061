// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-site identifier assignment
//!
//! Each call site gets two identifiers, assigned in program order:
//!
//! - `unique_id`: strictly positive and unique within the function
//!   (`1, 2, 3, …`).
//! - `dummy_id`: the running site counter reduced modulo the
//!   configured modulus (`0, 1, …, M-1, 0, 1, …`), together with a
//!   `reset_count` recording how many times the counter has wrapped.
//!
//! The active [`IdMode`] selects which identifier is emitted by the
//! instrumented program and matched by the engine. Both values are
//! recorded in the policy artifact regardless, so either mode can be
//! enforced from the same artifact.

use serde::{Deserialize, Serialize};

/// Default modulus for dummy-id assignment.
pub const DEFAULT_MODULUS: u32 = 200;

/// Which identifier is emitted at run time and matched by edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdMode {
    /// Match on the dummy id (site order modulo the modulus).
    #[default]
    Dummy,
    /// Match on the unique id (site order, 1-based).
    Unique,
}

impl IdMode {
    /// Tag used in the artifact and in log output.
    pub fn as_str(self) -> &'static str {
        match self {
            IdMode::Dummy => "dummy",
            IdMode::Unique => "unique",
        }
    }
}

impl std::fmt::Display for IdMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifiers assigned to one call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteIds {
    /// 1-based site order within the function.
    pub unique_id: i32,
    /// Site order modulo the modulus.
    pub dummy_id: i32,
    /// Number of times the dummy counter has wrapped before this site.
    pub reset_count: i32,
}

impl SiteIds {
    /// The identifier selected by `mode`.
    pub fn select(&self, mode: IdMode) -> i32 {
        match mode {
            IdMode::Dummy => self.dummy_id,
            IdMode::Unique => self.unique_id,
        }
    }
}

/// Allocates per-site identifiers for one function.
#[derive(Debug)]
pub struct IdAssigner {
    modulus: u32,
    unique_counter: u32,
    dummy_counter: u32,
}

impl IdAssigner {
    /// Create an assigner with the given modulus (clamped to ≥ 1).
    pub fn new(modulus: u32) -> Self {
        Self {
            modulus: modulus.max(1),
            unique_counter: 0,
            dummy_counter: 0,
        }
    }

    /// The modulus in effect.
    pub fn modulus(&self) -> u32 {
        self.modulus
    }

    /// Assign identifiers to the next call site in program order.
    pub fn next_site(&mut self) -> SiteIds {
        self.unique_counter += 1;
        let dummy_id = self.dummy_counter % self.modulus;
        let reset_count = self.dummy_counter / self.modulus;
        self.dummy_counter += 1;

        SiteIds {
            unique_id: self.unique_counter as i32,
            dummy_id: dummy_id as i32,
            reset_count: reset_count as i32,
        }
    }
}
