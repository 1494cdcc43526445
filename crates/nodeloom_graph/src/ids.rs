// SPDX-License-Identifier: MIT OR Apache-2.0
//! Deterministic id generation for graph entities.
//!
//! Ids are human-readable strings (`node-1`, `conn-3`). Each generator
//! instance owns its own counters so sessions and tests start from a clean
//! slate; there is no process-wide state.

use std::collections::HashMap;

/// Prefix used for generated node ids.
pub const NODE_ID_PREFIX: &str = "node";
/// Prefix used for generated connection ids.
pub const CONNECTION_ID_PREFIX: &str = "conn";

/// Counter-based id generator, one counter per prefix.
#[derive(Debug, Default)]
pub struct IdGenerator {
    counters: HashMap<String, u64>,
}

impl IdGenerator {
    /// Create a generator with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the next id for `prefix`, formatted as `<prefix>-<n>`.
    pub fn next(&mut self, prefix: &str) -> String {
        let counter = self.counters.entry(prefix.to_owned()).or_insert(0);
        *counter += 1;
        format!("{prefix}-{counter}")
    }

    /// Produce the next id for `prefix` that `is_taken` rejects.
    ///
    /// Skips over ids already present in the graph, e.g. after loading a
    /// document that used the same naming scheme.
    pub fn next_free(&mut self, prefix: &str, mut is_taken: impl FnMut(&str) -> bool) -> String {
        loop {
            let id = self.next(prefix);
            if !is_taken(&id) {
                return id;
            }
        }
    }

    /// Reset every counter to zero.
    pub fn reset(&mut self) {
        self.counters.clear();
    }
}
