// Copyright 2024-2026 Workspace Mounts Contributors
// SPDX-License-Identifier: Apache-2.0

//! Path-prefix handler mappings of the front proxy.

use serde::{Deserialize, Serialize};

/// A handler registered for a path prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerMapping {
    pub prefix: String,
    pub backend: String,
    /// Higher weights are matched first.
    pub weight: i32,
}

/// Order mappings by descending weight. Equal weights keep their input order.
pub fn sort_mappings(mut mappings: Vec<HandlerMapping>) -> Vec<HandlerMapping> {
    mappings.sort_by(|a, b| b.weight.cmp(&a.weight));
    mappings
}
