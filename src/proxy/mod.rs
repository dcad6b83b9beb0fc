// Copyright 2024-2026 Workspace Mounts Contributors
// SPDX-License-Identifier: Apache-2.0

//! Front proxy helpers.

pub mod mapping;

pub use mapping::{sort_mappings, HandlerMapping};
