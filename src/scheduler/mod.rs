// Copyright 2024-2026 Workspace Mounts Contributors
// SPDX-License-Identifier: Apache-2.0

//! Work scheduling primitives.

pub mod queue;

pub use queue::{WorkQueue, WorkQueueConfig};
