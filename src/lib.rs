// Copyright 2024-2026 Workspace Mounts Contributors
// SPDX-License-Identifier: Apache-2.0

//! Workspace mounts.
//!
//! A workspace can be mounted onto an external object whose kind is only
//! known at runtime. This crate watches those kinds as they are discovered,
//! routes events on mounted objects back to the owning workspace, and polls
//! mounted objects for status drift that the event path missed.

pub mod config;
pub mod k8s;
pub mod mounts;
pub mod proxy;
pub mod scheduler;
pub mod telemetry;

pub use config::{ConfigError, MountsConfig};
pub use mounts::{MountError, MountsController, ReconcileStatus};
