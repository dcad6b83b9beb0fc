// Copyright 2024-2026 Workspace Mounts Contributors
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes-style API types and key encoding.
//!
//! Defines the workspace, mount annotation and dynamic object types along with
//! the composite queue keys used to route events for runtime-discovered kinds.

pub mod keys;
pub mod types;
pub mod validation;

pub use keys::{to_cluster_aware_key, KeyError};
pub use types::{
    ClusterPath, DynamicObject, GroupVersionKind, GroupVersionResource, Mount, MountStatus,
    ObjectMeta, OwnerReference, ResourceReference, Workspace,
};
