// Copyright 2024-2026 Workspace Mounts Contributors
// SPDX-License-Identifier: Apache-2.0

//! Workspace mounts: dynamic watches, event routing and drift detection.

pub mod collaborators;
pub mod controller;
pub mod error;
pub mod informers;
pub mod router;
pub mod tracker;

#[cfg(test)]
mod test_support;

pub use collaborators::{
    CollaboratorError, DynamicInformerFactory, EventHandler, MountObjectGetter, ResourceInformer, WorkspaceQueue,
    WorkspaceRequeuer,
};
pub use controller::{ControllerHandle, MountsController, QueueRequeuer};
pub use error::MountError;
pub use informers::{GvkInformersReconciler, ReconcileStatus, WatchRegistry, WorkspaceReconciler};
pub use router::{enqueue_for_resource, ResourceRouter};
pub use tracker::{MountTracker, TrackerEntry, TrackerKey};
