// Copyright 2024-2026 Workspace Mounts Contributors
// SPDX-License-Identifier: Apache-2.0

//! Seams to the rest of the control plane.
//!
//! Discovery, informers, API access and the workspace lifecycle are owned
//! elsewhere; this crate only talks to them through these traits.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::k8s::{ClusterPath, DynamicObject, GroupVersionKind, GroupVersionResource, ResourceReference, Workspace};
use crate::scheduler::WorkQueue;

/// Failure reported by an external collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Other(String),
}

impl CollaboratorError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Callback invoked for every add, update and delete an informer observes.
pub type EventHandler = Arc<dyn Fn(&DynamicObject) + Send + Sync>;

/// Live, cached watch on one resource.
pub trait ResourceInformer: Send + Sync {
    /// Register a handler for future events.
    fn add_event_handler(&self, handler: EventHandler);

    /// Look an object up in the informer cache by its cluster-aware key.
    ///
    /// `Ok(None)` means the object is not (or no longer) in the cache.
    fn get_by_key(&self, key: &str) -> Result<Option<DynamicObject>, CollaboratorError>;
}

/// Discovery-backed factory of informers for arbitrary resources.
#[async_trait]
pub trait DynamicInformerFactory: Send + Sync {
    /// Resolve the resource served for a kind.
    async fn resource_for_kind(
        &self,
        gvk: &GroupVersionKind,
    ) -> Result<GroupVersionResource, CollaboratorError>;

    /// Start, or return the already started, informer for a resource.
    fn for_resource(
        &self,
        gvr: &GroupVersionResource,
    ) -> Result<Arc<dyn ResourceInformer>, CollaboratorError>;
}

/// Live read of a mounted object.
#[async_trait]
pub trait MountObjectGetter: Send + Sync {
    async fn get_mount_object(
        &self,
        cluster: &ClusterPath,
        reference: &ResourceReference,
    ) -> Result<DynamicObject, CollaboratorError>;
}

/// Hook back into the workspace lifecycle.
#[async_trait]
pub trait WorkspaceRequeuer: Send + Sync {
    async fn requeue_workspace(
        &self,
        cluster: &ClusterPath,
        workspace: &Workspace,
    ) -> Result<(), CollaboratorError>;
}

/// Queue feeding the workspace reconciler.
pub trait WorkspaceQueue: Send + Sync {
    fn add(&self, key: String);
}

impl WorkspaceQueue for WorkQueue<String> {
    fn add(&self, key: String) {
        WorkQueue::add(self, key);
    }
}
