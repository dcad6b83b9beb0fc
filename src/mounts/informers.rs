// Copyright 2024-2026 Workspace Mounts Contributors
// SPDX-License-Identifier: Apache-2.0

//! Dynamic watches for mounted kinds.
//!
//! Kinds referenced by mount annotations are only known at runtime. The
//! [`WatchRegistry`] maps each kind to a lazily started informer whose events
//! feed the resource queue; [`GvkInformersReconciler`] is the workspace
//! pipeline step that makes sure such a watch exists for a workspace's mount.
//!
//! Watches are never torn down once started.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

use super::collaborators::{DynamicInformerFactory, ResourceInformer};
use super::error::MountError;
use super::router::enqueue_for_resource;
use super::tracker::MountTracker;
use crate::k8s::{DynamicObject, GroupVersionKind, GroupVersionResource, Mount, Workspace};
use crate::scheduler::WorkQueue;

/// Result of one step of the workspace reconciliation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStatus {
    Continue,
    StopAndRequeue,
}

/// One step of the external workspace reconciliation pipeline.
#[async_trait]
pub trait WorkspaceReconciler: Send + Sync {
    async fn reconcile(&self, workspace: &Workspace) -> Result<ReconcileStatus, MountError>;
}

/// Registry of informers started for runtime-discovered kinds.
pub struct WatchRegistry {
    factory: Arc<dyn DynamicInformerFactory>,
    resource_queue: Arc<WorkQueue<String>>,
    kinds: DashMap<GroupVersionKind, GroupVersionResource>,
    informers: DashMap<GroupVersionResource, Arc<dyn ResourceInformer>>,
}

impl WatchRegistry {
    pub fn new(factory: Arc<dyn DynamicInformerFactory>, resource_queue: Arc<WorkQueue<String>>) -> Self {
        Self {
            factory,
            resource_queue,
            kinds: DashMap::new(),
            informers: DashMap::new(),
        }
    }

    /// Make sure an informer is running for `gvk`.
    ///
    /// Calling this again for a kind that is already watched does nothing.
    pub async fn setup_gvk_informer(&self, gvk: &GroupVersionKind) -> Result<(), MountError> {
        if self.kinds.contains_key(gvk) {
            return Ok(());
        }

        let gvr = self
            .factory
            .resource_for_kind(gvk)
            .await
            .map_err(|source| MountError::Discovery { gvk: gvk.clone(), source })?;
        self.informer_for(&gvr)?;

        if self.kinds.insert(gvk.clone(), gvr.clone()).is_none() {
            info!(gvk = %gvk, gvr = %gvr, "watching mount kind");
        }
        Ok(())
    }

    /// Informer for `gvr`, starting it and wiring its events to the resource
    /// queue on first use.
    pub fn informer_for(&self, gvr: &GroupVersionResource) -> Result<Arc<dyn ResourceInformer>, MountError> {
        if let Some(informer) = self.informers.get(gvr) {
            return Ok(Arc::clone(informer.value()));
        }

        match self.informers.entry(gvr.clone()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let informer = self
                    .factory
                    .for_resource(gvr)
                    .map_err(|source| MountError::Informer { gvr: gvr.clone(), source })?;

                let queue = Arc::clone(&self.resource_queue);
                let handler_gvr = gvr.clone();
                informer.add_event_handler(Arc::new(move |obj: &DynamicObject| {
                    enqueue_for_resource(&queue, &handler_gvr, obj);
                }));
                debug!(gvr = %gvr, "started dynamic informer");

                entry.insert(Arc::clone(&informer));
                Ok(informer)
            }
        }
    }

    pub fn is_watching(&self, gvk: &GroupVersionKind) -> bool {
        self.kinds.contains_key(gvk)
    }

    /// Kinds with a running watch.
    pub fn watched_kinds(&self) -> Vec<GroupVersionKind> {
        self.kinds.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of running informers.
    pub fn informer_count(&self) -> usize {
        self.informers.len()
    }
}

/// Pipeline step that ensures a watch for the kind a workspace is mounted on.
pub struct GvkInformersReconciler {
    registry: Arc<WatchRegistry>,
    tracker: Option<Arc<MountTracker>>,
}

impl GvkInformersReconciler {
    pub fn new(registry: Arc<WatchRegistry>) -> Self {
        Self { registry, tracker: None }
    }

    /// Also register every reconciled mount with `tracker` for drift polling.
    pub fn with_tracker(mut self, tracker: Arc<MountTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }
}

#[async_trait]
impl WorkspaceReconciler for GvkInformersReconciler {
    async fn reconcile(&self, workspace: &Workspace) -> Result<ReconcileStatus, MountError> {
        let Some(raw) = workspace.mount_annotation() else {
            return Ok(ReconcileStatus::Continue);
        };
        // Invalid annotations requeue until fixed.
        let mount = Mount::parse_annotation(raw)?;

        let gvk = mount.reference.group_version_kind();
        self.registry.setup_gvk_informer(&gvk).await?;

        if let Some(tracker) = &self.tracker {
            tracker.add(workspace.cluster(), mount.reference, Arc::new(workspace.clone()));
        }
        Ok(ReconcileStatus::Continue)
    }
}

#[cfg(test)]
#[path = "informers_tests.rs"]
mod tests;
