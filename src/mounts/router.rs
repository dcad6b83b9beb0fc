// Copyright 2024-2026 Workspace Mounts Contributors
// SPDX-License-Identifier: Apache-2.0

//! Routing of dynamic object events back to their owning workspaces.
//!
//! Informers for mounted kinds push every event through
//! [`enqueue_for_resource`] onto the shared resource queue. A pool of workers
//! drains that queue; for each key the router looks the object up, keeps it
//! only if it is marked as a mount, and enqueues the workspace named by its
//! owner annotation on the workspace queue.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn, Instrument};

use super::collaborators::WorkspaceQueue;
use super::error::MountError;
use super::informers::WatchRegistry;
use crate::k8s::keys::{decode_resource_key, encode_resource_key, to_cluster_aware_key};
use crate::k8s::types::{IS_MOUNT_ANNOTATION_KEY, OWNER_ANNOTATION_KEY, WORKSPACE_KIND};
use crate::k8s::{DynamicObject, GroupVersionResource, OwnerReference};
use crate::scheduler::WorkQueue;

/// Queue an event on `obj` for the resource workers. Never blocks.
pub fn enqueue_for_resource(queue: &WorkQueue<String>, gvr: &GroupVersionResource, obj: &DynamicObject) {
    match encode_resource_key(gvr, obj) {
        Ok(key) => {
            trace!(key = %key, "queuing resource");
            queue.add(key);
        }
        Err(e) => warn!(gvr = %gvr, error = %e, "unable to build queue key for object"),
    }
}

/// Correlates mount objects with the workspaces that own them.
pub struct ResourceRouter {
    resource_queue: Arc<WorkQueue<String>>,
    registry: Arc<WatchRegistry>,
    workspace_queue: Arc<dyn WorkspaceQueue>,
}

impl ResourceRouter {
    pub fn new(
        resource_queue: Arc<WorkQueue<String>>,
        registry: Arc<WatchRegistry>,
        workspace_queue: Arc<dyn WorkspaceQueue>,
    ) -> Self {
        Self { resource_queue, registry, workspace_queue }
    }

    /// Process one resource-queue key.
    ///
    /// Objects that are missing, not marked as mounts or have no owner
    /// annotation are ignored with `Ok`. Errors are classified by
    /// [`MountError::is_retryable`].
    pub fn process_gvk(&self, key: &str) -> Result<(), MountError> {
        let (gvr, object_key) = decode_resource_key(key)?;
        let informer = self.registry.informer_for(&gvr)?;

        let Some(obj) = informer.get_by_key(object_key).map_err(MountError::Cache)? else {
            debug!(gvr = %gvr, key = object_key, "resource not found");
            return Ok(());
        };

        if obj.annotation(IS_MOUNT_ANNOTATION_KEY) != Some("true") {
            return Ok(());
        }
        let Some(owner_raw) = obj.annotation(OWNER_ANNOTATION_KEY) else {
            return Ok(());
        };

        let owner: OwnerReference = serde_json::from_str(owner_raw).map_err(MountError::OwnerDecode)?;
        if owner.kind != WORKSPACE_KIND {
            return Err(MountError::OwnerNotWorkspace(owner.kind));
        }

        let cluster = obj.cluster();
        let workspace_key = to_cluster_aware_key(cluster.as_str(), "", &owner.name);
        debug!(workspace = %workspace_key, gvr = %gvr, "queuing mounted workspace");
        metrics::counter!("mount_workspace_enqueues_total").increment(1);
        self.workspace_queue.add(workspace_key);
        Ok(())
    }

    /// Start `count` workers draining the resource queue until `shutdown`
    /// fires or the queue shuts down.
    pub fn spawn_workers(self: &Arc<Self>, count: usize, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
        (0..count)
            .map(|id| {
                let router = Arc::clone(self);
                let shutdown = shutdown.clone();
                tokio::spawn(
                    async move { router.run_worker(shutdown).await }
                        .instrument(tracing::debug_span!("mount_worker", id)),
                )
            })
            .collect()
    }

    async fn run_worker(&self, shutdown: CancellationToken) {
        loop {
            let key = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                key = self.resource_queue.get() => match key {
                    Some(key) => key,
                    None => break,
                },
            };
            self.handle_key(&key);
        }
        debug!("mount worker stopped");
    }

    /// Process `key` fully, then release it on the queue.
    pub(crate) fn handle_key(&self, key: &str) {
        let owned = key.to_string();
        match self.process_gvk(key) {
            Ok(()) => self.resource_queue.forget(&owned),
            Err(e) if e.is_retryable() => {
                warn!(key, error = %e, "failed to sync mount resource, requeuing");
                self.resource_queue.add_rate_limited(owned.clone());
            }
            Err(e) => {
                error!(key, error = %e, "dropping mount resource key");
                metrics::counter!("mount_keys_dropped_total").increment(1);
                self.resource_queue.forget(&owned);
            }
        }
        self.resource_queue.done(&owned);
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
