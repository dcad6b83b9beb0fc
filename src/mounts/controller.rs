// Copyright 2024-2026 Workspace Mounts Contributors
// SPDX-License-Identifier: Apache-2.0

//! Wiring of the mount machinery.
//!
//! The controller is built before its API accessor and requeue hook exist:
//! construct it, hand [`MountsController::reconciler`] to the workspace
//! pipeline, call [`MountsController::bind`] once the collaborators are up,
//! and [`MountsController::start`] the background tasks.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::collaborators::{
    CollaboratorError, DynamicInformerFactory, MountObjectGetter, WorkspaceQueue, WorkspaceRequeuer,
};
use super::error::MountError;
use super::informers::{GvkInformersReconciler, WatchRegistry};
use super::router::ResourceRouter;
use super::tracker::MountTracker;
use crate::config::MountsConfig;
use crate::k8s::{to_cluster_aware_key, ClusterPath, Workspace};
use crate::scheduler::WorkQueue;

/// Name of the resource-event queue.
pub const RESOURCE_QUEUE_NAME: &str = "workspace-mounts-gvr";

/// Requeue hook that adds the workspace key to a workspace queue.
pub struct QueueRequeuer {
    queue: Arc<dyn WorkspaceQueue>,
}

impl QueueRequeuer {
    pub fn new(queue: Arc<dyn WorkspaceQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl WorkspaceRequeuer for QueueRequeuer {
    async fn requeue_workspace(&self, cluster: &ClusterPath, workspace: &Workspace) -> Result<(), CollaboratorError> {
        self.queue.add(to_cluster_aware_key(cluster.as_str(), "", workspace.name()));
        Ok(())
    }
}

/// Router workers, drift tracker and the watch registry they share.
pub struct MountsController {
    config: MountsConfig,
    resource_queue: Arc<WorkQueue<String>>,
    registry: Arc<WatchRegistry>,
    router: Arc<ResourceRouter>,
    tracker: Arc<MountTracker>,
}

impl MountsController {
    pub fn new(
        config: MountsConfig,
        factory: Arc<dyn DynamicInformerFactory>,
        workspace_queue: Arc<dyn WorkspaceQueue>,
    ) -> Self {
        let resource_queue = Arc::new(WorkQueue::new(RESOURCE_QUEUE_NAME, config.queue_config()));
        let registry = Arc::new(WatchRegistry::new(factory, Arc::clone(&resource_queue)));
        let router = Arc::new(ResourceRouter::new(
            Arc::clone(&resource_queue),
            Arc::clone(&registry),
            workspace_queue,
        ));
        let tracker = Arc::new(MountTracker::new(config.drift_interval, config.readiness_poll));
        Self { config, resource_queue, registry, router, tracker }
    }

    /// Pipeline step for the workspace reconciler.
    pub fn reconciler(&self) -> GvkInformersReconciler {
        GvkInformersReconciler::new(Arc::clone(&self.registry)).with_tracker(Arc::clone(&self.tracker))
    }

    /// Bind the drift tracker's collaborators. One-shot.
    pub fn bind(
        &self,
        getter: Arc<dyn MountObjectGetter>,
        requeuer: Arc<dyn WorkspaceRequeuer>,
    ) -> Result<(), MountError> {
        self.tracker.bind(getter, requeuer)
    }

    pub fn registry(&self) -> &Arc<WatchRegistry> {
        &self.registry
    }

    pub fn router(&self) -> &Arc<ResourceRouter> {
        &self.router
    }

    pub fn tracker(&self) -> &Arc<MountTracker> {
        &self.tracker
    }

    /// Spawn the router workers and the drift task.
    ///
    /// Everything stops cooperatively when `shutdown` is cancelled.
    pub fn start(&self, shutdown: CancellationToken) -> ControllerHandle {
        info!(workers = self.config.workers, "starting workspace mounts controller");
        let mut tasks = self.router.spawn_workers(self.config.workers, shutdown.clone());

        let tracker = Arc::clone(&self.tracker);
        let tracker_shutdown = shutdown.clone();
        tasks.push(tokio::spawn(async move { tracker.run(tracker_shutdown).await }));

        let queue = Arc::clone(&self.resource_queue);
        tasks.push(tokio::spawn(async move {
            shutdown.cancelled().await;
            queue.shut_down();
        }));

        ControllerHandle { tasks }
    }
}

/// Background tasks of a started controller.
pub struct ControllerHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl ControllerHandle {
    /// Wait for every task to finish.
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "mount controller task failed");
            }
        }
    }
}
