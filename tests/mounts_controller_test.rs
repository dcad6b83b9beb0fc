// Copyright 2024-2026 Workspace Mounts Contributors
// SPDX-License-Identifier: Apache-2.0

//! Controller-level tests: reconcile, event routing and drift polling
//! through the public API with in-memory collaborators.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use workspace_mounts::k8s::keys::object_key;
use workspace_mounts::k8s::types::{
    CLUSTER_ANNOTATION_KEY, IS_MOUNT_ANNOTATION_KEY, MOUNT_ANNOTATION_KEY, OWNER_ANNOTATION_KEY,
};
use workspace_mounts::k8s::{
    to_cluster_aware_key, ClusterPath, DynamicObject, GroupVersionKind, GroupVersionResource, ObjectMeta,
    ResourceReference, Workspace,
};
use workspace_mounts::mounts::{
    CollaboratorError, DynamicInformerFactory, EventHandler, MountObjectGetter, QueueRequeuer, ResourceInformer,
    WorkspaceReconciler,
};
use workspace_mounts::scheduler::{WorkQueue, WorkQueueConfig};
use workspace_mounts::{MountError, MountsConfig, MountsController, ReconcileStatus};

// ============================================================================
// In-memory collaborators
// ============================================================================

#[derive(Default)]
struct MemoryInformer {
    objects: Mutex<HashMap<String, DynamicObject>>,
    handlers: Mutex<Vec<EventHandler>>,
}

impl MemoryInformer {
    fn upsert(&self, obj: DynamicObject) {
        self.objects.lock().insert(object_key(&obj).unwrap(), obj.clone());
        let handlers = self.handlers.lock().clone();
        for handler in handlers {
            handler(&obj);
        }
    }
}

impl ResourceInformer for MemoryInformer {
    fn add_event_handler(&self, handler: EventHandler) {
        self.handlers.lock().push(handler);
    }

    fn get_by_key(&self, key: &str) -> Result<Option<DynamicObject>, CollaboratorError> {
        Ok(self.objects.lock().get(key).cloned())
    }
}

struct MemoryApi {
    informer: Arc<MemoryInformer>,
}

impl MemoryApi {
    fn new() -> Arc<Self> {
        Arc::new(Self { informer: Arc::new(MemoryInformer::default()) })
    }
}

#[async_trait]
impl DynamicInformerFactory for MemoryApi {
    async fn resource_for_kind(&self, gvk: &GroupVersionKind) -> Result<GroupVersionResource, CollaboratorError> {
        if gvk == &gvk_kube_cluster() {
            Ok(gvr_kube_clusters())
        } else {
            Err(CollaboratorError::NotFound(gvk.to_string()))
        }
    }

    fn for_resource(&self, gvr: &GroupVersionResource) -> Result<Arc<dyn ResourceInformer>, CollaboratorError> {
        if gvr == &gvr_kube_clusters() {
            Ok(self.informer.clone())
        } else {
            Err(CollaboratorError::Unavailable(gvr.to_string()))
        }
    }
}

#[async_trait]
impl MountObjectGetter for MemoryApi {
    async fn get_mount_object(
        &self,
        cluster: &ClusterPath,
        reference: &ResourceReference,
    ) -> Result<DynamicObject, CollaboratorError> {
        let key = to_cluster_aware_key(cluster.as_str(), &reference.namespace, &reference.name);
        self.informer
            .get_by_key(&key)?
            .ok_or(CollaboratorError::NotFound(key))
    }
}

fn gvk_kube_cluster() -> GroupVersionKind {
    GroupVersionKind::new("proxy.example.io", "v1alpha1", "KubeCluster")
}

fn gvr_kube_clusters() -> GroupVersionResource {
    GroupVersionResource::new("proxy.example.io", "v1alpha1", "kubeclusters")
}

fn annotations(pairs: &[(&str, &str)]) -> Option<BTreeMap<String, String>> {
    Some(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
}

fn mounted_workspace(name: &str) -> Workspace {
    let mount = json!({
        "reference": {
            "group": "proxy.example.io",
            "version": "v1alpha1",
            "kind": "KubeCluster",
            "name": "proxy-cluster",
        }
    })
    .to_string();
    Workspace {
        metadata: ObjectMeta {
            name: name.to_string(),
            namespace: None,
            annotations: annotations(&[(CLUSTER_ANNOTATION_KEY, "root:org"), (MOUNT_ANNOTATION_KEY, mount.as_str())]),
        },
    }
}

fn kube_cluster(owner: &str, status: Option<serde_json::Value>) -> DynamicObject {
    let owner = json!({"apiVersion": "tenancy.kcp.io/v1alpha1", "kind": "Workspace", "name": owner}).to_string();
    let mut obj = DynamicObject {
        api_version: "proxy.example.io/v1alpha1".to_string(),
        kind: "KubeCluster".to_string(),
        metadata: ObjectMeta {
            name: "proxy-cluster".to_string(),
            namespace: None,
            annotations: annotations(&[
                (CLUSTER_ANNOTATION_KEY, "root:org"),
                (IS_MOUNT_ANNOTATION_KEY, "true"),
                (OWNER_ANNOTATION_KEY, owner.as_str()),
            ]),
        },
        data: Default::default(),
    };
    if let Some(status) = status {
        obj.data.insert("status".to_string(), status);
    }
    obj
}

struct Harness {
    api: Arc<MemoryApi>,
    workspaces: Arc<WorkQueue<String>>,
    controller: MountsController,
}

fn harness() -> Harness {
    let api = MemoryApi::new();
    let workspaces = Arc::new(WorkQueue::new("workspaces", WorkQueueConfig::default()));
    let config = MountsConfig { workers: 2, ..Default::default() };
    let controller = MountsController::new(config, api.clone(), workspaces.clone());
    Harness { api, workspaces, controller }
}

async fn next_workspace(queue: &WorkQueue<String>) -> String {
    tokio::time::timeout(Duration::from_secs(60), queue.get())
        .await
        .expect("workspace key within timeout")
        .expect("workspace queue open")
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn mount_event_requeues_owning_workspace() {
    let h = harness();
    let shutdown = CancellationToken::new();
    let handle = h.controller.start(shutdown.clone());

    let status = h.controller.reconciler().reconcile(&mounted_workspace("w1")).await.unwrap();
    assert_eq!(status, ReconcileStatus::Continue);
    assert!(h.controller.registry().is_watching(&gvk_kube_cluster()));

    h.api.informer.upsert(kube_cluster("w1", None));
    let key = next_workspace(&h.workspaces).await;
    assert_eq!(key, to_cluster_aware_key("root:org", "", "w1"));

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle.join()).await.unwrap();
}

#[tokio::test]
async fn unknown_kind_stops_pipeline_for_requeue() {
    let h = harness();
    let mut workspace = mounted_workspace("w1");
    let mount = json!({"reference": {"group": "other.io", "version": "v1", "kind": "Gone", "name": "x"}}).to_string();
    workspace
        .metadata
        .annotations
        .as_mut()
        .unwrap()
        .insert(MOUNT_ANNOTATION_KEY.to_string(), mount);

    let err = h.controller.reconciler().reconcile(&workspace).await.unwrap_err();
    assert!(matches!(err, MountError::Discovery { .. }));
    assert_eq!(err.reconcile_status(), ReconcileStatus::StopAndRequeue);
    assert!(h.controller.tracker().is_empty());
}

// ============================================================================
// Drift detection
// ============================================================================

#[tokio::test(start_paused = true)]
async fn drift_poll_requeues_on_status_change() {
    let h = harness();
    h.controller
        .bind(h.api.clone(), Arc::new(QueueRequeuer::new(h.workspaces.clone())))
        .unwrap();
    h.controller.reconciler().reconcile(&mounted_workspace("w1")).await.unwrap();
    assert_eq!(h.controller.tracker().len(), 1);

    // Objects that never reach the informer still get polled.
    h.api.informer.objects.lock().insert(
        to_cluster_aware_key("root:org", "", "proxy-cluster"),
        kube_cluster("w1", Some(json!({"URL": "https://shard-1", "phase": "Ready"}))),
    );

    let shutdown = CancellationToken::new();
    let handle = h.controller.start(shutdown.clone());

    let key = next_workspace(&h.workspaces).await;
    assert_eq!(key, to_cluster_aware_key("root:org", "", "w1"));
    let tracked = h.controller.tracker().keys();
    let entry = h.controller.tracker().get(&tracked[0]).unwrap();
    assert_eq!(entry.last_seen_url, "https://shard-1");
    assert_eq!(entry.last_seen_phase, "Ready");

    // Unchanged status over further ticks: nothing new.
    h.workspaces.done(&key);
    tokio::time::sleep(Duration::from_secs(45)).await;
    assert!(h.workspaces.is_empty());

    shutdown.cancel();
    handle.join().await;
}

#[tokio::test(start_paused = true)]
async fn deleted_mount_object_stops_tracking() {
    let h = harness();
    h.controller
        .bind(h.api.clone(), Arc::new(QueueRequeuer::new(h.workspaces.clone())))
        .unwrap();
    h.controller.reconciler().reconcile(&mounted_workspace("w1")).await.unwrap();

    let shutdown = CancellationToken::new();
    let handle = h.controller.start(shutdown.clone());

    tokio::time::sleep(Duration::from_secs(16)).await;
    assert!(h.controller.tracker().is_empty());
    assert!(h.workspaces.is_empty());

    shutdown.cancel();
    handle.join().await;
}

#[tokio::test]
async fn second_bind_is_rejected() {
    let h = harness();
    let requeuer = Arc::new(QueueRequeuer::new(h.workspaces.clone()));
    h.controller.bind(h.api.clone(), requeuer.clone()).unwrap();
    assert!(matches!(h.controller.bind(h.api.clone(), requeuer), Err(MountError::AlreadyBound)));
}
