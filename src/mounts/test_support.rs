// Copyright 2024-2026 Workspace Mounts Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-memory collaborators shared by the mount unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::collaborators::{CollaboratorError, DynamicInformerFactory, EventHandler, ResourceInformer, WorkspaceQueue};
use crate::k8s::keys::object_key;
use crate::k8s::types::{CLUSTER_ANNOTATION_KEY, IS_MOUNT_ANNOTATION_KEY, OWNER_ANNOTATION_KEY};
use crate::k8s::{DynamicObject, GroupVersionKind, GroupVersionResource, ObjectMeta};

#[derive(Default)]
pub(crate) struct FakeInformer {
    objects: Mutex<HashMap<String, DynamicObject>>,
    handlers: Mutex<Vec<EventHandler>>,
    pub(crate) fail_get: AtomicBool,
}

impl FakeInformer {
    /// Store an object and deliver the event to every handler.
    pub(crate) fn upsert(&self, obj: DynamicObject) {
        let key = object_key(&obj).unwrap();
        self.objects.lock().insert(key, obj.clone());
        let handlers = self.handlers.lock().clone();
        for handler in handlers {
            handler(&obj);
        }
    }

    pub(crate) fn handler_count(&self) -> usize {
        self.handlers.lock().len()
    }
}

impl ResourceInformer for FakeInformer {
    fn add_event_handler(&self, handler: EventHandler) {
        self.handlers.lock().push(handler);
    }

    fn get_by_key(&self, key: &str) -> Result<Option<DynamicObject>, CollaboratorError> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Other("indexer failure".into()));
        }
        Ok(self.objects.lock().get(key).cloned())
    }
}

#[derive(Default)]
pub(crate) struct FakeFactory {
    kinds: Mutex<HashMap<GroupVersionKind, GroupVersionResource>>,
    informers: Mutex<HashMap<GroupVersionResource, Arc<FakeInformer>>>,
    pub(crate) discovery_calls: AtomicUsize,
    pub(crate) fail_informers: AtomicBool,
}

impl FakeFactory {
    pub(crate) fn with_kind(self, gvk: GroupVersionKind, gvr: GroupVersionResource) -> Self {
        self.kinds.lock().insert(gvk, gvr);
        self
    }

    /// Informer for `gvr`, created on demand like a shared informer factory.
    pub(crate) fn informer(&self, gvr: &GroupVersionResource) -> Arc<FakeInformer> {
        Arc::clone(self.informers.lock().entry(gvr.clone()).or_default())
    }
}

#[async_trait]
impl DynamicInformerFactory for FakeFactory {
    async fn resource_for_kind(&self, gvk: &GroupVersionKind) -> Result<GroupVersionResource, CollaboratorError> {
        self.discovery_calls.fetch_add(1, Ordering::SeqCst);
        self.kinds
            .lock()
            .get(gvk)
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound(gvk.to_string()))
    }

    fn for_resource(&self, gvr: &GroupVersionResource) -> Result<Arc<dyn ResourceInformer>, CollaboratorError> {
        if self.fail_informers.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable("informer factory not started".into()));
        }
        Ok(self.informer(gvr))
    }
}

#[derive(Default)]
pub(crate) struct RecordingQueue {
    pub(crate) keys: Mutex<Vec<String>>,
}

impl WorkspaceQueue for RecordingQueue {
    fn add(&self, key: String) {
        self.keys.lock().push(key);
    }
}

pub(crate) fn kube_cluster_gvk() -> GroupVersionKind {
    GroupVersionKind::new("proxy.example.io", "v1alpha1", "KubeCluster")
}

pub(crate) fn kube_cluster_gvr() -> GroupVersionResource {
    GroupVersionResource::new("proxy.example.io", "v1alpha1", "kubeclusters")
}

/// Object in `cluster` carrying the given annotations.
pub(crate) fn annotated_object(cluster: &str, name: &str, annotations: &[(&str, &str)]) -> DynamicObject {
    let mut all: std::collections::BTreeMap<String, String> = annotations
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    all.insert(CLUSTER_ANNOTATION_KEY.to_string(), cluster.to_string());
    DynamicObject {
        api_version: "proxy.example.io/v1alpha1".to_string(),
        kind: "KubeCluster".to_string(),
        metadata: ObjectMeta {
            name: name.to_string(),
            namespace: None,
            annotations: Some(all),
        },
        data: Default::default(),
    }
}

/// Object marked as a mount and owned by workspace `owner`.
pub(crate) fn mount_object(cluster: &str, name: &str, owner: &str) -> DynamicObject {
    let owner_json = format!(r#"{{"apiVersion":"tenancy.kcp.io/v1alpha1","kind":"Workspace","name":"{owner}"}}"#);
    annotated_object(
        cluster,
        name,
        &[(IS_MOUNT_ANNOTATION_KEY, "true"), (OWNER_ANNOTATION_KEY, owner_json.as_str())],
    )
}
