// Copyright 2024-2026 Workspace Mounts Contributors
// SPDX-License-Identifier: Apache-2.0

//! API object types for workspace mounts.
//!
//! Mounted objects have kinds that are only known at runtime, so they are
//! carried as [`DynamicObject`]s: typed metadata plus the rest of the document
//! as JSON. Workspaces and the mount annotation payloads are fully typed.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use super::validation::{validate_cluster_path, validate_reference, ValidationError};

/// Kind name of the owner a mounted object must point at.
pub const WORKSPACE_KIND: &str = "Workspace";

/// Workspace annotation holding the JSON-encoded [`Mount`].
pub const MOUNT_ANNOTATION_KEY: &str = "experimental.tenancy.kcp.io/mount";

/// Object annotation marking it as a mount target. Only the literal `"true"` counts.
pub const IS_MOUNT_ANNOTATION_KEY: &str = "experimental.tenancy.kcp.io/is-mount";

/// Object annotation holding the JSON-encoded [`OwnerReference`].
pub const OWNER_ANNOTATION_KEY: &str = "experimental.tenancy.kcp.io/owner";

/// Annotation carrying the logical cluster an object lives in.
pub const CLUSTER_ANNOTATION_KEY: &str = "kcp.io/cluster";

/// Logical cluster path, e.g. `root:org:team`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterPath(String);

impl ClusterPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ClusterPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClusterPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// Runtime type identifier of an API kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupVersionKind {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    pub fn new(group: &str, version: &str, kind: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
        }
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}, Kind={}", self.version, self.kind)
        } else {
            write!(f, "{}/{}, Kind={}", self.group, self.version, self.kind)
        }
    }
}

/// Runtime identifier of a served resource, the form informers are keyed by.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupVersionResource {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl GroupVersionResource {
    pub fn new(group: &str, version: &str, resource: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            resource: resource.to_string(),
        }
    }
}

impl fmt::Display for GroupVersionResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}, Resource={}", self.version, self.resource)
        } else {
            write!(f, "{}/{}, Resource={}", self.group, self.version, self.resource)
        }
    }
}

/// Coordinates of one mounted object inside one logical cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceReference {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub name: String,
}

impl ResourceReference {
    pub fn group_version_kind(&self) -> GroupVersionKind {
        GroupVersionKind::new(&self.group, &self.version, &self.kind)
    }
}

/// Status a mounted object reports back through the mount annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountStatus {
    #[serde(rename = "URL", default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phase: String,
}

/// Mount declaration stored in [`MOUNT_ANNOTATION_KEY`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    pub reference: ResourceReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MountStatus>,
}

impl Mount {
    /// Parse and validate a mount annotation value.
    ///
    /// # Errors
    /// Returns a `ValidationError` if the JSON is malformed or the reference
    /// is incomplete.
    pub fn parse_annotation(raw: &str) -> Result<Self, ValidationError> {
        let mount: Mount = serde_json::from_str(raw)
            .map_err(|e| ValidationError::MalformedJson(e.to_string()))?;
        validate_reference(&mount.reference)?;
        Ok(mount)
    }
}

/// Owner stored in [`OWNER_ANNOTATION_KEY`] of a mounted object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    #[serde(default)]
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
}

/// Common object metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

impl ObjectMeta {
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.as_ref()?.get(key).map(String::as_str)
    }

    /// Logical cluster recorded on the object, empty if unset.
    pub fn cluster(&self) -> ClusterPath {
        self.annotation(CLUSTER_ANNOTATION_KEY)
            .map(ClusterPath::new)
            .unwrap_or_default()
    }
}

/// Object of a kind not known at compile time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicObject {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(flatten)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// `status` of a mounted object did not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("status shape mismatch: {0}")]
pub struct ShapeMismatch(pub String);

impl DynamicObject {
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata.annotation(key)
    }

    pub fn cluster(&self) -> ClusterPath {
        self.metadata.cluster()
    }

    /// Decode `status.URL` and `status.phase`.
    ///
    /// Both fields must be present strings. Anything else means the mounted
    /// object is not ready yet.
    pub fn mount_status(&self) -> Result<MountStatus, ShapeMismatch> {
        #[derive(Deserialize)]
        struct StrictStatus {
            #[serde(rename = "URL")]
            url: String,
            phase: String,
        }

        let status = self
            .data
            .get("status")
            .ok_or_else(|| ShapeMismatch("missing status".to_string()))?;
        let strict = StrictStatus::deserialize(status)
            .map_err(|e| ShapeMismatch(e.to_string()))?;
        Ok(MountStatus { url: strict.url, phase: strict.phase })
    }
}

/// Workspace as seen by the mount machinery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub metadata: ObjectMeta,
}

impl Workspace {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn cluster(&self) -> ClusterPath {
        self.metadata.cluster()
    }

    /// Raw mount annotation, if the workspace declares one.
    pub fn mount_annotation(&self) -> Option<&str> {
        self.metadata.annotation(MOUNT_ANNOTATION_KEY)
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
