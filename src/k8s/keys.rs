// Copyright 2024-2026 Workspace Mounts Contributors
// SPDX-License-Identifier: Apache-2.0

//! Composite routing keys.
//!
//! Resource events travel through the resource queue as
//! `"<resource>.<version>.<group>::<cluster-aware key>"`, where the
//! cluster-aware key is `"<cluster>|<namespace>/<name>"` (or
//! `"<cluster>|<name>"` for cluster-scoped objects). Workspaces travel
//! through their own queue as plain cluster-aware keys.

use thiserror::Error;

use super::types::{ClusterPath, DynamicObject, GroupVersionResource};

/// Separator between the kind selector and the object key.
pub const KIND_SEPARATOR: &str = "::";

/// Separator between the logical cluster and the rest of an object key.
pub const CLUSTER_SEPARATOR: char = '|';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("unexpected key format: {0}")]
    UnexpectedFormat(String),

    #[error("unable to parse resource string: {0}")]
    InvalidResource(String),

    #[error("object has no name")]
    MissingName,
}

/// Encode a resource as its kind selector, `resource.version.group`.
///
/// The core group encodes with a trailing dot (`pods.v1.`) so that the
/// selector always carries two dots and decodes back to an empty group.
pub fn encode_resource(gvr: &GroupVersionResource) -> String {
    [gvr.resource.as_str(), gvr.version.as_str(), gvr.group.as_str()].join(".")
}

/// Parse a `resource.version.group` kind selector.
///
/// The group may itself contain dots and may be empty; resource and
/// version may not.
pub fn parse_resource(selector: &str) -> Result<GroupVersionResource, KeyError> {
    let mut parts = selector.splitn(3, '.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(resource), Some(version), Some(group))
            if !resource.is_empty() && !version.is_empty() =>
        {
            Ok(GroupVersionResource::new(group, version, resource))
        }
        _ => Err(KeyError::InvalidResource(selector.to_string())),
    }
}

/// Build the cluster-aware key of an object from its coordinates.
pub fn to_cluster_aware_key(cluster: &str, namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        format!("{cluster}{CLUSTER_SEPARATOR}{name}")
    } else {
        format!("{cluster}{CLUSTER_SEPARATOR}{namespace}/{name}")
    }
}

/// Split a cluster-aware key into `(cluster, namespace, name)`.
pub fn split_cluster_aware_key(key: &str) -> Result<(ClusterPath, String, String), KeyError> {
    let (cluster, rest) = key
        .split_once(CLUSTER_SEPARATOR)
        .ok_or_else(|| KeyError::UnexpectedFormat(key.to_string()))?;

    let (namespace, name) = match rest.split_once('/') {
        Some((namespace, name)) => (namespace, name),
        None => ("", rest),
    };
    if name.is_empty() || name.contains('/') {
        return Err(KeyError::UnexpectedFormat(key.to_string()));
    }
    Ok((ClusterPath::new(cluster), namespace.to_string(), name.to_string()))
}

/// Cluster-aware key of a dynamic object.
pub fn object_key(obj: &DynamicObject) -> Result<String, KeyError> {
    if obj.metadata.name.is_empty() {
        return Err(KeyError::MissingName);
    }
    let namespace = obj.metadata.namespace.as_deref().unwrap_or_default();
    Ok(to_cluster_aware_key(obj.cluster().as_str(), namespace, &obj.metadata.name))
}

/// Build the resource-queue key for an object event.
pub fn encode_resource_key(gvr: &GroupVersionResource, obj: &DynamicObject) -> Result<String, KeyError> {
    Ok(format!("{}{KIND_SEPARATOR}{}", encode_resource(gvr), object_key(obj)?))
}

/// Split a resource-queue key into its resource and object key.
pub fn decode_resource_key(key: &str) -> Result<(GroupVersionResource, &str), KeyError> {
    let parts: Vec<&str> = key.splitn(2, KIND_SEPARATOR).collect();
    let [selector, suffix] = parts.as_slice() else {
        return Err(KeyError::UnexpectedFormat(key.to_string()));
    };
    Ok((parse_resource(selector)?, *suffix))
}

#[cfg(test)]
#[path = "keys_tests.rs"]
mod tests;
