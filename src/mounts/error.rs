// Copyright 2024-2026 Workspace Mounts Contributors
// SPDX-License-Identifier: Apache-2.0

//! Errors raised while routing mount events and watching mount kinds.

use thiserror::Error;

use super::collaborators::CollaboratorError;
use super::informers::ReconcileStatus;
use crate::k8s::types::ValidationError;
use crate::k8s::{GroupVersionKind, GroupVersionResource, KeyError};

#[derive(Error, Debug)]
pub enum MountError {
    #[error("malformed queue key: {0}")]
    MalformedKey(#[from] KeyError),

    #[error("invalid mount annotation: {0}")]
    InvalidMount(#[from] ValidationError),

    #[error("unable to decode owner reference: {0}")]
    OwnerDecode(#[source] serde_json::Error),

    #[error("owner reference is not a workspace: {0}")]
    OwnerNotWorkspace(String),

    #[error("unable to resolve resource for {gvk}: {source}")]
    Discovery {
        gvk: GroupVersionKind,
        #[source]
        source: CollaboratorError,
    },

    #[error("error getting dynamic informer for {gvr}: {source}")]
    Informer {
        gvr: GroupVersionResource,
        #[source]
        source: CollaboratorError,
    },

    #[error("unable to get object from informer cache: {0}")]
    Cache(#[source] CollaboratorError),

    #[error("mount tracker hooks are already bound")]
    AlreadyBound,
}

impl MountError {
    /// Whether retrying the same input can succeed.
    ///
    /// Malformed keys, annotations and owner references stay malformed; only
    /// failures of discovery and informer start-up are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Discovery { .. } | Self::Informer { .. })
    }

    /// Pipeline outcome when this error ends a reconcile step.
    pub fn reconcile_status(&self) -> ReconcileStatus {
        ReconcileStatus::StopAndRequeue
    }
}
