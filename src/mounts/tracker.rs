// Copyright 2024-2026 Workspace Mounts Contributors
// SPDX-License-Identifier: Apache-2.0

//! Mount tracker store.
//!
//! Keeps the mount targets seen by workspace reconciliation and polls them
//! on a fixed interval. Status changes of a mounted object do not always
//! reach its workspace through the informer path, so when the polled
//! `status.URL` or `status.phase` differs from the last value seen, the
//! owning workspace is requeued.
//!
//! # Locking
//! One mutex guards the entry map. It is held only to read an entry or
//! write one back, never across the fetch or the requeue call. Two polls
//! racing on the same key can lose an update; the next tick converges.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::collaborators::{MountObjectGetter, WorkspaceRequeuer};
use super::error::MountError;
use crate::k8s::{ClusterPath, ResourceReference, Workspace};

/// Default period between drift polls.
pub const DEFAULT_DRIFT_INTERVAL: Duration = Duration::from_secs(15);

/// Default period between readiness checks while hooks are unbound.
pub const DEFAULT_READINESS_POLL: Duration = Duration::from_secs(1);

/// Registry key of a tracked mount target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackerKey(String);

impl TrackerKey {
    pub fn new(cluster: &ClusterPath, reference: &ResourceReference) -> Self {
        Self(format!(
            "{}/{}/{}/{}/{}/{}",
            cluster, reference.group, reference.kind, reference.version, reference.namespace, reference.name
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tracked mount target and the status last delivered for it.
#[derive(Debug, Clone, Default)]
pub struct TrackerEntry {
    pub cluster: ClusterPath,
    pub reference: Option<ResourceReference>,
    pub workspace: Option<Arc<Workspace>>,
    pub last_seen_url: String,
    pub last_seen_phase: String,
}

impl TrackerEntry {
    /// Empty entries are never polled.
    pub fn is_empty(&self) -> bool {
        self.cluster.is_empty() || self.reference.is_none() || self.workspace.is_none()
    }
}

struct TrackerHooks {
    getter: Arc<dyn MountObjectGetter>,
    requeuer: Arc<dyn WorkspaceRequeuer>,
}

/// Concurrent registry of mount targets with a drift-polling task.
pub struct MountTracker {
    entries: Mutex<HashMap<TrackerKey, TrackerEntry>>,
    hooks: OnceLock<TrackerHooks>,
    drift_interval: Duration,
    readiness_poll: Duration,
}

impl MountTracker {
    pub fn new(drift_interval: Duration, readiness_poll: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            hooks: OnceLock::new(),
            drift_interval,
            readiness_poll,
        }
    }

    /// Bind the API accessor and the workspace requeue hook.
    ///
    /// # Errors
    /// Returns `AlreadyBound` on every call after the first; the original
    /// hooks stay in place.
    pub fn bind(
        &self,
        getter: Arc<dyn MountObjectGetter>,
        requeuer: Arc<dyn WorkspaceRequeuer>,
    ) -> Result<(), MountError> {
        self.hooks
            .set(TrackerHooks { getter, requeuer })
            .map_err(|_| {
                warn!("ignoring attempt to rebind mount tracker hooks");
                MountError::AlreadyBound
            })
    }

    pub fn is_bound(&self) -> bool {
        self.hooks.get().is_some()
    }

    /// Track a mount target. Existing non-empty entries are left untouched,
    /// including the workspace they were registered with.
    pub fn add(&self, cluster: ClusterPath, reference: ResourceReference, workspace: Arc<Workspace>) -> TrackerKey {
        let key = TrackerKey::new(&cluster, &reference);
        let mut entries = self.entries.lock();
        if entries.get(&key).map_or(true, TrackerEntry::is_empty) {
            debug!(key = %key, workspace = workspace.name(), "tracking mount");
            entries.insert(
                key.clone(),
                TrackerEntry {
                    cluster,
                    reference: Some(reference),
                    workspace: Some(workspace),
                    ..Default::default()
                },
            );
        }
        key
    }

    pub fn remove(&self, key: &TrackerKey) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    pub fn get(&self, key: &TrackerKey) -> Option<TrackerEntry> {
        self.entries.lock().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<TrackerKey> {
        self.entries.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Poll tracked mounts every drift interval until `shutdown` fires.
    ///
    /// Waits for [`MountTracker::bind`] before the first poll.
    pub async fn run(&self, shutdown: CancellationToken) {
        while !self.is_bound() {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(self.readiness_poll) => {}
            }
        }

        let mut ticker = interval_at(Instant::now() + self.drift_interval, self.drift_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval = ?self.drift_interval, "mount drift detection started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => self.poll_once().await,
            }
        }
        debug!("mount drift detection stopped");
    }

    /// Run one drift check over every tracked key.
    pub async fn poll_once(&self) {
        for key in self.keys() {
            self.requeue_if_changed(&key).await;
        }
    }

    async fn requeue_if_changed(&self, key: &TrackerKey) {
        let Some(hooks) = self.hooks.get() else {
            return;
        };
        let Some(current) = self.get(key).filter(|entry| !entry.is_empty()) else {
            return;
        };
        let (Some(reference), Some(workspace)) = (&current.reference, &current.workspace) else {
            return;
        };

        let obj = match hooks.getter.get_mount_object(&current.cluster, reference).await {
            Ok(obj) => obj,
            Err(e) if e.is_not_found() => {
                info!(key = %key, "mount object deleted, no longer tracking");
                metrics::counter!("mount_tracker_removals_total").increment(1);
                self.remove(key);
                return;
            }
            Err(e) => {
                debug!(key = %key, error = %e, "unable to get mount object, retrying next tick");
                return;
            }
        };

        let status = match obj.mount_status() {
            Ok(status) => status,
            Err(e) => {
                trace!(key = %key, reason = %e, "mount object not ready");
                return;
            }
        };
        if status.url == current.last_seen_url && status.phase == current.last_seen_phase {
            return;
        }

        // The snapshot only moves forward once the workspace has been told.
        if let Err(e) = hooks.requeuer.requeue_workspace(&current.cluster, workspace).await {
            warn!(key = %key, workspace = workspace.name(), error = %e, "failed to requeue workspace");
            return;
        }
        metrics::counter!("mount_drift_requeues_total").increment(1);
        debug!(key = %key, url = %status.url, phase = %status.phase, "mount status drifted, workspace requeued");

        if let Some(entry) = self.entries.lock().get_mut(key) {
            entry.last_seen_url = status.url;
            entry.last_seen_phase = status.phase;
        }
    }
}

impl Default for MountTracker {
    fn default() -> Self {
        Self::new(DEFAULT_DRIFT_INTERVAL, DEFAULT_READINESS_POLL)
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
