// Copyright 2024-2026 Workspace Mounts Contributors
// SPDX-License-Identifier: Apache-2.0

//! Deduplicating, rate-limited work queue.
//!
//! An item is queued at most once no matter how often it is added, and is
//! handed to at most one worker at a time: adding an item that is being
//! processed parks it until the worker calls [`WorkQueue::done`]. Failed items
//! are re-added through a per-item exponential backoff.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Backoff settings for [`WorkQueue::add_rate_limited`].
#[derive(Debug, Clone)]
pub struct WorkQueueConfig {
    /// Delay after the first failure.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for WorkQueueConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_secs(1000),
        }
    }
}

struct QueueState<T> {
    queue: VecDeque<T>,
    /// Items waiting to be processed, queued or parked behind a worker.
    dirty: HashSet<T>,
    processing: HashSet<T>,
    failures: HashMap<T, u32>,
    shutting_down: bool,
}

/// Work queue shared between event sources and a worker pool.
pub struct WorkQueue<T> {
    name: String,
    config: WorkQueueConfig,
    state: Mutex<QueueState<T>>,
    notify: Notify,
}

impl<T> WorkQueue<T>
where
    T: Eq + Hash + Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, config: WorkQueueConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                dirty: HashSet::new(),
                processing: HashSet::new(),
                failures: HashMap::new(),
                shutting_down: false,
            }),
            notify: Notify::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add an item. Never blocks; a no-op after shutdown.
    pub fn add(&self, item: T) {
        {
            let mut state = self.state.lock();
            if state.shutting_down || !state.dirty.insert(item.clone()) {
                return;
            }
            metrics::counter!("workqueue_adds_total", "name" => self.name.clone()).increment(1);
            if state.processing.contains(&item) {
                // Re-queued by `done`.
                return;
            }
            state.queue.push_back(item);
        }
        self.notify.notify_one();
    }

    /// Wait for the next item.
    ///
    /// Returns `None` once the queue is shut down and drained.
    pub async fn get(&self) -> Option<T> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock();
                if let Some(item) = state.queue.pop_front() {
                    state.dirty.remove(&item);
                    state.processing.insert(item.clone());
                    return Some(item);
                }
                if state.shutting_down {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Mark an item as no longer being processed.
    pub fn done(&self, item: &T) {
        let requeued = {
            let mut state = self.state.lock();
            state.processing.remove(item);
            if state.dirty.contains(item) {
                state.queue.push_back(item.clone());
                true
            } else {
                false
            }
        };
        if requeued {
            self.notify.notify_one();
        }
    }

    /// Add an item once `delay` has elapsed.
    pub fn add_after(self: &Arc<Self>, item: T, delay: Duration) {
        if delay.is_zero() {
            self.add(item);
            return;
        }
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(item);
        });
    }

    /// Re-add a failed item after its exponential backoff.
    pub fn add_rate_limited(self: &Arc<Self>, item: T) {
        let delay = self.next_backoff(&item);
        metrics::counter!("workqueue_retries_total", "name" => self.name.clone()).increment(1);
        self.add_after(item, delay);
    }

    /// Clear the failure history of an item.
    pub fn forget(&self, item: &T) {
        self.state.lock().failures.remove(item);
    }

    /// Number of rate-limited re-adds since the last `forget`.
    pub fn num_requeues(&self, item: &T) -> u32 {
        self.state.lock().failures.get(item).copied().unwrap_or(0)
    }

    /// Number of items ready to be handed out.
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop accepting items and wake every blocked `get`.
    pub fn shut_down(&self) {
        self.state.lock().shutting_down = true;
        self.notify.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state.lock().shutting_down
    }

    fn next_backoff(&self, item: &T) -> Duration {
        let exp = {
            let mut state = self.state.lock();
            let failures = state.failures.entry(item.clone()).or_insert(0);
            let exp = *failures;
            *failures = failures.saturating_add(1);
            exp
        };
        let factor = 2u32.checked_pow(exp).unwrap_or(u32::MAX);
        self.config
            .base_delay
            .checked_mul(factor)
            .map_or(self.config.max_delay, |d| d.min(self.config.max_delay))
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
