//! The resource pool: at most one live tool-server instance per
//! configuration identity, reference-counted by conversation.
//!
//! Instances are keyed by the configuration's identity hash (mixed with the
//! thread id for non-shared servers), so byte-identical configurations in
//! different conversations converge on one running server. The last release
//! tears the instance down exactly once.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use convoy_mcp::McpServerConfig;

use crate::error::Result;
use crate::tool::SharedFactory;

/// One pooled instance and the conversations referencing it.
struct PooledInstance {
    factory: SharedFactory,
    threads: HashSet<String>,
    last_used: DateTime<Utc>,
}

/// Per-identity cell: its own lock serializes creation, acquisition and
/// release for that identity without involving the pool-wide map lock.
#[derive(Default)]
struct Slot {
    inner: Mutex<Option<PooledInstance>>,
}

/// Read-only snapshot of one pooled instance.
#[derive(Debug, Clone)]
pub struct InstanceStats {
    /// Pool key (configuration identity, possibly thread-scoped).
    pub key: String,
    /// Integration name.
    pub integration: String,
    /// Threads currently referencing the instance.
    pub threads: Vec<String>,
    /// When the instance was last acquired.
    pub last_used: DateTime<Utc>,
}

/// Read-only snapshot of the whole pool.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Per-instance snapshots.
    pub instances: Vec<InstanceStats>,
}

impl PoolStats {
    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// True when nothing is pooled.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// Reference-counted pool of live tool-server factories.
///
/// The map mutex is held only to look up or insert a slot; each identity
/// then serializes on its own lock. Acquire and release for one identity can
/// never interleave into a lost teardown or a second instance, and a slow
/// server spawn for one identity never blocks acquisitions of another.
#[derive(Default)]
pub struct ResourcePool {
    slots: Mutex<HashMap<String, Arc<Slot>>>,
}

impl ResourcePool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the instance for `config` on behalf of `thread_id`, creating
    /// it on first request.
    ///
    /// Re-acquiring from the same thread is idempotent. Creation failures
    /// propagate and leave the pool untouched.
    pub fn get_or_create<F>(
        &self,
        config: &McpServerConfig,
        thread_id: &str,
        create: F,
    ) -> Result<SharedFactory>
    where
        F: FnOnce() -> Result<SharedFactory>,
    {
        let key = config.pool_key(thread_id);
        let slot = self
            .slots
            .lock()
            .entry(key.clone())
            .or_default()
            .clone();

        // Created under the identity's own lock: a concurrent request for
        // the same identity cannot spawn a second instance, while requests
        // for other identities proceed untouched.
        let mut inner = slot.inner.lock();
        if let Some(instance) = inner.as_mut() {
            instance.threads.insert(thread_id.to_string());
            instance.last_used = Utc::now();
            tracing::debug!(
                key = %key,
                thread = %thread_id,
                refs = instance.threads.len(),
                "reusing pooled instance"
            );
            return Ok(instance.factory.clone());
        }

        let factory = create()?;
        tracing::info!(
            key = %key,
            integration = %config.name,
            thread = %thread_id,
            "created pooled instance"
        );
        *inner = Some(PooledInstance {
            factory: factory.clone(),
            threads: HashSet::from([thread_id.to_string()]),
            last_used: Utc::now(),
        });
        Ok(factory)
    }

    /// Drop `thread_id`'s reference on every instance, tearing down and
    /// evicting the ones left unreferenced.
    ///
    /// Unknown thread ids are a no-op. Teardown failures are logged; the
    /// entry is evicted regardless so a broken server cannot pin the pool.
    pub fn release_thread(&self, thread_id: &str) {
        let snapshot: Vec<(String, Arc<Slot>)> = self
            .slots
            .lock()
            .iter()
            .map(|(key, slot)| (key.clone(), slot.clone()))
            .collect();

        let mut expired: Vec<(String, SharedFactory)> = Vec::new();
        for (key, slot) in snapshot {
            let mut inner = slot.inner.lock();
            let emptied = match inner.as_mut() {
                Some(instance) => {
                    instance.threads.remove(thread_id);
                    instance.threads.is_empty()
                }
                None => false,
            };
            if emptied {
                if let Some(instance) = inner.take() {
                    expired.push((key, instance.factory));
                }
            }
        }

        // Drop slots left empty, unless another caller holds the slot (a
        // clone of the Arc, or its lock while creating).
        {
            let mut slots = self.slots.lock();
            slots.retain(|_, slot| {
                Arc::strong_count(slot) > 1
                    || slot.inner.try_lock().map_or(true, |inner| inner.is_some())
            });
        }

        for (key, factory) in expired {
            tracing::info!(key = %key, thread = %thread_id, "tearing down pooled instance");
            if let Err(e) = factory.kill() {
                tracing::warn!(key = %key, error = %e, "pooled instance teardown failed");
            }
        }
    }

    /// Best-effort parallel teardown of every pooled instance.
    ///
    /// Individual failures are logged and swallowed; one slow or broken
    /// server cannot delay the teardown of the others.
    pub fn shutdown(&self) {
        let drained: Vec<(String, Arc<Slot>)> = {
            let mut slots = self.slots.lock();
            slots.drain().collect()
        };

        tracing::info!(slots = drained.len(), "shutting down resource pool");
        std::thread::scope(|scope| {
            for (key, slot) in &drained {
                scope.spawn(move || {
                    let taken = slot.inner.lock().take();
                    if let Some(instance) = taken {
                        if let Err(e) = instance.factory.kill() {
                            tracing::warn!(key = %key, error = %e, "pooled instance teardown failed");
                        }
                    }
                });
            }
        });
    }

    /// Snapshot of the pool for inspection.
    ///
    /// Slots with no live instance (a creation in flight or just failed) are
    /// not reported.
    pub fn stats(&self) -> PoolStats {
        let snapshot: Vec<(String, Arc<Slot>)> = self
            .slots
            .lock()
            .iter()
            .map(|(key, slot)| (key.clone(), slot.clone()))
            .collect();

        let mut instances = Vec::new();
        for (key, slot) in snapshot {
            let inner = slot.inner.lock();
            if let Some(instance) = inner.as_ref() {
                instances.push(InstanceStats {
                    key,
                    integration: instance.factory.integration().to_string(),
                    threads: instance.threads.iter().cloned().collect(),
                    last_used: instance.last_used,
                });
            }
        }
        PoolStats { instances }
    }
}

impl std::fmt::Debug for ResourcePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.lock();
        f.debug_struct("ResourcePool")
            .field("slots", &slots.len())
            .finish()
    }
}
