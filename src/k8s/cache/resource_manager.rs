/**
 * Resource reconciliation cache
 *
 * Mirrors one watched resource kind in memory and decides, for each inbound
 * notification, whether the reconciliation callback needs to run. Callbacks
 * are held back until the initial listing is known to be complete when the
 * cache is configured to wait for it.
 */
use super::config::ResourceManagerConfig;
use super::notification::Notification;
use super::watched::WatchedResource;
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Outcome of classifying a reconciled resource against the stored copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Classification {
    /// Nothing to report yet, or nothing changed
    Absorbed,
    /// The resource is new or its generation moved
    Changed,
    /// First unchanged resend while warming up: the initial set is complete
    Ready,
}

/// Pure state machine for `reconciled`.
///
/// `existing` is the generation of the previously stored copy, if any.
const fn classify(existing: Option<i64>, incoming: i64, ready: bool) -> Classification {
    match (existing, ready) {
        (None, true) => Classification::Changed,
        (None, false) => Classification::Absorbed,
        (Some(previous), false) if previous == incoming => Classification::Ready,
        (Some(_), false) => Classification::Absorbed,
        (Some(previous), true) if previous == incoming => Classification::Absorbed,
        (Some(_), true) => Classification::Changed,
    }
}

/// Everything a callback needs, captured while the lock is held
struct Pending<T> {
    identity: Option<String>,
    snapshot: HashMap<String, T>,
}

#[derive(Debug)]
struct CacheState<T> {
    entries: HashMap<String, T>,
    ready: bool,
    notified: u64,
    absorbed: u64,
}

impl<T: WatchedResource> CacheState<T> {
    fn absorb(&mut self) -> Option<Pending<T>> {
        self.absorbed += 1;
        None
    }

    fn pending(&mut self, identity: Option<String>) -> Option<Pending<T>> {
        self.notified += 1;
        Some(Pending {
            identity,
            snapshot: self.entries.clone(),
        })
    }
}

/// Generation-aware cache for one watched resource kind.
///
/// All entry points serialize classification and mutation on an async mutex
/// and release it before awaiting the callback, so a slow reconcile never
/// blocks notifications for other resources. Callbacks receive the name of
/// the resource that triggered them, or `None` when the cache has just become
/// ready, together with an owned snapshot of every stored resource.
///
/// Each entry point returns `Ok(Some(directive))` when the callback ran and
/// `Ok(None)` when the notification was absorbed. Callback errors are passed
/// through untouched; the cache mutation has already been committed by then.
#[derive(Debug)]
pub struct ResourceManager<T> {
    state: Mutex<CacheState<T>>,
}

impl<T: WatchedResource> Default for ResourceManager<T> {
    fn default() -> Self {
        Self::with_config(ResourceManagerConfig::default())
    }
}

impl<T: WatchedResource> ResourceManager<T> {
    #[must_use]
    pub fn new(wait_for_all: bool) -> Self {
        Self::with_config(ResourceManagerConfig::default().with_wait_for_all(wait_for_all))
    }

    #[must_use]
    pub fn with_config(config: ResourceManagerConfig) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                ready: !config.wait_for_all,
                notified: 0,
                absorbed: 0,
            }),
        }
    }

    /// Handles an added or changed resource.
    ///
    /// The stored copy is always replaced. The callback runs for a new name or
    /// a new generation once the cache is ready, and exactly once with a `None`
    /// identity when an unchanged resend shows the initial listing wrapped
    /// around.
    ///
    /// # Errors
    ///
    /// Returns whatever error the callback returns.
    #[allow(clippy::significant_drop_tightening)]
    pub async fn reconciled<F, Fut, D, E>(&self, resource: T, callback: F) -> Result<Option<D>, E>
    where
        F: FnOnce(Option<String>, HashMap<String, T>) -> Fut,
        Fut: Future<Output = Result<D, E>>,
    {
        let name = resource.name();
        let generation = resource.generation();

        let pending = {
            let mut state = self.state.lock().await;
            let existing = state
                .entries
                .insert(name.clone(), resource)
                .map(|previous| previous.generation());

            match classify(existing, generation, state.ready) {
                Classification::Absorbed => {
                    debug!("💤 Reconcile ABSORBED: {} (generation {})", name, generation);
                    state.absorb()
                }
                Classification::Changed => {
                    debug!("🔄 Reconcile CHANGED: {} (generation {})", name, generation);
                    state.pending(Some(name))
                }
                Classification::Ready => {
                    state.ready = true;
                    info!(
                        "✅ Resource set complete after {} entries, notifications enabled",
                        state.entries.len()
                    );
                    state.pending(None)
                }
            }
        };

        Self::deliver(pending, callback).await
    }

    /// Handles a deleted resource.
    ///
    /// Ignored while warming up since deletions seen before the full set is
    /// known can't be trusted. Deleting an unknown name is a no-op.
    ///
    /// # Errors
    ///
    /// Returns whatever error the callback returns.
    #[allow(clippy::significant_drop_tightening)]
    pub async fn deleted<F, Fut, D, E>(&self, resource: T, callback: F) -> Result<Option<D>, E>
    where
        F: FnOnce(Option<String>, HashMap<String, T>) -> Fut,
        Fut: Future<Output = Result<D, E>>,
    {
        let name = resource.name();

        let pending = {
            let mut state = self.state.lock().await;
            if !state.ready {
                debug!("💤 Delete IGNORED while warming up: {}", name);
                state.absorb()
            } else if state.entries.remove(&name).is_some() {
                debug!("🗑️  Delete: {}", name);
                state.pending(Some(name))
            } else {
                debug!("❌ Delete of unknown resource: {}", name);
                state.absorb()
            }
        };

        Self::deliver(pending, callback).await
    }

    /// Handles a status-only change.
    ///
    /// The stored copy is left as is; the callback sees the snapshot as it
    /// stands.
    ///
    /// # Errors
    ///
    /// Returns whatever error the callback returns.
    #[allow(clippy::significant_drop_tightening)]
    pub async fn status_modified<F, Fut, D, E>(
        &self,
        resource: T,
        callback: F,
    ) -> Result<Option<D>, E>
    where
        F: FnOnce(Option<String>, HashMap<String, T>) -> Fut,
        Fut: Future<Output = Result<D, E>>,
    {
        let name = resource.name();

        let pending = {
            let mut state = self.state.lock().await;
            if !state.ready {
                debug!("💤 Status IGNORED while warming up: {}", name);
                state.absorb()
            } else if state.entries.contains_key(&name) {
                debug!("📝 Status modified: {}", name);
                state.pending(Some(name))
            } else {
                debug!("❌ Status of unknown resource: {}", name);
                state.absorb()
            }
        };

        Self::deliver(pending, callback).await
    }

    /// Routes a notification to the matching entry point.
    ///
    /// # Errors
    ///
    /// Returns whatever error the callback returns.
    pub async fn dispatch<F, Fut, D, E>(
        &self,
        notification: Notification<T>,
        callback: F,
    ) -> Result<Option<D>, E>
    where
        F: FnOnce(Option<String>, HashMap<String, T>) -> Fut,
        Fut: Future<Output = Result<D, E>>,
    {
        match notification {
            Notification::Reconciled(resource) => self.reconciled(resource, callback).await,
            Notification::Deleted(resource) => self.deleted(resource, callback).await,
            Notification::StatusModified(resource) => {
                self.status_modified(resource, callback).await
            }
        }
    }

    async fn deliver<F, Fut, D, E>(pending: Option<Pending<T>>, callback: F) -> Result<Option<D>, E>
    where
        F: FnOnce(Option<String>, HashMap<String, T>) -> Fut,
        Fut: Future<Output = Result<D, E>>,
    {
        match pending {
            Some(Pending { identity, snapshot }) => callback(identity, snapshot).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.state.lock().await.entries.contains_key(name)
    }

    pub async fn get_resource(&self, name: &str) -> Option<T> {
        self.state.lock().await.entries.get(name).cloned()
    }

    /// Independent copy of every stored resource
    pub async fn clone_resources(&self) -> HashMap<String, T> {
        self.state.lock().await.entries.clone()
    }

    /// Sorted names of every stored resource
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().await.entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn is_ready(&self) -> bool {
        self.state.lock().await.ready
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.entries.is_empty()
    }

    #[allow(clippy::significant_drop_tightening)]
    pub async fn stats(&self) -> CacheStats {
        let state = self.state.lock().await;
        CacheStats {
            total_entries: state.entries.len(),
            ready: state.ready,
            notified: state.notified,
            absorbed: state.absorbed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub ready: bool,
    /// Notifications that ran the callback
    pub notified: u64,
    /// Notifications swallowed without a callback
    pub absorbed: u64,
}

impl CacheStats {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn absorbed_percent(&self) -> f64 {
        let total = self.notified + self.absorbed;
        if total == 0 {
            return 0.0;
        }
        (self.absorbed as f64 / total as f64) * 100.0
    }
}
