//! De-duplicating cached fetch over an [`EntityStore`].
//!
//! Each cache key (an entity id or a parent key) carries the time of its last
//! successful fetch and, while a request is running, the shared handle of that
//! request. A second caller for the same key joins the running request instead
//! of starting another one; every joined caller observes the same result,
//! success or error.
//!
//! Requests run on their own task. A caller that stops waiting does not stop
//! the request: its result still lands in the store.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use chrono::Utc;
use fusion_core::{FusionError, FusionResult, StorageError, Timestamp};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::task::JoinError;

use super::freshness::{CacheConfig, CacheRead};
use super::key::CacheKey;
use crate::entity::Entity;
use crate::query::EntityQuery;
use crate::store::EntityStore;

type SharedFetch<T> = Shared<BoxFuture<'static, FusionResult<CacheRead<T>>>>;

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered from the store without a request.
    pub hits: u64,
    /// Reads that started a new request.
    pub misses: u64,
    /// Reads that joined a request already in flight.
    pub joined: u64,
    /// Requests that completed with an error.
    pub failures: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0). Joined reads count as hits.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.joined + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits + self.joined) as f64 / total as f64
        }
    }
}

/// Invalidation count of one key, paired with the count of `invalidate_all`
/// calls. A request may mark its key fresh only if neither moved while it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Generation {
    epoch: u64,
    key: u64,
}

struct CacheLedger<E: Entity> {
    fetched: HashMap<CacheKey<E::Id>, Timestamp>,
    parent_members: HashMap<String, Vec<E::Id>>,
    by_id_in_flight: HashMap<E::Id, SharedFetch<E>>,
    by_parent_in_flight: HashMap<String, SharedFetch<Vec<E>>>,
    invalidations: HashMap<CacheKey<E::Id>, u64>,
    epoch: u64,
    stats: CacheStats,
}

impl<E: Entity> Default for CacheLedger<E> {
    fn default() -> Self {
        Self {
            fetched: HashMap::new(),
            parent_members: HashMap::new(),
            by_id_in_flight: HashMap::new(),
            by_parent_in_flight: HashMap::new(),
            invalidations: HashMap::new(),
            epoch: 0,
            stats: CacheStats::default(),
        }
    }
}

impl<E: Entity> CacheLedger<E> {
    fn fresh_at(&self, key: &CacheKey<E::Id>, config: &CacheConfig) -> Option<Timestamp> {
        self.fetched
            .get(key)
            .copied()
            .filter(|fetched_at| config.is_fresh(*fetched_at, Utc::now()))
    }

    fn record_parent(&mut self, parent_id: String, ids: Vec<E::Id>, at: Timestamp) {
        self.fetched.insert(CacheKey::Parent(parent_id.clone()), at);
        self.parent_members.insert(parent_id, ids);
    }

    fn generation(&self, key: &CacheKey<E::Id>) -> Generation {
        Generation {
            epoch: self.epoch,
            key: self.invalidations.get(key).copied().unwrap_or(0),
        }
    }

    /// Drop the freshness record of `key`. Returns whether one existed.
    fn invalidate(&mut self, key: CacheKey<E::Id>) -> bool {
        let removed = self.fetched.remove(&key).is_some();
        *self.invalidations.entry(key).or_insert(0) += 1;
        removed
    }
}

struct Inner<E: Entity> {
    store: EntityStore<E>,
    config: CacheConfig,
    ledger: Mutex<CacheLedger<E>>,
}

impl<E: Entity> Inner<E> {
    fn lock_ledger(&self) -> FusionResult<MutexGuard<'_, CacheLedger<E>>> {
        self.ledger
            .lock()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    fn complete_by_id(
        &self,
        id: E::Id,
        started: Generation,
        result: FusionResult<E>,
    ) -> FusionResult<CacheRead<E>> {
        let mut ledger = self.lock_ledger()?;
        ledger.by_id_in_flight.remove(&id);
        let key = CacheKey::Entity(id);
        match result {
            Ok(entity) => {
                let now = Utc::now();
                if ledger.generation(&key) == started {
                    ledger.fetched.insert(key, now);
                } else {
                    tracing::debug!(
                        entity_type = %E::entity_type(),
                        key = %key,
                        "invalidated while in flight, result stored but not marked fresh"
                    );
                }
                self.store.upsert(entity.clone());
                Ok(CacheRead::from_fetch(entity, now))
            }
            Err(err) => {
                ledger.stats.failures += 1;
                tracing::warn!(
                    entity_type = %E::entity_type(),
                    key = %key,
                    error = %err,
                    "fetch failed, key left uncached"
                );
                Err(err)
            }
        }
    }

    fn complete_by_parent(
        &self,
        parent_id: String,
        started: Generation,
        result: FusionResult<Vec<E>>,
    ) -> FusionResult<CacheRead<Vec<E>>> {
        let mut ledger = self.lock_ledger()?;
        ledger.by_parent_in_flight.remove(&parent_id);
        let key = CacheKey::Parent(parent_id.clone());
        match result {
            Ok(entities) => {
                let now = Utc::now();
                if ledger.generation(&key) == started {
                    let ids = entities.iter().map(Entity::entity_id).collect();
                    ledger.record_parent(parent_id, ids, now);
                } else {
                    tracing::debug!(
                        entity_type = %E::entity_type(),
                        key = %key,
                        "invalidated while in flight, result stored but not marked fresh"
                    );
                }
                self.store.upsert_many(entities.clone());
                Ok(CacheRead::from_fetch(entities, now))
            }
            Err(err) => {
                ledger.stats.failures += 1;
                tracing::warn!(
                    entity_type = %E::entity_type(),
                    key = %key,
                    error = %err,
                    "fetch failed, key left uncached"
                );
                Err(err)
            }
        }
    }

    /// Clear the in-flight entry of a request whose task never completed.
    fn abandon(&self, key: &CacheKey<E::Id>) {
        if let Ok(mut ledger) = self.lock_ledger() {
            let removed = match key {
                CacheKey::Entity(id) => ledger.by_id_in_flight.remove(id).is_some(),
                CacheKey::Parent(parent) => ledger.by_parent_in_flight.remove(parent).is_some(),
            };
            if removed {
                ledger.stats.failures += 1;
            }
        }
    }
}

fn aborted(key: &impl std::fmt::Display, reason: impl Into<String>) -> FusionError {
    StorageError::RequestAborted {
        key: key.to_string(),
        reason: reason.into(),
    }
    .into()
}

/// Run `fetch` on its own task and hand back a shareable handle to the result.
///
/// `complete` runs on the task once the producer settles, so the store is
/// updated even when every caller has stopped waiting. A panicking producer is
/// reported as [`StorageError::RequestAborted`] through the same path.
fn spawn_request<E, T, F, Fut, C>(
    inner: &Arc<Inner<E>>,
    key: CacheKey<E::Id>,
    fetch: F,
    complete: C,
) -> SharedFetch<T>
where
    E: Entity,
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = FusionResult<T>> + Send + 'static,
    C: FnOnce(&Inner<E>, FusionResult<T>) -> FusionResult<CacheRead<T>> + Send + 'static,
{
    let weak: Weak<Inner<E>> = Arc::downgrade(inner);
    let task_key = key.clone();
    let task = tokio::spawn(async move {
        let result = match AssertUnwindSafe(async move { fetch().await })
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(entity_type = %E::entity_type(), key = %task_key, "fetch producer panicked");
                Err(aborted(&task_key, "fetch producer panicked"))
            }
        };
        match weak.upgrade() {
            Some(inner) => complete(&*inner, result),
            None => result.map(|value| CacheRead::from_fetch(value, Utc::now())),
        }
    });

    let weak: Weak<Inner<E>> = Arc::downgrade(inner);
    task.map(move |joined: Result<FusionResult<CacheRead<T>>, JoinError>| {
        joined.unwrap_or_else(|err| {
            tracing::warn!(entity_type = %E::entity_type(), key = %key, error = %err, "fetch task did not complete");
            if let Some(inner) = weak.upgrade() {
                inner.abandon(&key);
            }
            Err(aborted(&key, err.to_string()))
        })
    })
    .boxed()
    .shared()
}

/// Cached fetch decorator for one entity type.
///
/// Clones share the same store and ledger. Fetches are spawned onto the
/// ambient tokio runtime.
pub struct CachedFetch<E: Entity> {
    inner: Arc<Inner<E>>,
}

impl<E: Entity> Clone for CachedFetch<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Entity> std::fmt::Debug for CachedFetch<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedFetch")
            .field("store", &self.inner.store)
            .field("config", &self.inner.config)
            .finish()
    }
}

impl<E: Entity> CachedFetch<E> {
    pub fn new(store: EntityStore<E>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                config,
                ledger: Mutex::new(CacheLedger::default()),
            }),
        }
    }

    /// Create a cached fetch over a fresh store with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(EntityStore::new(), CacheConfig::default())
    }

    pub fn store(&self) -> &EntityStore<E> {
        &self.inner.store
    }

    pub fn query(&self) -> EntityQuery<E> {
        self.inner.store.query()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Read one entity, fetching it only when the cached copy is missing or
    /// stale.
    ///
    /// `fetch` is invoked at most once per outstanding request: concurrent
    /// callers for the same id share the request and its result. On success
    /// the entity is upserted into the store and the fetch time recorded,
    /// unless the id was invalidated while the request ran. On failure
    /// nothing is recorded and the next call retries.
    pub async fn cached_by_id<F, Fut>(&self, id: E::Id, fetch: F) -> FusionResult<CacheRead<E>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = FusionResult<E>> + Send + 'static,
    {
        let request = {
            let mut ledger = self.inner.lock_ledger()?;
            let key = CacheKey::Entity(id.clone());

            if let Some(fetched_at) = ledger.fresh_at(&key, &self.inner.config) {
                if let Some(entity) = self.inner.store.get_entity(&id) {
                    ledger.stats.hits += 1;
                    tracing::debug!(entity_type = %E::entity_type(), key = %key, "cache hit");
                    return Ok(CacheRead::from_cache(entity, fetched_at));
                }
            }

            if let Some(in_flight) = ledger.by_id_in_flight.get(&id) {
                let in_flight = in_flight.clone();
                ledger.stats.joined += 1;
                tracing::debug!(entity_type = %E::entity_type(), key = %key, "joining request in flight");
                in_flight
            } else {
                ledger.stats.misses += 1;
                tracing::debug!(entity_type = %E::entity_type(), key = %key, "cache miss, fetching");
                let started = ledger.generation(&key);
                let request_id = id.clone();
                let request = spawn_request(&self.inner, key, fetch, move |inner, result| {
                    inner.complete_by_id(request_id, started, result)
                });
                ledger.by_id_in_flight.insert(id, request.clone());
                request
            }
        };
        request.await
    }

    /// Read the collection cached under `parent_id`.
    ///
    /// Same contract as [`cached_by_id`](Self::cached_by_id). A hit answers
    /// from the store with the ids the last fetch returned for this parent;
    /// ids removed from the store since then are skipped.
    pub async fn cached_by_parent_id<F, Fut>(
        &self,
        parent_id: impl Into<String>,
        fetch: F,
    ) -> FusionResult<CacheRead<Vec<E>>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = FusionResult<Vec<E>>> + Send + 'static,
    {
        let parent_id = parent_id.into();
        let request = {
            let mut ledger = self.inner.lock_ledger()?;
            let key = CacheKey::Parent(parent_id.clone());

            if let Some(fetched_at) = ledger.fresh_at(&key, &self.inner.config) {
                if let Some(ids) = ledger.parent_members.get(&parent_id) {
                    let snapshot = self.inner.store.snapshot();
                    let entities: Vec<E> = ids
                        .iter()
                        .filter_map(|id| snapshot.get(id).cloned())
                        .collect();
                    ledger.stats.hits += 1;
                    tracing::debug!(
                        entity_type = %E::entity_type(),
                        key = %key,
                        count = entities.len(),
                        "cache hit"
                    );
                    return Ok(CacheRead::from_cache(entities, fetched_at));
                }
            }

            if let Some(in_flight) = ledger.by_parent_in_flight.get(&parent_id) {
                let in_flight = in_flight.clone();
                ledger.stats.joined += 1;
                tracing::debug!(entity_type = %E::entity_type(), key = %key, "joining request in flight");
                in_flight
            } else {
                ledger.stats.misses += 1;
                tracing::debug!(entity_type = %E::entity_type(), key = %key, "cache miss, fetching");
                let started = ledger.generation(&key);
                let request_parent = parent_id.clone();
                let request = spawn_request(&self.inner, key, fetch, move |inner, result| {
                    inner.complete_by_parent(request_parent, started, result)
                });
                ledger.by_parent_in_flight.insert(parent_id, request.clone());
                request
            }
        };
        request.await
    }

    /// Upsert an entity returned by a create/update call and mark its id fresh.
    pub fn upsert_cached(&self, entity: E) -> FusionResult<()> {
        let id = entity.entity_id();
        self.inner
            .lock_ledger()?
            .fetched
            .insert(CacheKey::Entity(id), Utc::now());
        self.inner.store.upsert(entity);
        Ok(())
    }

    /// Upsert a collection and mark it fresh under `parent_id`.
    pub fn upsert_many_by_parent_id_cached(
        &self,
        parent_id: impl Into<String>,
        entities: Vec<E>,
    ) -> FusionResult<()> {
        let ids = entities.iter().map(Entity::entity_id).collect();
        self.inner
            .lock_ledger()?
            .record_parent(parent_id.into(), ids, Utc::now());
        self.inner.store.upsert_many(entities);
        Ok(())
    }

    /// Delete an entity from the store and forget its cache record.
    pub fn remove(&self, id: &E::Id) -> FusionResult<Option<E>> {
        {
            let mut ledger = self.inner.lock_ledger()?;
            ledger.fetched.remove(&CacheKey::Entity(id.clone()));
            for members in ledger.parent_members.values_mut() {
                members.retain(|member| member != id);
            }
        }
        Ok(self.inner.store.remove(id))
    }

    /// Force the next [`cached_by_id`](Self::cached_by_id) for `id` to refetch.
    ///
    /// The stored entity stays readable until the refetch replaces it. A
    /// request already running for `id` still stores its result but no longer
    /// marks the id fresh.
    pub fn invalidate_cache_id(&self, id: &E::Id) -> FusionResult<()> {
        let removed = self
            .inner
            .lock_ledger()?
            .invalidate(CacheKey::Entity(id.clone()));
        if removed {
            tracing::debug!(entity_type = %E::entity_type(), id = %id, "cache record invalidated");
        }
        Ok(())
    }

    /// Force the next [`cached_by_parent_id`](Self::cached_by_parent_id) for
    /// `parent_id` to refetch.
    pub fn invalidate_cache_parent_id(&self, parent_id: &str) -> FusionResult<()> {
        let removed = self
            .inner
            .lock_ledger()?
            .invalidate(CacheKey::Parent(parent_id.to_string()));
        if removed {
            tracing::debug!(
                entity_type = %E::entity_type(),
                parent_id = parent_id,
                "cache record invalidated"
            );
        }
        Ok(())
    }

    /// Drop every cache record of this entity type.
    pub fn invalidate_all(&self) -> FusionResult<()> {
        let mut ledger = self.inner.lock_ledger()?;
        ledger.fetched.clear();
        ledger.parent_members.clear();
        ledger.epoch += 1;
        Ok(())
    }

    /// Whether `key` currently has a valid cache record.
    pub fn is_cached(&self, key: &CacheKey<E::Id>) -> FusionResult<bool> {
        let ledger = self.inner.lock_ledger()?;
        Ok(ledger.fresh_at(key, &self.inner.config).is_some())
    }

    /// Whether a request for `key` is still outstanding.
    pub fn is_in_flight(&self, key: &CacheKey<E::Id>) -> FusionResult<bool> {
        let ledger = self.inner.lock_ledger()?;
        Ok(match key {
            CacheKey::Entity(id) => ledger.by_id_in_flight.contains_key(id),
            CacheKey::Parent(parent) => ledger.by_parent_in_flight.contains_key(parent),
        })
    }

    pub fn stats(&self) -> FusionResult<CacheStats> {
        Ok(self.inner.lock_ledger()?.stats.clone())
    }
}
