//! In-memory entity store.
//!
//! One store per entity type, owned by the application context. All state
//! lives behind a `tokio::sync::watch` channel: every mutation publishes a new
//! snapshot and wakes subscribed [`QueryStream`](crate::QueryStream)s in the
//! calling task. Snapshots are copy-on-write, so a reader holding an old
//! snapshot never blocks a writer.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::watch;

use crate::entity::Entity;
use crate::query::EntityQuery;

/// Immutable view of a store at one point in time.
#[derive(Debug)]
pub struct StoreSnapshot<E: Entity> {
    entities: BTreeMap<E::Id, E>,
    active: Option<E::Id>,
    revision: u64,
}

impl<E: Entity> Clone for StoreSnapshot<E> {
    fn clone(&self) -> Self {
        Self {
            entities: self.entities.clone(),
            active: self.active.clone(),
            revision: self.revision,
        }
    }
}

impl<E: Entity> Default for StoreSnapshot<E> {
    fn default() -> Self {
        Self {
            entities: BTreeMap::new(),
            active: None,
            revision: 0,
        }
    }
}

impl<E: Entity> StoreSnapshot<E> {
    pub fn get(&self, id: &E::Id) -> Option<&E> {
        self.entities.get(id)
    }

    /// Entities in id order.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn active_id(&self) -> Option<&E::Id> {
        self.active.as_ref()
    }

    pub fn active(&self) -> Option<&E> {
        self.active.as_ref().and_then(|id| self.entities.get(id))
    }

    /// Monotonic mutation counter, bumped once per notifying mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// Handle to the store of one entity type. Clones share the same state.
pub struct EntityStore<E: Entity> {
    state: Arc<watch::Sender<Arc<StoreSnapshot<E>>>>,
}

impl<E: Entity> Clone for EntityStore<E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<E: Entity> Default for EntityStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> std::fmt::Debug for EntityStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("EntityStore")
            .field("entity_type", &E::entity_type())
            .field("len", &snapshot.len())
            .field("revision", &snapshot.revision())
            .finish()
    }
}

impl<E: Entity> EntityStore<E> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(StoreSnapshot::default()));
        Self {
            state: Arc::new(tx),
        }
    }

    /// Read-only projections over this store.
    pub fn query(&self) -> EntityQuery<E> {
        EntityQuery::new(self.clone())
    }

    /// Current snapshot. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Arc<StoreSnapshot<E>> {
        Arc::clone(&self.state.borrow())
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<StoreSnapshot<E>>> {
        self.state.subscribe()
    }

    /// Insert or replace by id.
    ///
    /// Last write wins: an incoming record with an older `version` still
    /// replaces the stored one.
    pub fn upsert(&self, entity: E) {
        self.mutate(|state| {
            upsert_into(state, entity);
            true
        });
    }

    /// Batch upsert, applied in input order with a single notification.
    pub fn upsert_many<I>(&self, entities: I)
    where
        I: IntoIterator<Item = E>,
    {
        let entities: Vec<E> = entities.into_iter().collect();
        if entities.is_empty() {
            return;
        }
        self.mutate(|state| {
            for entity in entities {
                upsert_into(state, entity);
            }
            true
        });
    }

    /// Remove one entity. Clears the active pointer if it pointed there.
    /// Returns the removed record.
    pub fn remove(&self, id: &E::Id) -> Option<E> {
        let mut removed = None;
        self.mutate(|state| {
            removed = state.entities.remove(id);
            if removed.is_some() && state.active.as_ref() == Some(id) {
                state.active = None;
            }
            removed.is_some()
        });
        removed
    }

    pub fn remove_many<'a, I>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = &'a E::Id>,
    {
        let ids: Vec<&E::Id> = ids.into_iter().collect();
        let mut count = 0;
        self.mutate(|state| {
            for id in ids {
                if state.entities.remove(id).is_some() {
                    count += 1;
                    if state.active.as_ref() == Some(id) {
                        state.active = None;
                    }
                }
            }
            count > 0
        });
        count
    }

    /// Drop every entity and the active pointer.
    pub fn clear(&self) {
        self.mutate(|state| {
            let changed = !state.entities.is_empty() || state.active.is_some();
            state.entities.clear();
            state.active = None;
            changed
        });
    }

    /// Point the active selection at `id`. Unknown ids clear the selection.
    pub fn set_active(&self, id: E::Id) {
        self.mutate(|state| {
            let next = state.entities.contains_key(&id).then_some(id);
            if next.is_none() {
                tracing::trace!(
                    entity_type = %E::entity_type(),
                    "set_active on unknown id, clearing selection"
                );
            }
            let changed = state.active != next;
            state.active = next;
            changed
        });
    }

    pub fn clear_active(&self) {
        self.mutate(|state| state.active.take().is_some());
    }

    pub fn get_entity(&self, id: &E::Id) -> Option<E> {
        self.state.borrow().get(id).cloned()
    }

    pub fn get_active(&self) -> Option<E> {
        self.state.borrow().active().cloned()
    }

    pub fn has_entity(&self, id: &E::Id) -> bool {
        self.state.borrow().entities.contains_key(id)
    }

    pub fn count(&self) -> usize {
        self.state.borrow().len()
    }

    /// Apply `f` to a private copy of the state and publish it when `f`
    /// reports a change.
    fn mutate<F>(&self, f: F)
    where
        F: FnOnce(&mut StoreSnapshot<E>) -> bool,
    {
        self.state.send_if_modified(|snapshot| {
            let state = Arc::make_mut(snapshot);
            let changed = f(state);
            if changed {
                state.revision += 1;
            }
            changed
        });
    }
}

fn upsert_into<E: Entity>(state: &mut StoreSnapshot<E>, entity: E) {
    let id = entity.entity_id();
    if let Some(existing) = state.entities.get(&id) {
        if let (Some(stored), Some(incoming)) = (existing.version(), entity.version()) {
            if incoming < stored {
                tracing::debug!(
                    entity_type = %E::entity_type(),
                    id = %id,
                    stored_version = stored,
                    incoming_version = incoming,
                    "upsert with older version, applying last write"
                );
            }
        }
    }
    state.entities.insert(id, entity);
}
