//! Read-only projections over an [`EntityStore`].

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use crate::entity::Entity;
use crate::store::{EntityStore, StoreSnapshot};

type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;
type Projection<E, T> = Box<dyn Fn(&StoreSnapshot<E>) -> T + Send + Sync>;

/// Options for [`EntityQuery::select_all`] and [`EntityQuery::get_all`].
pub struct SelectOptions<E> {
    filter_by: Option<Predicate<E>>,
}

impl<E> Default for SelectOptions<E> {
    fn default() -> Self {
        Self { filter_by: None }
    }
}

impl<E> Clone for SelectOptions<E> {
    fn clone(&self) -> Self {
        Self {
            filter_by: self.filter_by.clone(),
        }
    }
}

impl<E> fmt::Debug for SelectOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectOptions")
            .field("filter_by", &self.filter_by.is_some())
            .finish()
    }
}

impl<E> SelectOptions<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only entities matching `predicate`. Evaluated on every emission.
    pub fn filter_by<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.filter_by = Some(Arc::new(predicate));
        self
    }

    fn matches(&self, entity: &E) -> bool {
        self.filter_by
            .as_ref()
            .map_or(true, |predicate| predicate(entity))
    }
}

/// Continuously-updating projection of a store.
///
/// The first call to [`next`](Self::next) yields the current value; every
/// later call waits for the next store mutation. Dropping the stream
/// unsubscribes it.
pub struct QueryStream<E: Entity, T> {
    rx: watch::Receiver<Arc<StoreSnapshot<E>>>,
    project: Projection<E, T>,
    primed: bool,
}

impl<E: Entity, T> QueryStream<E, T> {
    fn new<F>(rx: watch::Receiver<Arc<StoreSnapshot<E>>>, project: F) -> Self
    where
        F: Fn(&StoreSnapshot<E>) -> T + Send + Sync + 'static,
    {
        Self {
            rx,
            project: Box::new(project),
            primed: false,
        }
    }

    /// Next emission, or `None` once the store has been dropped.
    pub async fn next(&mut self) -> Option<T> {
        if self.primed {
            self.rx.changed().await.ok()?;
        }
        self.primed = true;
        let snapshot = Arc::clone(&self.rx.borrow_and_update());
        Some((self.project)(&snapshot))
    }

    /// Projection of the current state without consuming a notification.
    pub fn latest(&self) -> T {
        let snapshot = Arc::clone(&self.rx.borrow());
        (self.project)(&snapshot)
    }

    /// Whether a mutation happened since the last emission.
    pub fn has_pending(&self) -> bool {
        !self.primed || self.rx.has_changed().unwrap_or(false)
    }
}

impl<E: Entity, T> fmt::Debug for QueryStream<E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryStream")
            .field("entity_type", &E::entity_type())
            .field("primed", &self.primed)
            .finish()
    }
}

/// Query facade for one store.
pub struct EntityQuery<E: Entity> {
    store: EntityStore<E>,
}

impl<E: Entity> Clone for EntityQuery<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<E: Entity> EntityQuery<E> {
    pub fn new(store: EntityStore<E>) -> Self {
        Self { store }
    }

    /// All entities (optionally filtered), re-emitted on every mutation.
    pub fn select_all(&self, options: SelectOptions<E>) -> QueryStream<E, Vec<E>> {
        QueryStream::new(self.store.subscribe(), move |snapshot| {
            collect_matching(snapshot, &options)
        })
    }

    pub fn select_entity(&self, id: E::Id) -> QueryStream<E, Option<E>> {
        QueryStream::new(self.store.subscribe(), move |snapshot| {
            snapshot.get(&id).cloned()
        })
    }

    pub fn select_active(&self) -> QueryStream<E, Option<E>> {
        QueryStream::new(self.store.subscribe(), |snapshot| snapshot.active().cloned())
    }

    pub fn select_active_id(&self) -> QueryStream<E, Option<E::Id>> {
        QueryStream::new(self.store.subscribe(), |snapshot| {
            snapshot.active_id().cloned()
        })
    }

    pub fn select_count(&self) -> QueryStream<E, usize> {
        QueryStream::new(self.store.subscribe(), |snapshot| snapshot.len())
    }

    pub fn get_all(&self, options: &SelectOptions<E>) -> Vec<E> {
        collect_matching(&self.store.snapshot(), options)
    }

    pub fn get_entity(&self, id: &E::Id) -> Option<E> {
        self.store.get_entity(id)
    }

    pub fn get_active(&self) -> Option<E> {
        self.store.get_active()
    }

    pub fn get_active_id(&self) -> Option<E::Id> {
        self.store.snapshot().active_id().cloned()
    }

    pub fn has_entity(&self, id: &E::Id) -> bool {
        self.store.has_entity(id)
    }

    pub fn count(&self) -> usize {
        self.store.count()
    }
}

fn collect_matching<E: Entity>(snapshot: &StoreSnapshot<E>, options: &SelectOptions<E>) -> Vec<E> {
    snapshot
        .iter()
        .filter(|entity| options.matches(entity))
        .cloned()
        .collect()
}
