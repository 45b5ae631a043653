use fusion_core::{Asset, EntityId, FetchError};
use fusion_storage::{CacheKey, CachedFetch, EntityStore, SelectOptions};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn asset_strategy() -> impl Strategy<Value = Asset> {
    (0i64..16, "[a-z]{1,8}", proptest::option::of(0i64..100)).prop_map(|(id, name, version)| {
        let mut asset = Asset::new(id, 1, &name);
        asset.version = version;
        asset
    })
}

proptest! {
    #[test]
    fn last_upsert_wins_per_id(batch in prop::collection::vec(asset_strategy(), 0..40)) {
        let store = EntityStore::<Asset>::new();
        let mut expected: BTreeMap<EntityId, Asset> = BTreeMap::new();
        for asset in &batch {
            store.upsert(asset.clone());
            expected.insert(asset.id, asset.clone());
        }

        prop_assert_eq!(store.count(), expected.len());
        for (id, asset) in &expected {
            let stored = store.get_entity(id);
            prop_assert_eq!(stored.as_ref(), Some(asset));
        }
    }

    #[test]
    fn upsert_many_matches_sequential_upserts(batch in prop::collection::vec(asset_strategy(), 0..40)) {
        let batched = EntityStore::<Asset>::new();
        let sequential = EntityStore::<Asset>::new();
        batched.upsert_many(batch.clone());
        for asset in batch {
            sequential.upsert(asset);
        }

        let all = SelectOptions::new();
        prop_assert_eq!(batched.query().get_all(&all), sequential.query().get_all(&all));
    }

    #[test]
    fn active_always_points_at_stored_entity(
        batch in prop::collection::vec(asset_strategy(), 1..20),
        active in 0i64..16,
        removed in prop::collection::vec(0i64..16, 0..8),
    ) {
        let store = EntityStore::<Asset>::new();
        store.upsert_many(batch);
        store.set_active(active);
        store.remove_many(&removed);

        match store.snapshot().active_id() {
            Some(id) => prop_assert!(store.has_entity(id)),
            None => prop_assert!(store.get_active().is_none()),
        }
    }

    #[test]
    fn concurrent_readers_trigger_one_fetch(readers in 1usize..8) {
        let cache = CachedFetch::<Asset>::with_defaults();
        let calls = Arc::new(AtomicUsize::new(0));

        let results = runtime().block_on(async {
            let reads = (0..readers).map(|_| {
                let calls = Arc::clone(&calls);
                cache.cached_by_id(7, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    Ok(Asset::new(7, 1, "press"))
                })
            });
            futures_util::future::join_all(reads).await
        });

        prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
        prop_assert_eq!(results.len(), readers);
        for result in results {
            prop_assert_eq!(result.unwrap().into_value().name, "press");
        }
        prop_assert!(cache.is_cached(&CacheKey::Entity(7)).unwrap());
    }
}

#[tokio::test]
async fn failed_parent_fetch_leaves_store_untouched() {
    let cache = CachedFetch::<Asset>::with_defaults();
    cache.store().upsert(Asset::new(1, 4, "existing"));

    let result = cache
        .cached_by_parent_id("company-4", || async {
            Err(FetchError::Timeout {
                path: "companies/4/assets".to_string(),
            }
            .into())
        })
        .await;

    assert!(result.is_err());
    assert_eq!(cache.store().count(), 1);
    assert!(!cache.is_cached(&CacheKey::parent("company-4")).unwrap());
    assert!(!cache.is_in_flight(&CacheKey::parent("company-4")).unwrap());
}
