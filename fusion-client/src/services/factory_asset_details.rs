use std::collections::HashMap;
use std::sync::Arc;

use fusion_core::{
    company_cache_key, EntityId, FactoryAssetDetails, FactoryAssetDetailsWithFields, FieldDetails,
    FusionResult,
};
use fusion_storage::{CachedFetch, EntityQuery};
use fusion_tree::AssetTree;

use crate::transport::get_json;
use crate::Transport;

/// Factory manager view of assets, including open alerts.
#[derive(Clone)]
pub struct FactoryAssetDetailsService {
    transport: Arc<dyn Transport>,
    cache: CachedFetch<FactoryAssetDetails>,
}

impl FactoryAssetDetailsService {
    pub fn new(transport: Arc<dyn Transport>, cache: CachedFetch<FactoryAssetDetails>) -> Self {
        Self { transport, cache }
    }

    pub fn query(&self) -> EntityQuery<FactoryAssetDetails> {
        self.cache.query()
    }

    pub fn cache(&self) -> &CachedFetch<FactoryAssetDetails> {
        &self.cache
    }

    pub async fn get_asset_details_of_company(
        &self,
        company_id: EntityId,
    ) -> FusionResult<Vec<FactoryAssetDetails>> {
        let path = format!("companies/{company_id}/factoryassetdetails");
        let transport = Arc::clone(&self.transport);
        let read = self
            .cache
            .cached_by_parent_id(company_cache_key(company_id), move || {
                get_json::<Vec<FactoryAssetDetails>>(transport, path)
            })
            .await?;
        Ok(read.into_value())
    }

    /// Delete the asset on the backend, then drop it from the store.
    pub async fn remove_company_asset(
        &self,
        company_id: EntityId,
        asset_id: EntityId,
    ) -> FusionResult<()> {
        let path = format!("companies/{company_id}/assets/{asset_id}");
        self.transport.delete(&path).await?;
        if self.cache.remove(&asset_id)?.is_none() {
            tracing::debug!(asset_id = asset_id, "removed asset was not in the store");
        }
        Ok(())
    }

    pub fn set_active(&self, asset_id: EntityId) {
        self.cache.store().set_active(asset_id);
    }

    /// Tree of every stored asset, carrying expand state over from `previous`.
    pub fn asset_tree(
        &self,
        previous: Option<&AssetTree<FactoryAssetDetails>>,
    ) -> AssetTree<FactoryAssetDetails> {
        let records = self.cache.store().snapshot().iter().cloned().collect::<Vec<_>>();
        AssetTree::build(&records, previous)
    }

    /// Tree of every stored asset joined with its current field readings.
    ///
    /// Assets absent from `fields` get an empty field list. The result feeds
    /// [`AssetTree::children_need_maintenance`] with
    /// [`needs_maintenance_soon`](fusion_core::needs_maintenance_soon).
    pub fn maintenance_tree(
        &self,
        fields: &HashMap<EntityId, Vec<FieldDetails>>,
        previous: Option<&AssetTree<FactoryAssetDetailsWithFields>>,
    ) -> AssetTree<FactoryAssetDetailsWithFields> {
        let records = self
            .cache
            .store()
            .snapshot()
            .iter()
            .map(|details| FactoryAssetDetailsWithFields {
                fields: fields.get(&details.asset.id).cloned().unwrap_or_default(),
                details: details.clone(),
            })
            .collect::<Vec<_>>();
        AssetTree::build(&records, previous)
    }
}
