use std::sync::Arc;

use fusion_core::{company_cache_key, EntityId, FleetAssetDetails, FusionResult};
use fusion_storage::{CachedFetch, EntityQuery};

use crate::transport::get_json;
use crate::Transport;

/// Fleet manager view of assets.
#[derive(Clone)]
pub struct FleetAssetDetailsService {
    transport: Arc<dyn Transport>,
    cache: CachedFetch<FleetAssetDetails>,
}

impl FleetAssetDetailsService {
    pub fn new(transport: Arc<dyn Transport>, cache: CachedFetch<FleetAssetDetails>) -> Self {
        Self { transport, cache }
    }

    pub fn query(&self) -> EntityQuery<FleetAssetDetails> {
        self.cache.query()
    }

    pub fn cache(&self) -> &CachedFetch<FleetAssetDetails> {
        &self.cache
    }

    pub async fn get_asset_details_of_company(
        &self,
        company_id: EntityId,
    ) -> FusionResult<Vec<FleetAssetDetails>> {
        let path = format!("companies/{company_id}/fleetassetdetails");
        let transport = Arc::clone(&self.transport);
        let read = self
            .cache
            .cached_by_parent_id(company_cache_key(company_id), move || {
                get_json::<Vec<FleetAssetDetails>>(transport, path)
            })
            .await?;
        Ok(read.into_value())
    }

    /// Always fetches; the result refreshes the stored copy.
    pub async fn get_fleet_asset_details(
        &self,
        company_id: EntityId,
        asset_details_id: EntityId,
    ) -> FusionResult<FleetAssetDetails> {
        let path = format!("companies/{company_id}/fleetassetdetails/{asset_details_id}");
        let details: FleetAssetDetails = get_json(Arc::clone(&self.transport), path).await?;
        self.cache.upsert_cached(details.clone())?;
        Ok(details)
    }

    /// Assets that may be attached as subsystems to an asset of the given
    /// series. Not stored.
    pub async fn get_subsystem_candidates(
        &self,
        company_id: EntityId,
        asset_series_id: EntityId,
    ) -> FusionResult<Vec<FleetAssetDetails>> {
        let path =
            format!("companies/{company_id}/assetseries/{asset_series_id}/subsystemcandidates");
        get_json(Arc::clone(&self.transport), path).await
    }

    pub fn set_active(&self, asset_id: EntityId) {
        self.cache.store().set_active(asset_id);
    }
}
