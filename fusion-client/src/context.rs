//! Session context owning every store and service.

use std::sync::Arc;

use fusion_core::FusionResult;
use fusion_storage::{CachedFetch, EntityStore};

use crate::config::ClientConfig;
use crate::services::{
    CompanyService, FactoryAssetDetailsService, FactorySiteService, FleetAssetDetailsService,
};
use crate::transport::{RestTransport, Transport};

/// Stores and services of one console session.
///
/// Cloning shares the stores. Dropping the last clone drops all cached data.
#[derive(Clone)]
pub struct FusionContext {
    config: ClientConfig,
    companies: CompanyService,
    factory_sites: FactorySiteService,
    fleet_asset_details: FleetAssetDetailsService,
    factory_asset_details: FactoryAssetDetailsService,
}

impl std::fmt::Debug for FusionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FusionContext")
            .field("config", &self.config)
            .field("companies", self.companies.cache())
            .field("factory_sites", self.factory_sites.cache())
            .field("fleet_asset_details", self.fleet_asset_details.cache())
            .field("factory_asset_details", self.factory_asset_details.cache())
            .finish()
    }
}

impl FusionContext {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let cache_config = config.cache_config();
        let companies = CompanyService::new(
            Arc::clone(&transport),
            CachedFetch::new(EntityStore::new(), cache_config.clone()),
        );
        let factory_sites = FactorySiteService::new(
            Arc::clone(&transport),
            CachedFetch::new(EntityStore::new(), cache_config.clone()),
        );
        let fleet_asset_details = FleetAssetDetailsService::new(
            Arc::clone(&transport),
            CachedFetch::new(EntityStore::new(), cache_config.clone()),
        );
        let factory_asset_details = FactoryAssetDetailsService::new(
            transport,
            CachedFetch::new(EntityStore::new(), cache_config),
        );

        tracing::debug!(
            api_url_prefix = %config.api_url_prefix,
            cache_ttl_ms = config.cache_ttl_ms,
            "fusion context created"
        );

        Self {
            config,
            companies,
            factory_sites,
            fleet_asset_details,
            factory_asset_details,
        }
    }

    /// Validate `config` and talk to the backend over HTTP.
    pub fn connect(config: ClientConfig) -> FusionResult<Self> {
        config.validate()?;
        let transport = RestTransport::new(&config)?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Companies known to the session, with the selected one as active.
    pub fn companies(&self) -> &CompanyService {
        &self.companies
    }

    pub fn factory_sites(&self) -> &FactorySiteService {
        &self.factory_sites
    }

    pub fn fleet_asset_details(&self) -> &FleetAssetDetailsService {
        &self.fleet_asset_details
    }

    pub fn factory_asset_details(&self) -> &FactoryAssetDetailsService {
        &self.factory_asset_details
    }

    /// Force every cached read to refetch. Stored records stay readable.
    pub fn invalidate_all(&self) -> FusionResult<()> {
        self.companies.cache().invalidate_all()?;
        self.factory_sites.cache().invalidate_all()?;
        self.fleet_asset_details.cache().invalidate_all()?;
        self.factory_asset_details.cache().invalidate_all()?;
        Ok(())
    }
}
