use std::sync::Arc;

use fusion_core::{EntityId, FactorySite, FusionResult};
use fusion_storage::{CachedFetch, EntityQuery};

use crate::transport::{decode, encode, get_json, Transport};

/// Factory sites of a company, cached per company id.
#[derive(Clone)]
pub struct FactorySiteService {
    transport: Arc<dyn Transport>,
    cache: CachedFetch<FactorySite>,
}

impl FactorySiteService {
    pub fn new(transport: Arc<dyn Transport>, cache: CachedFetch<FactorySite>) -> Self {
        Self { transport, cache }
    }

    pub fn query(&self) -> EntityQuery<FactorySite> {
        self.cache.query()
    }

    pub fn cache(&self) -> &CachedFetch<FactorySite> {
        &self.cache
    }

    /// All sites of a company. `refresh` drops the cached list first.
    ///
    /// The list is cached by company only; `embed_children` is passed to the
    /// backend but does not split the cache.
    pub async fn get_factory_sites(
        &self,
        company_id: EntityId,
        embed_children: bool,
        refresh: bool,
    ) -> FusionResult<Vec<FactorySite>> {
        let parent_id = company_id.to_string();
        if refresh {
            self.cache.invalidate_cache_parent_id(&parent_id)?;
        }
        let path = format!("companies/{company_id}/factorysites?embedChildren={embed_children}");
        let transport = Arc::clone(&self.transport);
        let read = self
            .cache
            .cached_by_parent_id(parent_id, move || {
                get_json::<Vec<FactorySite>>(transport, path)
            })
            .await?;
        Ok(read.into_value())
    }

    pub async fn get_factory_site(
        &self,
        company_id: EntityId,
        factory_site_id: EntityId,
        embed_children: bool,
        refresh: bool,
    ) -> FusionResult<FactorySite> {
        if refresh {
            self.cache.invalidate_cache_id(&factory_site_id)?;
        }
        let path = format!(
            "companies/{company_id}/factorysites/{factory_site_id}?embedChildren={embed_children}"
        );
        let transport = Arc::clone(&self.transport);
        let read = self
            .cache
            .cached_by_id(factory_site_id, move || {
                get_json::<FactorySite>(transport, path)
            })
            .await?;
        Ok(read.into_value())
    }

    pub async fn create_factory_site(&self, site: &FactorySite) -> FusionResult<FactorySite> {
        let path = format!("companies/{}/factorysites", site.company_id);
        let body = encode(&path, site)?;
        let created: FactorySite = decode(&path, self.transport.post(&path, &body).await?)?;
        self.cache.upsert_cached(created.clone())?;
        tracing::debug!(factory_site_id = created.id, "factory site created");
        Ok(created)
    }

    pub async fn update_factory_site(&self, site: &FactorySite) -> FusionResult<FactorySite> {
        let path = format!("companies/{}/factorysites/{}", site.company_id, site.id);
        let body = encode(&path, site)?;
        let updated: FactorySite = decode(&path, self.transport.patch(&path, &body).await?)?;
        self.cache.upsert_cached(updated.clone())?;
        Ok(updated)
    }

    /// Server-side template for a new site. Not stored.
    pub async fn init_factory_site_draft(&self, company_id: EntityId) -> FusionResult<FactorySite> {
        let path = format!("companies/{company_id}/factorysites/init-factory-site-draft");
        get_json(Arc::clone(&self.transport), path).await
    }

    pub fn set_active(&self, factory_site_id: EntityId) {
        self.cache.store().set_active(factory_site_id);
    }
}
