use std::sync::Arc;

use fusion_core::{Company, EntityId, FusionResult};
use fusion_storage::{CachedFetch, EntityQuery, EntityStore};

use crate::transport::{get_json, Transport};

/// Parent key of the full company list.
const ALL_COMPANIES: &str = "companies";

/// Companies visible to the session. The active company is the one the
/// console is scoped to.
#[derive(Clone)]
pub struct CompanyService {
    transport: Arc<dyn Transport>,
    cache: CachedFetch<Company>,
}

impl CompanyService {
    pub fn new(transport: Arc<dyn Transport>, cache: CachedFetch<Company>) -> Self {
        Self { transport, cache }
    }

    pub fn query(&self) -> EntityQuery<Company> {
        self.cache.query()
    }

    pub fn store(&self) -> &EntityStore<Company> {
        self.cache.store()
    }

    pub fn cache(&self) -> &CachedFetch<Company> {
        &self.cache
    }

    /// Every company. `refresh` drops the cached list first.
    pub async fn get_companies(&self, refresh: bool) -> FusionResult<Vec<Company>> {
        if refresh {
            self.cache.invalidate_cache_parent_id(ALL_COMPANIES)?;
        }
        let transport = Arc::clone(&self.transport);
        let read = self
            .cache
            .cached_by_parent_id(ALL_COMPANIES, move || {
                get_json::<Vec<Company>>(transport, ALL_COMPANIES.to_string())
            })
            .await?;
        Ok(read.into_value())
    }

    pub async fn get_company(&self, company_id: EntityId, refresh: bool) -> FusionResult<Company> {
        if refresh {
            self.cache.invalidate_cache_id(&company_id)?;
        }
        let path = format!("companies/{company_id}");
        let transport = Arc::clone(&self.transport);
        let read = self
            .cache
            .cached_by_id(company_id, move || get_json::<Company>(transport, path))
            .await?;
        Ok(read.into_value())
    }

    pub fn set_active(&self, company_id: EntityId) {
        self.cache.store().set_active(company_id);
    }
}
