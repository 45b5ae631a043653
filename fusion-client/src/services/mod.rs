//! REST services backed by cached entity stores.
//!
//! Each service builds request paths, routes reads through its
//! [`CachedFetch`](fusion_storage::CachedFetch) and echoes writes back into
//! the store.

mod company;
mod factory_asset_details;
mod factory_site;
mod fleet_asset_details;

pub use company::CompanyService;
pub use factory_asset_details::FactoryAssetDetailsService;
pub use factory_site::FactorySiteService;
pub use fleet_asset_details::FleetAssetDetailsService;
