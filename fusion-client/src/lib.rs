//! Fusion Client - REST Services for the Console Data Layer
//!
//! Wires the cached entity stores of `fusion-storage` to the Fusion REST API.
//! A [`FusionContext`] owns one store per entity type and the services that
//! fill them through a [`Transport`].

pub mod config;
pub mod context;
pub mod services;
pub mod telemetry;
pub mod transport;

pub use config::ClientConfig;
pub use context::FusionContext;
pub use services::{
    CompanyService, FactoryAssetDetailsService, FactorySiteService, FleetAssetDetailsService,
};
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};
pub use transport::{decode, encode, RestTransport, Transport};
