//! Fusion Test Utilities
//!
//! Shared test infrastructure for the Fusion workspace:
//! - Proptest generators for records and asset hierarchies
//! - A scripted in-memory [`MockTransport`]
//! - Fixtures for common records and configuration
//! - Assertions on `FusionResult` variants

// Re-export core types for convenience
pub use fusion_core::{
    Asset, Company, EntityId, FactoryAssetDetails, FactoryAssetDetailsWithFields, FactorySite,
    FetchError, FieldDetails, FleetAssetDetails, FusionError, FusionResult, OispAlertPriority,
};

use async_trait::async_trait;
use fusion_client::Transport;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

// ============================================================================
// MOCK TRANSPORT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

/// One request seen by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Debug)]
struct MockState {
    responses: Mutex<HashMap<(Method, String), Result<Value, FetchError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    open: watch::Sender<bool>,
}

/// Scripted transport for service tests.
///
/// Responses are registered per method and path. Unregistered GETs and
/// DELETEs answer 404; unregistered POSTs and PATCHes echo the request body
/// back, the way the backend returns the saved record. Every request is
/// recorded before it is answered.
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<MockState>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    pub fn new() -> Self {
        let (open, _) = watch::channel(true);
        Self {
            state: Arc::new(MockState {
                responses: Mutex::new(HashMap::new()),
                requests: Mutex::new(Vec::new()),
                open,
            }),
        }
    }

    pub fn respond(&self, method: Method, path: impl Into<String>, response: Result<Value, FetchError>) {
        lock(&self.state.responses).insert((method, path.into()), response);
    }

    pub fn on_get(&self, path: impl Into<String>, body: Value) {
        self.respond(Method::Get, path, Ok(body));
    }

    pub fn fail_get(&self, path: impl Into<String>, status: u16) {
        let path = path.into();
        let error = FetchError::Status {
            path: path.clone(),
            status,
            message: "mock failure".to_string(),
        };
        self.respond(Method::Get, path, Err(error));
    }

    /// Hold every request until [`release`](Self::release). Requests are
    /// still recorded when they arrive.
    pub fn hold(&self) {
        self.state.open.send_replace(false);
    }

    pub fn release(&self) {
        self.state.open.send_replace(true);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state.requests).clone()
    }

    /// Number of requests made with `method` to `path`.
    pub fn count(&self, method: Method, path: &str) -> usize {
        lock(&self.state.requests)
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    async fn answer(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, FetchError> {
        lock(&self.state.requests).push(RecordedRequest {
            method,
            path: path.to_string(),
            body: body.clone(),
        });

        let mut open = self.state.open.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = open.wait_for(|open| *open).await;

        let scripted = lock(&self.state.responses)
            .get(&(method, path.to_string()))
            .cloned();
        match (scripted, body) {
            (Some(response), _) => response,
            (None, Some(body)) => Ok(body),
            (None, None) => Err(FetchError::Status {
                path: path.to_string(),
                status: 404,
                message: "no mock response".to_string(),
            }),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, path: &str) -> Result<Value, FetchError> {
        self.answer(Method::Get, path, None).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, FetchError> {
        self.answer(Method::Post, path, Some(body.clone())).await
    }

    async fn patch(&self, path: &str, body: &Value) -> Result<Value, FetchError> {
        self.answer(Method::Patch, path, Some(body.clone())).await
    }

    async fn delete(&self, path: &str) -> Result<(), FetchError> {
        self.answer(Method::Delete, path, None).await.map(|_| ())
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Fusion records.

    use super::*;
    use proptest::prelude::*;

    /// Generate a positive backend id.
    pub fn arb_entity_id() -> impl Strategy<Value = EntityId> {
        1i64..10_000
    }

    /// Generate an OispAlertPriority variant.
    pub fn arb_alert_priority() -> impl Strategy<Value = OispAlertPriority> {
        prop_oneof![
            Just(OispAlertPriority::Urgent),
            Just(OispAlertPriority::High),
            Just(OispAlertPriority::Medium),
            Just(OispAlertPriority::Low),
        ]
    }

    /// Generate an asset of `company_id` without subsystems.
    pub fn arb_asset(company_id: EntityId) -> impl Strategy<Value = Asset> {
        (arb_entity_id(), "[A-Za-z][A-Za-z0-9 ]{0,20}", proptest::option::of(0i64..50)).prop_map(
            move |(id, name, version)| {
                let mut asset = Asset::new(id, company_id, name);
                asset.version = version;
                asset
            },
        )
    }

    /// Generate a flat asset list with unique ids whose subsystem lists may
    /// reference each other, ids outside the list, or form cycles.
    pub fn arb_asset_hierarchy(max_len: usize) -> impl Strategy<Value = Vec<Asset>> {
        let max_id = (max_len as i64).max(1) + 4;
        prop::collection::btree_map(
            0..max_id,
            prop::collection::vec(0..max_id, 0..4),
            0..=max_len,
        )
        .prop_map(|by_id| {
            by_id
                .into_iter()
                .map(|(id, subsystems)| {
                    Asset::new(id, 1, format!("asset-{id}")).with_subsystems(subsystems)
                })
                .collect()
        })
    }

    /// Generate factory asset details with an optional open alert.
    pub fn arb_factory_asset_details() -> impl Strategy<Value = FactoryAssetDetails> {
        (arb_asset(1), proptest::option::of(arb_alert_priority())).prop_map(|(asset, priority)| {
            let mut details = FactoryAssetDetails::from_asset(asset);
            details.open_alert_priority = priority;
            details
        })
    }

    /// Generate a factory site of `company_id` without rooms.
    pub fn arb_factory_site(company_id: EntityId) -> impl Strategy<Value = FactorySite> {
        (arb_entity_id(), "[A-Za-z ]{1,20}").prop_map(move |(id, name)| {
            fixtures::factory_site(id, company_id, &name)
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records and configuration for common scenarios.

    use super::*;
    use fusion_client::ClientConfig;

    /// A valid client configuration pointing at a local backend.
    pub fn client_config() -> ClientConfig {
        ClientConfig {
            api_url_prefix: "http://localhost:8080/api".to_string(),
            request_timeout_ms: 5_000,
            cache_ttl_ms: 3_600_000,
            alerts_update_interval_ms: 10_000,
            data_update_interval_ms: 10_000,
        }
    }

    pub fn company(id: EntityId) -> Company {
        Company {
            id,
            name: format!("Company {id}"),
            description: None,
            image_key: None,
            version: Some(1),
        }
    }

    pub fn factory_site(id: EntityId, company_id: EntityId, name: &str) -> FactorySite {
        FactorySite {
            id,
            company_id,
            name: name.to_string(),
            line1: None,
            zip: None,
            city: None,
            country: None,
            latitude: None,
            longitude: None,
            rooms: Vec::new(),
            version: Some(1),
        }
    }

    pub fn factory_asset_details(
        id: EntityId,
        subsystem_ids: Vec<EntityId>,
        priority: Option<OispAlertPriority>,
    ) -> FactoryAssetDetails {
        let asset = Asset::new(id, 1, format!("asset-{id}")).with_subsystems(subsystem_ids);
        let mut details = FactoryAssetDetails::from_asset(asset);
        details.open_alert_priority = priority;
        details
    }

    pub fn fleet_asset_details(id: EntityId, company_id: EntityId) -> FleetAssetDetails {
        FleetAssetDetails {
            asset: Asset::new(id, company_id, format!("fleet-asset-{id}")),
            manufacturer: "ACME".to_string(),
            asset_series_name: "Series A".to_string(),
            asset_type_name: "Press".to_string(),
            category: "Machine".to_string(),
            room_name: String::new(),
            factory_site_name: String::new(),
        }
    }

    /// Factory asset details carrying one maintenance countdown field.
    pub fn asset_with_countdown(id: EntityId, field_name: &str, value: &str) -> FactoryAssetDetailsWithFields {
        FactoryAssetDetailsWithFields {
            details: factory_asset_details(id, Vec::new(), None),
            fields: vec![FieldDetails::new(id * 100, field_name, Some(value))],
        }
    }

    /// Serialize records into a response body.
    pub fn to_json<T: serde::Serialize>(records: &T) -> Value {
        serde_json::to_value(records).unwrap_or(Value::Null)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on Fusion result variants.

    use super::*;

    /// Assert that a FusionResult failed with an HTTP status.
    #[track_caller]
    pub fn assert_fetch_status<T: std::fmt::Debug>(result: &FusionResult<T>, status: u16) {
        match result {
            Err(FusionError::Fetch(FetchError::Status { status: s, .. })) => {
                assert_eq!(*s, status, "Wrong status in fetch error");
            }
            other => panic!("Expected fetch status {}, got: {:?}", status, other),
        }
    }

    /// Assert that a FusionResult is a Config error.
    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &FusionResult<T>) {
        match result {
            Err(FusionError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_transport_scripts_and_records() {
        let mock = MockTransport::new();
        mock.on_get("companies/1", json!({"id": 1}));

        assert_eq!(mock.get("companies/1").await.unwrap(), json!({"id": 1}));
        let missing = mock.get("companies/2").await.unwrap_err();
        assert!(matches!(missing, FetchError::Status { status: 404, .. }));

        let echoed = mock.post("companies", &json!({"name": "x"})).await.unwrap();
        assert_eq!(echoed, json!({"name": "x"}));

        assert_eq!(mock.count(Method::Get, "companies/1"), 1);
        assert_eq!(mock.requests().len(), 3);
        assert_eq!(mock.requests()[2].body, Some(json!({"name": "x"})));
    }

    #[tokio::test]
    async fn test_mock_transport_hold_and_release() {
        let mock = MockTransport::new();
        mock.on_get("a", json!(1));
        mock.hold();

        let request = mock.get("a");
        let release = async {
            tokio::task::yield_now().await;
            assert_eq!(mock.count(Method::Get, "a"), 1);
            mock.release();
        };
        let (value, ()) = tokio::join!(request, release);
        assert_eq!(value.unwrap(), json!(1));
    }

    #[test]
    fn test_fixture_config_is_valid() {
        assert!(fixtures::client_config().validate().is_ok());
    }
}
