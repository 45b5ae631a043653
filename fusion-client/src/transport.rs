//! Transport seam between services and the REST backend.
//!
//! Services only ever see [`Transport`]; [`RestTransport`] is the `reqwest`
//! implementation used in production. Paths are relative to the configured
//! `api_url_prefix` and never start with a slash.

use async_trait::async_trait;
use fusion_core::{FetchError, FusionError, FusionResult};
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;

/// JSON-over-HTTP requests against the backend.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, path: &str) -> Result<Value, FetchError>;

    async fn post(&self, path: &str, body: &Value) -> Result<Value, FetchError>;

    async fn patch(&self, path: &str, body: &Value) -> Result<Value, FetchError>;

    async fn delete(&self, path: &str) -> Result<(), FetchError>;
}

#[derive(Debug, Clone)]
pub struct RestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl RestTransport {
    pub fn new(config: &ClientConfig) -> FusionResult<Self> {
        let base_url = config.api_url_prefix.trim().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| FetchError::Transport {
                path: base_url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a relative API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(
        &self,
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, FetchError> {
        let response = request
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(|e| request_error(path, e))?;

        let status = response.status();
        tracing::debug!(path = path, status = status.as_u16(), "response received");
        if status.is_success() {
            Ok(response)
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(FetchError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn send_json(
        &self,
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, FetchError> {
        let response = self.send(path, request).await?;
        response.json::<Value>().await.map_err(|e| request_error(path, e))
    }
}

#[async_trait]
impl Transport for RestTransport {
    async fn get(&self, path: &str) -> Result<Value, FetchError> {
        tracing::debug!(method = "GET", path = path, "request");
        self.send_json(path, self.client.get(self.url(path))).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, FetchError> {
        tracing::debug!(method = "POST", path = path, "request");
        let request = self
            .client
            .post(self.url(path))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .json(body);
        self.send_json(path, request).await
    }

    async fn patch(&self, path: &str, body: &Value) -> Result<Value, FetchError> {
        tracing::debug!(method = "PATCH", path = path, "request");
        let request = self
            .client
            .patch(self.url(path))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .json(body);
        self.send_json(path, request).await
    }

    async fn delete(&self, path: &str) -> Result<(), FetchError> {
        tracing::debug!(method = "DELETE", path = path, "request");
        self.send(path, self.client.delete(self.url(path))).await?;
        Ok(())
    }
}

fn request_error(path: &str, err: reqwest::Error) -> FetchError {
    let path = path.to_string();
    if err.is_timeout() {
        FetchError::Timeout { path }
    } else if err.is_decode() {
        FetchError::Decode {
            path,
            reason: err.to_string(),
        }
    } else {
        FetchError::Transport {
            path,
            reason: err.to_string(),
        }
    }
}

/// Deserialize a response body into a typed record.
pub fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T, FetchError> {
    serde_json::from_value(value).map_err(|e| FetchError::Decode {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

/// Serialize a request body.
pub fn encode<T: Serialize>(path: &str, body: &T) -> Result<Value, FetchError> {
    serde_json::to_value(body).map_err(|e| FetchError::Decode {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

/// GET `path` and decode the body. Owns its inputs so it can run as a
/// cached-fetch producer.
pub(crate) async fn get_json<T: DeserializeOwned>(
    transport: std::sync::Arc<dyn Transport>,
    path: String,
) -> FusionResult<T> {
    let value = transport.get(&path).await?;
    decode(&path, value).map_err(FusionError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_core::FactorySite;
    use serde_json::json;

    fn config(prefix: &str) -> ClientConfig {
        ClientConfig {
            api_url_prefix: prefix.to_string(),
            request_timeout_ms: 1_000,
            cache_ttl_ms: 1_000,
            alerts_update_interval_ms: 10_000,
            data_update_interval_ms: 10_000,
        }
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let transport = RestTransport::new(&config("http://localhost:8080/api/")).unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8080/api");
        assert_eq!(
            transport.url("companies/1/factorysites"),
            "http://localhost:8080/api/companies/1/factorysites"
        );
        assert_eq!(
            transport.url("/companies/1"),
            "http://localhost:8080/api/companies/1"
        );
    }

    #[test]
    fn test_decode_reports_path() {
        let err = decode::<FactorySite>("companies/1/factorysites/2", json!({"id": "x"}))
            .unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
        assert_eq!(err.path(), "companies/1/factorysites/2");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let transport = RestTransport::new(&config("http://127.0.0.1:9")).unwrap();
        let err = transport.get("companies").await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::Transport { .. } | FetchError::Timeout { .. }
        ));
    }
}
