use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::model::ModelError;

/// Shared plumbing for HTTP-backed providers: endpoint joining, bearer auth
/// and the per-request timeout.
pub struct HttpClientBase {
    pub id: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub http: Client,
}

impl HttpClientBase {
    pub fn new(
        id: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            endpoint: endpoint.into(),
            api_key,
            timeout,
            http: Client::new(),
        }
    }

    pub fn build_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// POSTs with bearer auth and treats any non-2xx status as an error.
    pub async fn post_with_bearer(
        &self,
        url: &str,
        payload: &impl Serialize,
    ) -> Result<reqwest::Response, ModelError> {
        let api_key = self.require_api_key()?;
        self.http
            .post(url)
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|source| ModelError::network(&self.id, source))?
            .error_for_status()
            .map_err(|source| ModelError::network(&self.id, source))
    }

    /// POSTs with bearer auth but leaves status handling to the caller, for
    /// services that put structured detail in their error bodies.
    pub async fn post_with_bearer_raw(
        &self,
        url: &str,
        payload: &impl Serialize,
    ) -> Result<reqwest::Response, ModelError> {
        let api_key = self.require_api_key()?;
        self.http
            .post(url)
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|source| ModelError::network(&self.id, source))
    }

    pub async fn post_no_auth(
        &self,
        url: &str,
        payload: &impl Serialize,
    ) -> Result<reqwest::Response, ModelError> {
        self.http
            .post(url)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|source| ModelError::network(&self.id, source))?
            .error_for_status()
            .map_err(|source| ModelError::network(&self.id, source))
    }

    fn require_api_key(&self) -> Result<&str, ModelError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ModelError::missing_api_key(&self.id))
    }
}
