//! Reference-data REST API client
//!
//! HTTP client for the catalog service that owns the group and item
//! collections. Requests are one-shot: a failed fetch surfaces to the
//! caller immediately, nothing retries behind its back. Every request
//! carries an `x-request-id` header that is echoed into error logs.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

use crate::catalog::{decode_collection, DecodedCollection, Domain, Group, Item};

/// Reference-data service client
pub struct CatalogClient {
    client: Client,
    config: ClientConfig,
}

/// Configuration for the reference-data client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the service (e.g., "http://localhost:8080")
    pub base_url: String,
    /// Bearer token, sent when set
    pub token: Option<String>,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            token: None,
            request_timeout_ms: 5000,
        }
    }
}

/// Operations the session layer needs from the reference-data service
///
/// `CatalogClient` is the production implementation; tests drive the
/// session through an in-memory fake.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn fetch_groups(&self, domain: Domain) -> Result<DecodedCollection<Group>, ClientError>;
    async fn fetch_items(&self, domain: Domain) -> Result<DecodedCollection<Item>, ClientError>;

    async fn create_group(&self, domain: Domain, draft: &GroupDraft) -> Result<(), ClientError>;
    async fn update_group(
        &self,
        domain: Domain,
        id: u64,
        draft: &GroupDraft,
    ) -> Result<(), ClientError>;
    async fn delete_group(&self, domain: Domain, id: u64) -> Result<(), ClientError>;

    async fn create_item(&self, domain: Domain, draft: &ItemDraft) -> Result<(), ClientError>;
    async fn update_item(
        &self,
        domain: Domain,
        id: u64,
        draft: &ItemDraft,
    ) -> Result<(), ClientError>;
    async fn delete_item(&self, domain: Domain, id: u64) -> Result<(), ClientError>;

    async fn health_check(&self) -> Result<(), ClientError>;
}

impl CatalogClient {
    /// Create a new client with the given configuration
    pub fn new(config: ClientConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    /// Get the current configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn groups_url(&self, domain: Domain) -> String {
        format!("{}/api/v1/{}/groups", self.config.base_url, domain)
    }

    fn group_url(&self, domain: Domain, id: u64) -> String {
        format!("{}/api/v1/{}/groups/{}", self.config.base_url, domain, id)
    }

    fn items_url(&self, domain: Domain) -> String {
        format!("{}/api/v1/{}/items", self.config.base_url, domain)
    }

    fn item_url(&self, domain: Domain, id: u64) -> String {
        format!("{}/api/v1/{}/items/{}", self.config.base_url, domain, id)
    }

    fn request(&self, method: Method, url: &str) -> (Uuid, reqwest::RequestBuilder) {
        let request_id = Uuid::new_v4();
        let mut builder = self
            .client
            .request(method, url)
            .header("x-request-id", request_id.to_string());
        if let Some(token) = &self.config.token {
            builder = builder.bearer_auth(token);
        }
        (request_id, builder)
    }

    /// GET a collection endpoint and decode it leniently
    ///
    /// A 200 response whose body is valid JSON always succeeds: non-array
    /// payloads become the empty collection and malformed elements are
    /// skipped. Only transport failures, error statuses, and non-JSON
    /// bodies error out.
    async fn fetch_collection<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        endpoint: &str,
    ) -> Result<DecodedCollection<T>, ClientError> {
        let (request_id, builder) = self.request(Method::GET, url);

        let response = builder.send().await.map_err(|e| {
            error!(request_id = %request_id, url = url, error = %e, "collection fetch failed");
            transport_error(e)
        })?;

        if !response.status().is_success() {
            let rejection = api_error(response).await;
            error!(request_id = %request_id, url = url, error = %rejection, "collection fetch rejected");
            return Err(rejection);
        }

        let payload: serde_json::Value = response.json().await.map_err(|e| {
            error!(request_id = %request_id, url = url, error = %e, "collection body is not JSON");
            ClientError::Decode(e.to_string())
        })?;

        let decoded = decode_collection(payload, endpoint);
        debug!(
            request_id = %request_id,
            endpoint = endpoint,
            records = decoded.records.len(),
            skipped = decoded.skipped,
            "collection fetched"
        );
        Ok(decoded)
    }

    /// Send a mutation and treat any 2xx response as done
    async fn send_mutation<B: Serialize + Sync>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<(), ClientError> {
        let (request_id, mut builder) = self.request(method, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            error!(request_id = %request_id, url = url, error = %e, "mutation request failed");
            transport_error(e)
        })?;

        if response.status().is_success() {
            debug!(request_id = %request_id, url = url, "mutation accepted");
            Ok(())
        } else {
            let rejection = api_error(response).await;
            error!(request_id = %request_id, url = url, error = %rejection, "mutation rejected");
            Err(rejection)
        }
    }
}

#[async_trait]
impl CatalogApi for CatalogClient {
    async fn fetch_groups(&self, domain: Domain) -> Result<DecodedCollection<Group>, ClientError> {
        self.fetch_collection(&self.groups_url(domain), "groups").await
    }

    async fn fetch_items(&self, domain: Domain) -> Result<DecodedCollection<Item>, ClientError> {
        self.fetch_collection(&self.items_url(domain), "items").await
    }

    async fn create_group(&self, domain: Domain, draft: &GroupDraft) -> Result<(), ClientError> {
        self.send_mutation(Method::POST, &self.groups_url(domain), Some(draft))
            .await
    }

    async fn update_group(
        &self,
        domain: Domain,
        id: u64,
        draft: &GroupDraft,
    ) -> Result<(), ClientError> {
        self.send_mutation(Method::PUT, &self.group_url(domain, id), Some(draft))
            .await
    }

    async fn delete_group(&self, domain: Domain, id: u64) -> Result<(), ClientError> {
        self.send_mutation::<()>(Method::DELETE, &self.group_url(domain, id), None)
            .await
    }

    async fn create_item(&self, domain: Domain, draft: &ItemDraft) -> Result<(), ClientError> {
        self.send_mutation(Method::POST, &self.items_url(domain), Some(draft))
            .await
    }

    async fn update_item(
        &self,
        domain: Domain,
        id: u64,
        draft: &ItemDraft,
    ) -> Result<(), ClientError> {
        self.send_mutation(Method::PUT, &self.item_url(domain, id), Some(draft))
            .await
    }

    async fn delete_item(&self, domain: Domain, id: u64) -> Result<(), ClientError> {
        self.send_mutation::<()>(Method::DELETE, &self.item_url(domain, id), None)
            .await
    }

    /// Check if the reference-data service is reachable
    async fn health_check(&self) -> Result<(), ClientError> {
        let url = format!("{}/health", self.config.base_url);
        let (request_id, builder) = self.request(Method::GET, &url);

        let response = builder.send().await.map_err(|e| {
            error!(request_id = %request_id, error = %e, "health check failed");
            transport_error(e)
        })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::Unavailable)
        }
    }
}

fn transport_error(error: reqwest::Error) -> ClientError {
    if error.is_timeout() {
        ClientError::Timeout
    } else if error.is_connect() {
        ClientError::Unavailable
    } else {
        ClientError::Request(error)
    }
}

async fn api_error(response: reqwest::Response) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ClientError::Api {
        status: status.as_u16(),
        message: error_message(status, &body),
    }
}

/// Prefer the server's own `{"error": "..."}` message, fall back to the
/// raw body, then to the status reason
fn error_message(status: StatusCode, body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) if !body.trim().is_empty() => body.to_string(),
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    }
}

// ============================================
// Mutation DTOs
// ============================================

/// Fields for creating or updating a group
#[derive(Debug, Clone, Serialize)]
pub struct GroupDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_group_id: Option<u64>,
}

/// Fields for creating or updating an item
#[derive(Debug, Clone, Serialize)]
pub struct ItemDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<u64>,
}

// ============================================
// Errors
// ============================================

/// Errors that can occur when talking to the reference-data service
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("reference-data service unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Response decode failed: {0}")]
    Decode(String),
}
