// # Cloudflare Record Store
//
// Cloudflare implementation of the `RecordStore` trait.
//
// ## Scope
//
// This is deliberately NOT a full Cloudflare API client. The
// reconciler needs exactly three operations against one zone's record
// collection, and that is all this crate speaks:
//
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=...&name=...`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
//
// Records are created with automatic TTL (`ttl: 1`) and `proxied:
// false`. Every call is a stateless single shot: no retry, no backoff,
// no caching (the next accepted address is the retry).
//
// ## Authentication
//
// Account email + API key via `X-Auth-Email` / `X-Auth-Key` request
// headers.
//
// ## Security Requirements
//
// - The API key NEVER appears in logs
// - The `Debug` implementation redacts the key
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/

use std::time::Duration;

use async_trait::async_trait;
use cfsync_core::classify::Family;
use cfsync_core::error::{Error, Result};
use cfsync_core::traits::{RecordStore, RemoteRecord};
use serde::Deserialize;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Cloudflare record store for one zone
pub struct CloudflareStore {
    /// Account email, sent as `X-Auth-Email`
    email: String,

    /// Account API key, sent as `X-Auth-Key`
    /// ⚠️ NEVER log this value
    api_key: String,

    /// Zone id holding the managed records
    zone_id: String,

    /// API base URL; overridable for tests
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for CloudflareStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareStore")
            .field("email", &self.email)
            .field("api_key", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// List response envelope
#[derive(Debug, Deserialize)]
struct ListResponse {
    success: bool,
    #[serde(default)]
    result: Option<Vec<DnsRecord>>,
}

/// One DNS record as returned by the list endpoint
///
/// The API returns more fields; only these two matter here.
#[derive(Debug, Deserialize)]
struct DnsRecord {
    id: String,
    content: String,
}

/// Mutation response envelope (create/delete)
#[derive(Debug, Deserialize)]
struct StatusResponse {
    success: bool,
}

impl CloudflareStore {
    /// Create a store for one zone
    ///
    /// Credentials must be non-empty; configuration validation catches
    /// this earlier, but the store fails fast regardless.
    pub fn new(
        email: impl Into<String>,
        api_key: impl Into<String>,
        zone_id: impl Into<String>,
    ) -> Result<Self> {
        let email = email.into();
        let api_key = api_key.into();
        let zone_id = zone_id.into();

        if email.is_empty() || api_key.is_empty() || zone_id.is_empty() {
            return Err(Error::config(
                "Cloudflare email, api_key and zone_id are all required",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            email,
            api_key,
            zone_id,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
        })
    }

    /// Point the store at a different API base URL (tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, self.zone_id)
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("X-Auth-Email", &self.email)
            .header("X-Auth-Key", &self.api_key)
            .header("Content-Type", "application/json")
    }

    /// Map a non-success HTTP status to an error, consuming the response
    async fn status_error(&self, operation: &str, response: reqwest::Response) -> Error {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unable to read error response".to_string());
        Error::provider(
            "cloudflare",
            format!("{} failed: {} - {}", operation, status, body),
        )
    }
}

#[async_trait]
impl RecordStore for CloudflareStore {
    async fn list_records(&self, record_name: &str, family: Family) -> Result<Vec<RemoteRecord>> {
        tracing::debug!(
            "listing {} records for {} in zone {}",
            family,
            record_name,
            self.zone_id
        );

        let response = self
            .authed(self.client.get(self.records_url()))
            .query(&[("type", family.record_type()), ("name", record_name)])
            .send()
            .await
            .map_err(|e| Error::http(format!("list request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(self.status_error("record list", response).await);
        }

        let body: ListResponse = response
            .json()
            .await
            .map_err(|e| Error::provider("cloudflare", format!("invalid list response: {}", e)))?;

        if !body.success {
            return Err(Error::provider(
                "cloudflare",
                format!("record list for {} ({}) not successful", record_name, family),
            ));
        }

        Ok(body
            .result
            .unwrap_or_default()
            .into_iter()
            .map(|r| RemoteRecord {
                id: r.id,
                content: r.content,
            })
            .collect())
    }

    async fn delete_record(&self, record_id: &str) -> Result<()> {
        let url = format!("{}/{}", self.records_url(), record_id);

        let response = self
            .authed(self.client.delete(&url))
            .send()
            .await
            .map_err(|e| Error::http(format!("delete request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(self.status_error("record delete", response).await);
        }

        tracing::debug!("deleted record {}", record_id);
        Ok(())
    }

    async fn create_record(&self, record_name: &str, family: Family, content: &str) -> Result<()> {
        // ttl 1 means "automatic" on the Cloudflare API.
        let payload = serde_json::json!({
            "type": family.record_type(),
            "name": record_name,
            "content": content,
            "ttl": 1,
            "proxied": false,
        });

        let response = self
            .authed(self.client.post(self.records_url()))
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::http(format!("create request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(self.status_error("record create", response).await);
        }

        let body: StatusResponse = response.json().await.map_err(|e| {
            Error::provider("cloudflare", format!("invalid create response: {}", e))
        })?;

        if !body.success {
            return Err(Error::provider(
                "cloudflare",
                format!(
                    "record create for {} ({} {}) not successful",
                    record_name, family, content
                ),
            ));
        }

        tracing::debug!("created {} record {} -> {}", family, record_name, content);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}
