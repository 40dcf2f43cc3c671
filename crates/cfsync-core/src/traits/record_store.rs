// # Record Store Trait
//
// Defines the interface for reading and mutating a DNS provider's
// per-zone record collection.
//
// ## Implementations
//
// - Cloudflare: `cfsync-provider-cloudflare` crate
//
// ## Contract
//
// The reconciler only ever issues the three wire operations below:
// list records filtered by (type, name), delete a record by id, and
// create a record. Implementations must be stateless single-shot API
// callers: no retry or backoff (the next accepted address is the
// retry), no caching, no background tasks. Errors are returned to the
// reconciler, which decides how much of the current step to abandon.

use async_trait::async_trait;

use crate::classify::Family;
use crate::error::Result;

/// One record as it currently exists at the provider
///
/// The provider returns more fields than this; only the id (needed for
/// deletion) and the content (needed for diffing) matter to the
/// reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    /// Provider-assigned record id
    pub id: String,
    /// Record content (the address literal as the provider stores it)
    pub content: String,
}

/// Trait for DNS provider record collections
///
/// Implementations must be thread-safe and usable across async tasks;
/// one reconciliation task runs per record name and they share the
/// store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// List the provider's current records of one type at one name
    async fn list_records(&self, record_name: &str, family: Family) -> Result<Vec<RemoteRecord>>;

    /// Delete a record by provider id
    async fn delete_record(&self, record_id: &str) -> Result<()>;

    /// Create a record with automatic TTL, not proxied
    async fn create_record(&self, record_name: &str, family: Family, content: &str) -> Result<()>;

    /// Provider name for logging
    fn provider_name(&self) -> &'static str;
}
