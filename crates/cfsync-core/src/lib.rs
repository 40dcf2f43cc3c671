// # cfsync-core
//
// Core library for the cfnat-sync dynamic DNS reconciler.
//
// ## Architecture Overview
//
// The system observes a stream of discovered IP addresses (produced by
// an external discovery subprocess) and keeps a DNS provider's records
// synchronized with a bounded, deduplicated, most-recent set of
// addresses per address family.
//
// - **classify**: strict IP-literal validation and family derivation
// - **cache**: the bounded, family-partitioned IP cache and its
//   durable log file
// - **stream**: permissive-extract / strict-validate parsing of the
//   discovery subprocess's stdout
// - **reconcile**: idempotent read-diff-write convergence of remote
//   records against the cache's desired set
// - **engine**: the orchestrator wiring the above together
// - **traits**: the two external seams ([`RecordStore`] for the DNS
//   provider, [`DiscoverySource`] for the subprocess)
//
// ## Design Principles
//
// 1. **Read before write**: every remote mutation is conditional on an
//    observed divergence, making reconciliation idempotent
// 2. **Single accept path**: the cache mutates in exactly one place,
//    serialized behind one lock
// 3. **Fire-and-forget sync**: reconciliation tasks run per record
//    name, unsupervised; one slow provider call never blocks the
//    stream reader or other names
// 4. **Local error recovery**: parse errors skip a line, provider
//    errors abandon a step, persistence errors are logged; only
//    configuration errors are fatal

pub mod cache;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod reconcile;
pub mod stream;
pub mod traits;

// Re-export core types for convenience
pub use cache::{CacheEntry, CacheLog, IpCache};
pub use classify::{Address, Family, classify};
pub use config::{CloudflareConfig, Config, DiscoveryArgs};
pub use engine::{EngineEvent, SyncEngine};
pub use error::{Error, Result};
pub use reconcile::Reconciler;
pub use stream::StreamParser;
pub use traits::{DiscoverySource, RecordStore, RemoteRecord};
