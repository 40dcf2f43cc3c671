// # Discovery Source Trait
//
// The boundary to the external address-discovery process.
//
// ## Implementations
//
// - cfnat subprocess: `cfsync-source-cfnat` crate
//
// ## Contract
//
// A source produces a continuous line-oriented UTF-8 text stream with
// no fixed schema; the engine's parser decides which lines matter.
// The source owns the underlying process handle: `shutdown()` forwards
// termination, best effort. Sources make no decisions about addresses
// or DNS; they are plumbing, not logic.

use std::pin::Pin;

use async_trait::async_trait;
use tokio_stream::Stream;

use crate::error::Result;

/// Trait for discovery stream implementations
#[async_trait]
pub trait DiscoverySource: Send {
    /// Take the line stream
    ///
    /// The stream ends when the underlying process exits. Callable
    /// once; subsequent calls yield an empty stream.
    fn lines(&mut self) -> Pin<Box<dyn Stream<Item = String> + Send + 'static>>;

    /// Forward termination to the underlying process, best effort
    async fn shutdown(&mut self) -> Result<()>;
}
