//! Core orchestration engine
//!
//! The SyncEngine wires the pipeline together:
//!
//! ```text
//! discovery stream ── StreamParser ── classify
//!                                        │
//!                                        ▼
//!                              IpCache (accept + evict)
//!                                        │
//!                          ┌─────────────┴─────────────┐
//!                          ▼                           ▼
//!                     CacheLog (save)      Reconciler × record name
//!                                          (spawned, fire-and-forget)
//! ```
//!
//! One sequential consumer drains the discovery stream; blocking on
//! the stream is the natural backpressure point. Each accepted address
//! updates the cache under its write lock, persists the log, then
//! dispatches one reconciliation task per configured record name.
//! Tasks run to completion unsupervised and share only the guarded
//! cache snapshot; a slow or failing task never blocks the reader or
//! its siblings.

use std::sync::Arc;

use chrono::Local;
use tokio::sync::{RwLock, mpsc};
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::cache::{CacheLog, IpCache};
use crate::classify::{Address, Family};
use crate::error::Result;
use crate::reconcile::Reconciler;
use crate::stream::StreamParser;
use crate::traits::RecordStore;

/// Capacity of the engine event channel; overflow drops events
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Events emitted by the engine for external observation
///
/// Purely informational; dropping the receiver loses nothing but
/// visibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A new address passed validation and entered the cache
    AddressAccepted {
        address: Address,
        family: Family,
    },

    /// A reconciliation task was dispatched for one record name
    SyncDispatched {
        record_name: String,
        address: Address,
    },

    /// Persisting the cache log failed; in-memory state is unaffected
    CacheSaveFailed {
        error: String,
    },

    /// Engine started consuming the discovery stream
    Started {
        records_count: usize,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// Orchestrator for the discovery → cache → reconcile pipeline
pub struct SyncEngine {
    store: Arc<dyn RecordStore>,
    cache: Arc<RwLock<IpCache>>,
    log: Arc<CacheLog>,
    parser: StreamParser,
    record_names: Vec<String>,
    event_tx: mpsc::Sender<EngineEvent>,
}

impl SyncEngine {
    /// Create an engine
    ///
    /// # Parameters
    ///
    /// - `store`: record store shared by all reconciliation tasks
    /// - `log`: cache log backing file
    /// - `record_names`: record names to reconcile on each acceptance
    /// - `sync_count`: per-family cache bound
    ///
    /// # Returns
    ///
    /// The engine plus a receiver of [`EngineEvent`]s for monitoring.
    pub fn new(
        store: Arc<dyn RecordStore>,
        log: CacheLog,
        record_names: Vec<String>,
        sync_count: usize,
    ) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let engine = Self {
            store,
            cache: Arc::new(RwLock::new(IpCache::new(sync_count))),
            log: Arc::new(log),
            parser: StreamParser::new(),
            record_names,
            event_tx: tx,
        };

        (engine, rx)
    }

    /// Handle to the shared cache
    pub fn cache(&self) -> Arc<RwLock<IpCache>> {
        Arc::clone(&self.cache)
    }

    /// Seed the cache from the log file (startup only)
    ///
    /// Returns the number of entries replayed before truncation.
    pub async fn seed_from_log(&self) -> Result<usize> {
        let entries = self.log.load().await?;
        let replayed = entries.len();
        self.cache.write().await.seed(entries);
        Ok(replayed)
    }

    /// Consume the discovery stream until it ends
    ///
    /// This is the single sequential reader; it returns when the
    /// stream is exhausted (discovery process exited).
    pub async fn run<S>(&self, mut lines: S) -> Result<()>
    where
        S: Stream<Item = String> + Unpin,
    {
        self.emit_event(EngineEvent::Started {
            records_count: self.record_names.len(),
        });

        while let Some(line) = lines.next().await {
            debug!(target: "discovery", "{}", line);
            for address in self.parser.parse_line(&line) {
                self.handle_address(address).await;
            }
        }

        self.emit_event(EngineEvent::Stopped {
            reason: "discovery stream ended".to_string(),
        });
        info!("discovery stream ended, engine stopped");
        Ok(())
    }

    /// The single accept path for one validated address
    async fn handle_address(&self, address: Address) {
        let family = address.family();
        let timestamp = Local::now().naive_local();

        let accepted = self.cache.write().await.accept(address, timestamp);
        if !accepted {
            debug!("address {} already cached, skipping", address);
            return;
        }

        info!("accepted new {} address: {}", family, address);
        self.emit_event(EngineEvent::AddressAccepted { address, family });

        // Persist before dispatching. A write failure is surfaced and
        // logged; the in-memory cache stays authoritative either way.
        {
            let cache = self.cache.read().await;
            if let Err(e) = self.log.save(&cache).await {
                warn!("failed to persist cache log: {}", e);
                self.emit_event(EngineEvent::CacheSaveFailed {
                    error: e.to_string(),
                });
            }
        }

        for record_name in &self.record_names {
            self.emit_event(EngineEvent::SyncDispatched {
                record_name: record_name.clone(),
                address,
            });

            let reconciler = Reconciler::new(Arc::clone(&self.store), Arc::clone(&self.cache));
            let record_name = record_name.clone();
            tokio::spawn(async move {
                reconciler.reconcile(address, &record_name).await;
            });
        }
    }

    fn emit_event(&self, event: EngineEvent) {
        // Lossy on overflow; monitoring must never stall the reader.
        if self.event_tx.try_send(event).is_err() {
            debug!("event channel full, dropping engine event");
        }
    }
}
