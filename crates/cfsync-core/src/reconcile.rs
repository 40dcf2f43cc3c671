//! DNS reconciliation
//!
//! Read-before-write convergence of one record name against the
//! cache's desired address set. Each invocation runs two independent
//! steps:
//!
//! 1. **Cross-family purge** — delete every record of the *other*
//!    family at the name. A name resolves to exactly one family's
//!    address set at a time; flipping from IPv4 to IPv6 (or back) must
//!    not leave a stale record of the previous family behind. The
//!    purge is unconditional on every acceptance.
//! 2. **Same-family converge** — list the current records, diff against
//!    the cache's desired set, delete what is no longer desired and
//!    create what is missing. All writes are conditional on actual
//!    divergence, so a second run with unchanged cache state issues
//!    zero mutating calls.
//!
//! A provider-call failure abandons the remainder of its step only; it
//! never rolls back progress already made and never retries. The next
//! accepted address triggers the next attempt.

use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::IpCache;
use crate::classify::{Address, Family};
use crate::error::Result;
use crate::traits::RecordStore;

/// Reconciles one record name's remote state with the cache
///
/// Cheap to clone; one clone runs per in-flight reconciliation task.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn RecordStore>,
    cache: Arc<RwLock<IpCache>>,
}

impl Reconciler {
    /// Create a reconciler over a record store and the shared cache
    pub fn new(store: Arc<dyn RecordStore>, cache: Arc<RwLock<IpCache>>) -> Self {
        Self { store, cache }
    }

    /// Converge `record_name` after `address` was accepted
    ///
    /// Never returns an error: provider failures are logged with the
    /// record name and record type involved and the affected step is
    /// abandoned for this invocation.
    pub async fn reconcile(&self, address: Address, record_name: &str) {
        let family = address.family();
        let other = family.opposite();

        if let Err(e) = self.purge_other_family(record_name, other).await {
            warn!(
                "[{}] {} purge abandoned ({}): {}",
                record_name,
                other,
                self.store.provider_name(),
                e
            );
        }

        if let Err(e) = self.converge(record_name, family).await {
            warn!(
                "[{}] {} converge abandoned ({}): {}",
                record_name,
                family,
                self.store.provider_name(),
                e
            );
        }
    }

    /// Delete every record of the other family at this name
    async fn purge_other_family(&self, record_name: &str, other: Family) -> Result<()> {
        let stale = self.store.list_records(record_name, other).await?;
        for record in stale {
            self.store.delete_record(&record.id).await?;
            info!(
                "[{}] removed stale {} record: {}",
                record_name, other, record.content
            );
        }
        Ok(())
    }

    /// Diff the same-family remote set against the desired set
    async fn converge(&self, record_name: &str, family: Family) -> Result<()> {
        let existing = self.store.list_records(record_name, family).await?;
        let desired = self.cache.read().await.desired(family);

        // Compare by parsed IP so textually different but equal IPv6
        // renderings converge instead of churning.
        let desired_ips: Vec<IpAddr> = desired.iter().map(|a| a.ip()).collect();
        let existing_ips: Vec<IpAddr> = existing
            .iter()
            .filter_map(|r| r.content.parse().ok())
            .collect();

        for record in &existing {
            let keep = record
                .content
                .parse::<IpAddr>()
                .map(|ip| desired_ips.contains(&ip))
                .unwrap_or(false);
            if keep {
                debug!(
                    "[{}] keeping {} record: {}",
                    record_name, family, record.content
                );
                continue;
            }
            self.store.delete_record(&record.id).await?;
            info!(
                "[{}] removed undesired {} record: {}",
                record_name, family, record.content
            );
        }

        for address in &desired {
            if existing_ips.contains(&address.ip()) {
                continue;
            }
            self.store
                .create_record(record_name, family, &address.to_string())
                .await?;
            info!("[{}] created {} record: {}", record_name, family, address);
        }

        Ok(())
    }
}
