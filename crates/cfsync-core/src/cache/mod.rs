//! Bounded, family-partitioned IP cache
//!
//! The cache is the central data structure of the system: two ordered
//! sequences of accepted addresses, one per family, each holding at
//! most `sync_count` entries. New acceptances prepend and evict from
//! the tail, so a partition reads newest-first in steady state.
//!
//! The cache itself is a plain owned object; callers that share it
//! across tasks wrap it in `Arc<tokio::sync::RwLock<_>>` (the engine
//! does exactly that). `accept` is the single mutation path.

pub mod log;

pub use log::CacheLog;

use chrono::NaiveDateTime;

use crate::classify::{Address, Family};

/// A single accepted address with its wall-clock capture time
///
/// Created when an address is first accepted, either replayed from the
/// cache log at startup or newly discovered. Never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    /// Wall-clock time the address was first captured
    pub timestamp: NaiveDateTime,
    /// The accepted address
    pub address: Address,
}

impl CacheEntry {
    /// Create a new cache entry
    pub fn new(timestamp: NaiveDateTime, address: Address) -> Self {
        Self { timestamp, address }
    }
}

/// In-memory, family-partitioned, bounded store of accepted addresses
#[derive(Debug)]
pub struct IpCache {
    sync_count: usize,
    v4: Vec<CacheEntry>,
    v6: Vec<CacheEntry>,
}

impl IpCache {
    /// Create an empty cache bounded at `sync_count` entries per family
    ///
    /// `sync_count` must be positive; configuration validation rejects
    /// zero before a cache is ever constructed, but a zero here is
    /// clamped to one rather than silently emptying every partition.
    pub fn new(sync_count: usize) -> Self {
        Self {
            sync_count: sync_count.max(1),
            v4: Vec::new(),
            v6: Vec::new(),
        }
    }

    /// Seed the cache from replayed log entries (startup only)
    ///
    /// Partitions by family, sorts ascending by timestamp, drops
    /// repeated addresses (a hand-edited or merged log may list the
    /// same address on several lines; the oldest line wins), and keeps
    /// the first `sync_count` entries of each partition: on restart the
    /// addresses that have been stable longest win, since the log may
    /// have been written in discovery order rather than acceptance
    /// order.
    pub fn seed(&mut self, entries: Vec<CacheEntry>) {
        let (mut v4, mut v6): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .partition(|e| e.address.family() == Family::A);

        v4.sort_by_key(|e| e.timestamp);
        v6.sort_by_key(|e| e.timestamp);
        Self::dedup_addresses(&mut v4);
        Self::dedup_addresses(&mut v6);
        v4.truncate(self.sync_count);
        v6.truncate(self.sync_count);

        self.v4 = v4;
        self.v6 = v6;
    }

    /// Drop entries whose address already appeared earlier in the list
    fn dedup_addresses(entries: &mut Vec<CacheEntry>) {
        let mut seen: Vec<Address> = Vec::new();
        entries.retain(|e| {
            if seen.contains(&e.address) {
                false
            } else {
                seen.push(e.address);
                true
            }
        });
    }

    /// Accept a newly discovered address
    ///
    /// Returns `false` (no-op) if the address is already present in its
    /// family partition. Otherwise prepends a new entry, truncates the
    /// partition to `sync_count`, and returns `true`.
    pub fn accept(&mut self, address: Address, timestamp: NaiveDateTime) -> bool {
        let sync_count = self.sync_count;
        let partition = self.partition_mut(address.family());

        if partition.iter().any(|e| e.address == address) {
            return false;
        }

        partition.insert(0, CacheEntry::new(timestamp, address));
        partition.truncate(sync_count);
        true
    }

    /// Snapshot of the current authoritative address set for a family
    pub fn desired(&self, family: Family) -> Vec<Address> {
        self.partition(family).iter().map(|e| e.address).collect()
    }

    /// All current entries, A partition first then AAAA
    ///
    /// This is the persistence iteration order of the cache log.
    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.v4.iter().chain(self.v6.iter())
    }

    /// Number of entries across both partitions
    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    /// Whether both partitions are empty
    pub fn is_empty(&self) -> bool {
        self.v4.is_empty() && self.v6.is_empty()
    }

    fn partition(&self, family: Family) -> &Vec<CacheEntry> {
        match family {
            Family::A => &self.v4,
            Family::Aaaa => &self.v6,
        }
    }

    fn partition_mut(&mut self, family: Family) -> &mut Vec<CacheEntry> {
        match family {
            Family::A => &mut self.v4,
            Family::Aaaa => &mut self.v6,
        }
    }
}
