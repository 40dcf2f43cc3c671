//! Test doubles and common utilities for integration tests
//!
//! Provides an in-memory record store fake with call recording, so
//! tests can assert both the resulting remote state and the exact set
//! of mutating calls issued.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cfsync_core::classify::Family;
use cfsync_core::error::{Error, Result};
use cfsync_core::traits::{RecordStore, RemoteRecord};

/// One record held by the fake provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub id: String,
    pub name: String,
    pub family: Family,
    pub content: String,
}

#[derive(Default)]
struct Inner {
    next_id: usize,
    records: Vec<StoredRecord>,
    deletes: Vec<String>,
    creates: Vec<(String, Family, String)>,
    fail_lists: bool,
}

/// In-memory record store with call recording
#[derive(Clone, Default)]
pub struct FakeRecordStore {
    inner: Arc<Mutex<Inner>>,
}

impl FakeRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a pre-existing remote record, returning its id
    pub fn with_record(&self, name: &str, family: Family, content: &str) -> String {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = format!("rec-{}", inner.next_id);
        inner.records.push(StoredRecord {
            id: id.clone(),
            name: name.to_string(),
            family,
            content: content.to_string(),
        });
        id
    }

    /// Snapshot of the current remote state
    pub fn records(&self) -> Vec<StoredRecord> {
        self.inner.lock().unwrap().records.clone()
    }

    /// Remote records of one family at one name
    pub fn records_for(&self, name: &str, family: Family) -> Vec<StoredRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.name == name && r.family == family)
            .collect()
    }

    /// Ids passed to delete calls, in order
    pub fn deletes(&self) -> Vec<String> {
        self.inner.lock().unwrap().deletes.clone()
    }

    /// (name, family, content) triples passed to create calls, in order
    pub fn creates(&self) -> Vec<(String, Family, String)> {
        self.inner.lock().unwrap().creates.clone()
    }

    /// Total number of mutating calls issued so far
    pub fn mutation_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.deletes.len() + inner.creates.len()
    }

    /// Make every list call fail from now on
    pub fn fail_lists(&self, fail: bool) {
        self.inner.lock().unwrap().fail_lists = fail;
    }
}

#[async_trait]
impl RecordStore for FakeRecordStore {
    async fn list_records(&self, record_name: &str, family: Family) -> Result<Vec<RemoteRecord>> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_lists {
            return Err(Error::provider("fake", "list failure injected"));
        }
        Ok(inner
            .records
            .iter()
            .filter(|r| r.name == record_name && r.family == family)
            .map(|r| RemoteRecord {
                id: r.id.clone(),
                content: r.content.clone(),
            })
            .collect())
    }

    async fn delete_record(&self, record_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.deletes.push(record_id.to_string());
        inner.records.retain(|r| r.id != record_id);
        Ok(())
    }

    async fn create_record(&self, record_name: &str, family: Family, content: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = format!("rec-{}", inner.next_id);
        inner
            .creates
            .push((record_name.to_string(), family, content.to_string()));
        inner.records.push(StoredRecord {
            id,
            name: record_name.to_string(),
            family,
            content: content.to_string(),
        });
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
