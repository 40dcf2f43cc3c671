// # Cache Log
//
// Durable mirror of the in-memory IP cache.
//
// ## File Format
//
// One line per cache entry:
//
// ```text
// 2025-06-01 12:00:05 203.0.113.9
// 2025-06-01 12:00:07 2001:db8::1
// ```
//
// The timestamp is a fixed 19-character `YYYY-MM-DD HH:MM:SS` prefix,
// followed by one space and the address literal. Trailing newline
// present. The file holds exactly the entries currently in the cache
// (A partition first, then AAAA) and is fully rewritten on each save.
//
// ## Crash Safety
//
// Saves go through write-to-temp-then-rename so a crash mid-write
// never leaves a truncated log. A missing file on load is an empty
// log, not an error, and corrupt lines are skipped rather than fatal:
// the log seeds the cache, it does not gate startup.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::cache::{CacheEntry, IpCache};
use crate::classify::Address;
use crate::error::{Error, Result};

/// Fixed-width timestamp format of the log line prefix
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Length of the formatted timestamp prefix in bytes
const TIMESTAMP_LEN: usize = 19;

/// Durable append-free record of `(timestamp, address)` pairs
///
/// Source of truth for cache recovery on startup. Entries evicted from
/// the cache disappear from the file on the next save because the save
/// renders the cache's current contents, nothing else.
#[derive(Debug, Clone)]
pub struct CacheLog {
    path: PathBuf,
}

impl CacheLog {
    /// Create a cache log backed by the given file path
    ///
    /// The file is not touched until the first `load` or `save`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all valid entries from the log file
    ///
    /// A missing file yields an empty list. Lines that fail timestamp
    /// or address parsing are skipped with a debug log; partial or
    /// corrupt lines are tolerated, never fatal.
    pub async fn load(&self) -> Result<Vec<CacheEntry>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("cache log does not exist yet: {}", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(Error::cache_log(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        let mut entries = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match Self::parse_line(line) {
                Some(entry) => entries.push(entry),
                None => {
                    tracing::debug!("skipping unparseable cache log line: {:?}", line);
                }
            }
        }

        tracing::debug!(
            "loaded {} entr(ies) from cache log {}",
            entries.len(),
            self.path.display()
        );
        Ok(entries)
    }

    /// Rewrite the log file from the cache's current contents
    ///
    /// Families in fixed order (A then AAAA), cache iteration order.
    /// Each entry is re-emitted with its original capture timestamp, so
    /// rewrites never re-stamp an address. The file is replaced
    /// atomically; a write failure is reported upward and leaves both
    /// the previous file and the in-memory cache untouched.
    pub async fn save(&self, cache: &IpCache) -> Result<()> {
        let mut body = String::new();
        for entry in cache.entries() {
            body.push_str(&entry.timestamp.format(TIMESTAMP_FORMAT).to_string());
            body.push(' ');
            body.push_str(&entry.address.to_string());
            body.push('\n');
        }

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::cache_log(format!(
                    "failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(body.as_bytes()).await.map_err(|e| {
                Error::cache_log(format!(
                    "failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::cache_log(format!(
                    "failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::cache_log(format!(
                "failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("cache log written: {}", self.path.display());
        Ok(())
    }

    /// Parse one log line into an entry
    ///
    /// `get(..)` slicing keeps corrupt multi-byte lines from panicking
    /// on a non-boundary cut.
    fn parse_line(line: &str) -> Option<CacheEntry> {
        let prefix = line.get(..TIMESTAMP_LEN)?;
        let rest = line.get(TIMESTAMP_LEN + 1..)?;
        if line.as_bytes().get(TIMESTAMP_LEN) != Some(&b' ') {
            return None;
        }
        let timestamp = NaiveDateTime::parse_from_str(prefix, TIMESTAMP_FORMAT).ok()?;
        let address = Address::parse(rest)?;
        Some(CacheEntry::new(timestamp, address))
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }
}
