//! # IP Information Cache
//!
//! A persistent map of IP address to the last document resolved for it. The
//! whole map is loaded once when the store is opened and written back after
//! every mutation, so a crash loses at most the operation in flight.
//!
//! The store has a single owner. Callers that need it from several places go
//! through the [`SessionController`](crate::session::SessionController), which
//! holds it behind `&mut self`.
//!
//! On disk the cache is one JSON object keyed by address:
//!
//! ```json
//! {
//!   "10.0.0.5": {
//!     "payload": { "ip": "10.0.0.5", "hostname": "printer.local" },
//!     "last_updated": "2025-03-01T10:15:00Z"
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use lanscope_common::error::CacheError;

/// How `last_updated` is rendered for display and matched by `find`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    #[serde(skip)]
    pub key: String,
    pub payload: Value,
    pub last_updated: DateTime<Utc>,
}

impl CacheRecord {
    /// Case-insensitive match on the key, the update time or any scalar value
    /// in the payload. `needle` must already be lower-cased.
    fn matches(&self, needle: &str) -> bool {
        self.key.to_lowercase().contains(needle)
            || self.updated_at().to_lowercase().contains(needle)
            || value_contains(&self.payload, needle)
    }

    pub fn updated_at(&self) -> String {
        self.last_updated.format(TIMESTAMP_FORMAT).to_string()
    }
}

fn value_contains(value: &Value, needle: &str) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => b.to_string().contains(needle),
        Value::Number(n) => n.to_string().contains(needle),
        Value::String(s) => s.to_lowercase().contains(needle),
        Value::Array(items) => items.iter().any(|v| value_contains(v, needle)),
        Value::Object(map) => map.values().any(|v| value_contains(v, needle)),
    }
}

#[derive(Debug, Default)]
pub struct CacheStore {
    records: BTreeMap<String, CacheRecord>,
    /// `None` keeps everything in memory.
    path: Option<PathBuf>,
}

impl CacheStore {
    /// Loads the store backed by `path`.
    ///
    /// A missing file is an empty store. So is a file that cannot be parsed,
    /// after a warning. Any other read failure is returned.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();

        let records = match std::fs::read_to_string(&path) {
            Ok(contents) => parse_records(&path, &contents),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No cache file at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(source) => return Err(CacheError::Load { path, source }),
        };

        info!("Cache loaded with {} entries.", records.len());
        Ok(Self {
            records,
            path: Some(path),
        })
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, ip: IpAddr) -> Option<&CacheRecord> {
        self.records.get(&ip.to_string())
    }

    /// Inserts or replaces the record for `ip` and stamps it with the current time.
    pub fn put(&mut self, ip: IpAddr, payload: Value) -> Result<(), CacheError> {
        let key = ip.to_string();
        let record = CacheRecord {
            key: key.clone(),
            payload,
            last_updated: Utc::now(),
        };

        self.records.insert(key, record);
        self.persist()
    }

    /// Returns how many records were removed, 0 or 1.
    pub fn delete(&mut self, ip: IpAddr) -> Result<usize, CacheError> {
        if self.records.remove(&ip.to_string()).is_none() {
            return Ok(0);
        }
        self.persist()?;
        Ok(1)
    }

    /// Removes one record, or every record when `ip` is `None`.
    pub fn clear(&mut self, ip: Option<IpAddr>) -> Result<usize, CacheError> {
        match ip {
            Some(ip) => self.delete(ip),
            None => {
                let removed = self.records.len();
                self.records.clear();
                self.persist()?;
                Ok(removed)
            }
        }
    }

    pub fn find(&self, search: &str) -> Vec<&CacheRecord> {
        let needle = search.to_lowercase();
        self.records.values().filter(|r| r.matches(&needle)).collect()
    }

    /// One record when `ip` is given, otherwise every record in key order.
    pub fn list(&self, ip: Option<IpAddr>) -> Vec<&CacheRecord> {
        match ip {
            Some(ip) => self.get(ip).into_iter().collect(),
            None => self.records.values().collect(),
        }
    }

    /// Writes the full map to a sibling temp file and renames it into place.
    /// On failure the in-memory map is left as it is.
    fn persist(&self) -> Result<(), CacheError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let serialized = serde_json::to_string_pretty(&self.records)?;

        write_atomically(path, &serialized).map_err(|source| {
            error!(
                "Cache could not be saved to {}: {source}. Changes are kept for this session only.",
                path.display()
            );
            CacheError::Persist {
                path: path.clone(),
                source,
            }
        })?;

        debug!("Saved {} entries to {}", self.records.len(), path.display());
        Ok(())
    }
}

fn parse_records(path: &Path, contents: &str) -> BTreeMap<String, CacheRecord> {
    if contents.trim().is_empty() {
        return BTreeMap::new();
    }

    match serde_json::from_str::<BTreeMap<String, CacheRecord>>(contents) {
        Ok(mut records) => {
            for (key, record) in records.iter_mut() {
                record.key = key.clone();
            }
            records
        }
        Err(e) => {
            warn!("Ignoring corrupt cache file {}: {e}", path.display());
            BTreeMap::new()
        }
    }
}

fn write_atomically(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)
}
