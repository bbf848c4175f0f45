//! Persistence glue — mappings and history in a single store file.
//!
//! Records are MessagePack-encoded and kept under namespaced string
//! keys (`mappings:<seq>` for override rules, `<RFC3339>-<uid>` for
//! history), mirroring the embedded key-value layout the service is
//! deployed against. The whole store is rewritten on mutation; volumes
//! here are tiny (tens of mappings, bounded history reads).

pub mod mappings;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use mappings::Mapping;

/// History is read newest-first, capped per query.
const MAX_HISTORY_RESULTS: usize = 25;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("store I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("store encode: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("store decode: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("invalid mapping: {0}")]
    InvalidMapping(String),
    #[error("mapping not found: {0}")]
    MappingNotFound(String),
}

/// Append-only audit record, one per processed token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub time: OffsetDateTime,
    pub kind: String,
    pub uid: String,
    pub text: String,
    pub data: String,
    pub success: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Store {
    mappings: BTreeMap<String, Mapping>,
    history: BTreeMap<String, HistoryEntry>,
    next_mapping_seq: u64,
}

/// Thread-safe handle to the store file.
pub struct Database {
    path: PathBuf,
    store: Mutex<Store>,
}

impl Database {
    /// Open the store at `path`, creating an empty one if absent.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DbError> {
        let path = path.into();
        let store = match std::fs::read(&path) {
            Ok(bytes) => rmp_serde::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Store::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            store: Mutex::new(store),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, store: &Store) -> Result<(), DbError> {
        let bytes = rmp_serde::to_vec_named(store)?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }

    /// Record a processed token. Key collisions (UID-less tokens within
    /// the same second) get a numeric suffix rather than overwriting.
    pub fn add_history(&self, entry: HistoryEntry) -> Result<(), DbError> {
        let mut store = self.store.lock().unwrap();
        let base = history_key(&entry);
        let mut key = base.clone();
        let mut n = 0u32;
        while store.history.contains_key(&key) {
            n += 1;
            key = format!("{base}-{n}");
        }
        store.history.insert(key, entry);
        self.save(&store)
    }

    /// Most recent history entries, newest first, bounded.
    pub fn history(&self) -> Vec<HistoryEntry> {
        let store = self.store.lock().unwrap();
        store
            .history
            .values()
            .rev()
            .take(MAX_HISTORY_RESULTS)
            .cloned()
            .collect()
    }

    pub(crate) fn with_store<R>(&self, f: impl FnOnce(&mut Store) -> R) -> R {
        let mut store = self.store.lock().unwrap();
        f(&mut store)
    }

    pub(crate) fn mutate_store<R>(
        &self,
        f: impl FnOnce(&mut Store) -> Result<R, DbError>,
    ) -> Result<R, DbError> {
        let mut store = self.store.lock().unwrap();
        let out = f(&mut store)?;
        self.save(&store)?;
        Ok(out)
    }
}

impl Store {
    pub(crate) fn mappings(&self) -> &BTreeMap<String, Mapping> {
        &self.mappings
    }

    pub(crate) fn mappings_mut(&mut self) -> &mut BTreeMap<String, Mapping> {
        &mut self.mappings
    }

    pub(crate) fn next_mapping_id(&mut self) -> u64 {
        self.next_mapping_seq += 1;
        self.next_mapping_seq
    }
}

pub(crate) fn mapping_key(id: &str) -> String {
    format!("mappings:{id}")
}

fn history_key(entry: &HistoryEntry) -> String {
    let ts = entry
        .time
        .format(&Rfc3339)
        .unwrap_or_else(|_| entry.time.unix_timestamp().to_string());
    format!("{ts}-{}", entry.uid)
}
