use chrono::{Local, NaiveDateTime};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Local wall-clock time without an offset, matching the archive's on-disk
/// timestamp format (`2026-01-31T09:15:02.123456`).
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// One full remote collection as of one run.
///
/// Items are opaque and stored under a collection-specific key
/// (`the_great_book`, `posts`, `submolts`). `total` is derived from the item
/// list when serialized, so it cannot drift from it.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSnapshot {
    key: &'static str,
    items: Vec<Value>,
    archived_at: NaiveDateTime,
}

impl CollectionSnapshot {
    pub fn new(key: &'static str, items: Vec<Value>, archived_at: NaiveDateTime) -> Self {
        Self {
            key,
            items,
            archived_at,
        }
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn archived_at(&self) -> NaiveDateTime {
        self.archived_at
    }
}

impl Serialize for CollectionSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("success", &true)?;
        map.serialize_entry("total", &self.items.len())?;
        map.serialize_entry(self.key, &self.items)?;
        map.serialize_entry("archived_at", &self.archived_at)?;
        map.end()
    }
}

/// Summary of one completed archival run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncRecord {
    pub time: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    pub status: BTreeMap<String, u64>,
}

impl SyncRecord {
    pub fn new(site: &str, time: NaiveDateTime) -> Self {
        Self {
            time,
            site: Some(site.to_string()),
            status: BTreeMap::new(),
        }
    }

    pub fn with_counter(mut self, name: &str, value: u64) -> Self {
        self.status.insert(name.to_string(), value);
        self
    }
}

/// Append-only history of run summaries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncLog {
    pub syncs: Vec<SyncRecord>,
    pub last_sync: Option<NaiveDateTime>,
}

impl SyncLog {
    pub fn push(&mut self, record: SyncRecord) {
        self.last_sync = Some(record.time);
        self.syncs.push(record);
    }
}

/// Numeric field of an optional JSON object, or 0 when absent or non-numeric.
pub fn count_field(value: Option<&Value>, key: &str) -> u64 {
    value
        .and_then(|v| v.get(key))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}
