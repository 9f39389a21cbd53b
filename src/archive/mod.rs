//! End-to-end archival runs, one per remote site.
//!
//! Each run is strictly sequential and never aborts on a failed step: fetch
//! and write failures are logged where they happen and the run records
//! whatever it managed to collect.

use reqwest::Url;
use serde_json::Value;
use tracing::{info, warn};

use crate::model::{now, CollectionSnapshot, SyncLog, SyncRecord};
use crate::persist::Persister;
use crate::sync_log::SyncLogStore;

pub mod church;
pub mod moltbook;

pub use church::{ChurchArchiver, ChurchRun};
pub use moltbook::{MoltbookArchiver, MoltbookRun, MoltbookStats};

/// Absolute endpoint on a site, dropping any path or query on the base.
pub(crate) fn endpoint(base_url: &Url, path: &str) -> Url {
    let mut url = base_url.clone();
    url.set_path(path);
    url.set_query(None);
    url
}

/// Same as [`endpoint`] with a query string appended.
pub(crate) fn endpoint_with_query(base_url: &Url, path: &str, query: &[(&str, &str)]) -> Url {
    let mut url = endpoint(base_url, path);
    url.query_pairs_mut().extend_pairs(query);
    url
}

/// Write a collection snapshot unless the walk came back empty, so a failed
/// run never replaces a good archive with nothing.
pub(crate) async fn save_collection(
    persister: &Persister,
    key: &'static str,
    items: &[Value],
    filename: &str,
) {
    if items.is_empty() {
        warn!(collection = key, "nothing fetched; keeping previous snapshot");
        return;
    }
    let snapshot = CollectionSnapshot::new(key, items.to_vec(), now());
    if persister.save_json(&snapshot, filename).await.is_some() {
        info!(
            collection = key,
            total = snapshot.total(),
            archived_at = %snapshot.archived_at(),
            "snapshot written"
        );
    }
}

/// Loads the sync log; a log that cannot be read is left untouched for the
/// rest of the run.
pub(crate) async fn load_log(store: &SyncLogStore) -> Option<SyncLog> {
    match store.load().await {
        Ok(log) => Some(log),
        Err(err) => {
            warn!(%err, "sync log unreadable; this run will not be recorded");
            None
        }
    }
}

pub(crate) async fn record_run(store: &SyncLogStore, log: Option<SyncLog>, record: SyncRecord) {
    let Some(mut log) = log else {
        return;
    };
    if let Err(err) = store.append_and_save(&mut log, record).await {
        warn!(%err, "failed to save sync log");
    }
}
