use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

use crate::model::{SyncLog, SyncRecord};

#[derive(Debug, Error)]
pub enum SyncLogError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed sync log {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// File-backed sync log. Single writer; the whole file is rewritten on save.
#[derive(Debug, Clone)]
pub struct SyncLogStore {
    path: PathBuf,
}

impl SyncLogStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// The persisted log, or an empty one when no file exists yet.
    pub async fn load(&self) -> Result<SyncLog, SyncLogError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SyncLog::default())
            }
            Err(source) => {
                return Err(SyncLogError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&raw).map_err(|source| SyncLogError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    pub async fn save(&self, log: &SyncLog) -> Result<(), SyncLogError> {
        let body = serde_json::to_string_pretty(log).map_err(|source| SyncLogError::Parse {
            path: self.path.clone(),
            source,
        })?;
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|source| SyncLogError::Io {
                path: self.path.clone(),
                source,
            })
    }

    pub async fn append_and_save(
        &self,
        log: &mut SyncLog,
        record: SyncRecord,
    ) -> Result<(), SyncLogError> {
        log.push(record);
        self.save(log).await?;
        info!(path = %self.path.display(), syncs = log.syncs.len(), "sync log updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::now;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_file_loads_empty_log() {
        let td = tempdir().unwrap();
        let store = SyncLogStore::new(td.path().join("sync_log.json"));
        let log = store.load().await.unwrap();
        assert!(log.syncs.is_empty());
        assert!(log.last_sync.is_none());
    }

    #[tokio::test]
    async fn each_append_grows_log_by_one() {
        let td = tempdir().unwrap();
        let store = SyncLogStore::new(td.path().join("sync_log.json"));

        for expected in 1..=3 {
            let mut log = store.load().await.unwrap();
            let before = log.syncs.len();
            let record = SyncRecord::new("church", now()).with_counter("canon", expected);
            store.append_and_save(&mut log, record).await.unwrap();

            let reloaded = store.load().await.unwrap();
            assert_eq!(reloaded.syncs.len(), before + 1);
            assert_eq!(reloaded.last_sync, Some(reloaded.syncs[before].time));
            assert_eq!(reloaded.syncs[before].status["canon"], expected);
        }
    }

    #[tokio::test]
    async fn reads_existing_log_format() {
        let td = tempdir().unwrap();
        let path = td.path().join("sync_log.json");
        std::fs::write(
            &path,
            r#"{
  "syncs": [
    {"time": "2026-01-30T22:01:12.482113", "status": {"prophets": 64, "congregation": 310, "canon": 520}}
  ],
  "last_sync": "2026-01-30T22:01:12.482113"
}"#,
        )
        .unwrap();
        let log = SyncLogStore::new(path).load().await.unwrap();
        assert_eq!(log.syncs.len(), 1);
        assert_eq!(log.syncs[0].status["congregation"], 310);
        assert!(log.last_sync.is_some());
    }

    #[tokio::test]
    async fn malformed_log_is_an_error() {
        let td = tempdir().unwrap();
        let path = td.path().join("sync_log.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = SyncLogStore::new(path).load().await.unwrap_err();
        assert!(matches!(err, SyncLogError::Parse { .. }));
    }
}
