use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Archive;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Writes archive files under fixed directories, always overwriting.
///
/// Writes are not atomic; an interrupted run may leave a truncated file that
/// the next run replaces.
#[derive(Debug, Clone)]
pub struct Persister {
    root_dir: PathBuf,
    data_dir: PathBuf,
    html_dir: PathBuf,
}

impl Persister {
    pub fn new(root_dir: PathBuf, data_dir: PathBuf, html_dir: PathBuf) -> Self {
        Self {
            root_dir,
            data_dir,
            html_dir,
        }
    }

    pub fn from_config(archive: &Archive) -> Self {
        Self::new(
            archive.resolved_root_dir(),
            archive.resolved_data_dir(),
            archive.resolved_html_dir(),
        )
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn html_dir(&self) -> &Path {
        &self.html_dir
    }

    /// Pretty-printed JSON into the data directory.
    pub async fn try_save_json<T: Serialize + ?Sized>(
        &self,
        value: &T,
        filename: &str,
    ) -> Result<PathBuf, PersistError> {
        let path = self.data_dir.join(filename);
        let body = serde_json::to_string_pretty(value).map_err(|source| {
            PersistError::Serialize {
                path: path.clone(),
                source,
            }
        })?;
        write_file(path, body).await
    }

    pub async fn save_json<T: Serialize + ?Sized>(&self, value: &T, filename: &str) -> Option<PathBuf> {
        report(self.try_save_json(value, filename).await, filename)
    }

    /// Raw page capture into the html directory.
    pub async fn save_html(&self, content: &str, filename: &str) -> Option<PathBuf> {
        let path = self.html_dir.join(filename);
        report(write_file(path, content.to_string()).await, filename)
    }

    /// Text report at the archive root.
    pub async fn save_report(&self, content: &str, filename: &str) -> Option<PathBuf> {
        let path = self.root_dir.join(filename);
        report(write_file(path, content.to_string()).await, filename)
    }
}

async fn write_file(path: PathBuf, body: String) -> Result<PathBuf, PersistError> {
    match tokio::fs::write(&path, body).await {
        Ok(()) => Ok(path),
        Err(source) => Err(PersistError::Write { path, source }),
    }
}

fn report(result: Result<PathBuf, PersistError>, filename: &str) -> Option<PathBuf> {
    match result {
        Ok(path) => {
            info!(file = filename, "saved");
            Some(path)
        }
        Err(err) => {
            warn!(%err, "save failed");
            None
        }
    }
}
