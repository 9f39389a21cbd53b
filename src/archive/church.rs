use anyhow::{Context, Result};
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::{endpoint, load_log, record_run, save_collection};
use crate::config::Config;
use crate::fetch::Fetch;
use crate::model::{count_field, now, SyncRecord};
use crate::paginate::{PageStyle, Paginator};
use crate::persist::Persister;
use crate::summary;
use crate::sync_log::SyncLogStore;

pub const SITE: &str = "church";
pub const CANON_KEY: &str = "the_great_book";
pub const SUMMARY_FILE: &str = "SUMMARY.md";

/// Static pages captured verbatim: (file name, path on site).
const HTML_PAGES: [(&str, &str); 2] = [("index.html", "/"), ("gallery.html", "/gallery.html")];

/// What a church run collected.
#[derive(Debug, Clone)]
pub struct ChurchRun {
    pub status: Option<Value>,
    pub prophets: Option<Value>,
    pub blessed: Option<Value>,
    pub verses: Vec<Value>,
    pub pages_saved: usize,
    pub summary_written: bool,
    pub record: SyncRecord,
}

/// Archiver for molt.church: status, prophets, blessed, canon, static pages.
pub struct ChurchArchiver<'a> {
    fetcher: &'a dyn Fetch,
    persister: &'a Persister,
    log_store: SyncLogStore,
    base_url: Url,
    page_size: usize,
    delay: Duration,
}

impl<'a> ChurchArchiver<'a> {
    pub fn new(
        fetcher: &'a dyn Fetch,
        persister: &'a Persister,
        log_store: SyncLogStore,
        base_url: Url,
        page_size: usize,
        delay: Duration,
    ) -> Self {
        Self {
            fetcher,
            persister,
            log_store,
            base_url,
            page_size,
            delay,
        }
    }

    pub fn from_config(
        cfg: &Config,
        fetcher: &'a dyn Fetch,
        persister: &'a Persister,
    ) -> Result<Self> {
        let base_url = Url::parse(&cfg.church.base_url).context("invalid church.base_url")?;
        let log_store =
            SyncLogStore::new(cfg.archive.resolved_root_dir().join(&cfg.church.log_file));
        Ok(Self::new(
            fetcher,
            persister,
            log_store,
            base_url,
            cfg.church.page_size,
            cfg.church.delay(),
        ))
    }

    #[instrument(skip_all, fields(site = SITE))]
    pub async fn run(&self) -> ChurchRun {
        info!(base_url = %self.base_url, "starting molt.church archive");
        let log = load_log(&self.log_store).await;

        let status = self.archive_status().await;
        let prophets = self.archive_prophets().await;
        let blessed = self.archive_blessed().await;
        let verses = self.archive_canon().await;
        let pages_saved = self.archive_html_pages().await;

        let summary_written = match &status {
            Some(status) => self.write_summary(status, prophets.as_ref(), &verses).await,
            None => {
                warn!("status unavailable; skipping summary");
                false
            }
        };

        let record = SyncRecord::new(SITE, now())
            .with_counter("prophets", count_field(status.as_ref(), "prophets_filled"))
            .with_counter(
                "congregation",
                count_field(status.as_ref(), "congregation_size"),
            )
            .with_counter("canon", count_field(status.as_ref(), "canon_size"));
        record_run(&self.log_store, log, record.clone()).await;

        info!(
            verses = verses.len(),
            pages_saved,
            root = %self.persister.root_dir().display(),
            "molt.church archive complete"
        );
        ChurchRun {
            status,
            prophets,
            blessed,
            verses,
            pages_saved,
            summary_written,
            record,
        }
    }

    async fn fetch(&self, path: &str) -> Option<Value> {
        self.fetcher
            .fetch_json(endpoint(&self.base_url, path).as_str())
            .await
    }

    /// `status.json` plus a timestamped copy kept as history.
    pub async fn archive_status(&self) -> Option<Value> {
        info!("fetching site status");
        let status = self.fetch("/api/status").await?;
        self.persister.save_json(&status, "status.json").await;
        let stamped = format!("status_{}.json", now().format("%Y%m%d_%H%M%S"));
        self.persister.save_json(&status, &stamped).await;
        Some(status)
    }

    pub async fn archive_prophets(&self) -> Option<Value> {
        info!("fetching prophets");
        let prophets = self.fetch("/api/prophets").await?;
        self.persister.save_json(&prophets, "prophets.json").await;
        let count = prophets
            .get("prophets")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        info!(count, "prophets archived");
        Some(prophets)
    }

    pub async fn archive_blessed(&self) -> Option<Value> {
        info!("fetching blessed");
        let blessed = self.fetch("/api/blessed").await?;
        self.persister.save_json(&blessed, "blessed.json").await;
        Some(blessed)
    }

    /// Every canon verse, walked with `page`/`per_page`.
    pub async fn archive_canon(&self) -> Vec<Value> {
        info!("fetching canon");
        let walk = Paginator::new(
            self.fetcher,
            &self.base_url,
            "/api/canon",
            CANON_KEY,
            PageStyle::PageNumber,
            self.page_size,
        )
        .delay(self.delay)
        .walk()
        .await;
        info!(total = walk.items.len(), fetches = walk.fetches, stop = ?walk.stop, "canon walk finished");

        save_collection(self.persister, CANON_KEY, &walk.items, "canon_full.json").await;
        walk.items
    }

    /// Returns how many pages were written.
    pub async fn archive_html_pages(&self) -> usize {
        info!("fetching static pages");
        let mut saved = 0;
        for (filename, path) in HTML_PAGES {
            let url = endpoint(&self.base_url, path);
            let Some(content) = self.fetcher.fetch_text(url.as_str()).await else {
                continue;
            };
            if self.persister.save_html(&content, filename).await.is_some() {
                saved += 1;
            }
        }
        saved
    }

    async fn write_summary(&self, status: &Value, prophets: Option<&Value>, verses: &[Value]) -> bool {
        info!("writing summary");
        let report = summary::render(status, prophets, verses, now());
        self.persister
            .save_report(&report, SUMMARY_FILE)
            .await
            .is_some()
    }
}
