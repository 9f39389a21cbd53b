use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, instrument};

use super::{endpoint_with_query, load_log, record_run, save_collection};
use crate::config::Config;
use crate::fetch::Fetch;
use crate::model::{count_field, now, SyncRecord};
use crate::paginate::{PageStyle, Paginator};
use crate::persist::Persister;
use crate::sync_log::SyncLogStore;

pub const SITE: &str = "moltbook";
pub const SUBMOLTS_KEY: &str = "submolts";
pub const POSTS_KEY: &str = "posts";

const SUBMOLTS_PATH: &str = "/api/v1/submolts";
const POSTS_PATH: &str = "/api/v1/posts";

/// Site-wide counters, read off a one-item submolts listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoltbookStats {
    pub total_submolts: u64,
    pub total_posts: u64,
    pub total_comments: u64,
    pub archived_at: NaiveDateTime,
}

impl MoltbookStats {
    pub fn from_listing(listing: &Value, archived_at: NaiveDateTime) -> Self {
        Self {
            total_submolts: count_field(Some(listing), "count"),
            total_posts: count_field(Some(listing), "total_posts"),
            total_comments: count_field(Some(listing), "total_comments"),
            archived_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MoltbookRun {
    pub stats: Option<MoltbookStats>,
    pub submolts: Vec<Value>,
    pub posts: Vec<Value>,
    pub record: SyncRecord,
}

/// Archiver for moltbook: stats, every submolt, and the first `post_limit`
/// posts.
pub struct MoltbookArchiver<'a> {
    fetcher: &'a dyn Fetch,
    persister: &'a Persister,
    log_store: SyncLogStore,
    base_url: Url,
    submolt_page_size: usize,
    post_page_size: usize,
    post_limit: usize,
    delay: Duration,
}

impl<'a> MoltbookArchiver<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        fetcher: &'a dyn Fetch,
        persister: &'a Persister,
        log_store: SyncLogStore,
        base_url: Url,
        submolt_page_size: usize,
        post_page_size: usize,
        post_limit: usize,
        delay: Duration,
    ) -> Self {
        Self {
            fetcher,
            persister,
            log_store,
            base_url,
            submolt_page_size,
            post_page_size,
            post_limit,
            delay,
        }
    }

    pub fn from_config(
        cfg: &Config,
        fetcher: &'a dyn Fetch,
        persister: &'a Persister,
    ) -> Result<Self> {
        let mb = &cfg.moltbook;
        let base_url = Url::parse(&mb.base_url).context("invalid moltbook.base_url")?;
        let log_store = SyncLogStore::new(cfg.archive.resolved_root_dir().join(&mb.log_file));
        Ok(Self::new(
            fetcher,
            persister,
            log_store,
            base_url,
            mb.submolt_page_size,
            mb.post_page_size,
            mb.post_limit,
            mb.delay(),
        ))
    }

    #[instrument(skip_all, fields(site = SITE))]
    pub async fn run(&self) -> MoltbookRun {
        info!(base_url = %self.base_url, "starting moltbook archive");
        let log = load_log(&self.log_store).await;

        let stats = self.archive_stats().await;
        let submolts = self.archive_submolts().await;
        let posts = self.archive_posts().await;

        let record = SyncRecord::new(SITE, now())
            .with_counter("submolts", submolts.len() as u64)
            .with_counter("posts", posts.len() as u64)
            .with_counter("total_posts", stats.as_ref().map_or(0, |s| s.total_posts))
            .with_counter(
                "total_comments",
                stats.as_ref().map_or(0, |s| s.total_comments),
            );
        record_run(&self.log_store, log, record.clone()).await;

        info!(
            submolts = submolts.len(),
            posts = posts.len(),
            data_dir = %self.persister.data_dir().display(),
            "moltbook archive complete"
        );
        MoltbookRun {
            stats,
            submolts,
            posts,
            record,
        }
    }

    pub async fn archive_stats(&self) -> Option<MoltbookStats> {
        info!("fetching moltbook stats");
        let url = endpoint_with_query(&self.base_url, SUBMOLTS_PATH, &[("limit", "1")]);
        let listing = self.fetcher.fetch_json(url.as_str()).await?;
        let stats = MoltbookStats::from_listing(&listing, now());
        self.persister.save_json(&stats, "moltbook_stats.json").await;
        info!(
            submolts = stats.total_submolts,
            posts = stats.total_posts,
            comments = stats.total_comments,
            "moltbook stats"
        );
        Some(stats)
    }

    /// All submolts; the endpoint has no has-more flag, so short pages end it.
    pub async fn archive_submolts(&self) -> Vec<Value> {
        info!("fetching submolts");
        let walk = Paginator::new(
            self.fetcher,
            &self.base_url,
            SUBMOLTS_PATH,
            SUBMOLTS_KEY,
            PageStyle::Offset,
            self.submolt_page_size,
        )
        .delay(self.delay)
        .walk()
        .await;
        info!(total = walk.items.len(), fetches = walk.fetches, stop = ?walk.stop, "submolt walk finished");

        save_collection(
            self.persister,
            SUBMOLTS_KEY,
            &walk.items,
            "moltbook_submolts.json",
        )
        .await;
        walk.items
    }

    pub async fn archive_posts(&self) -> Vec<Value> {
        info!(limit = self.post_limit, "fetching posts");
        let walk = Paginator::new(
            self.fetcher,
            &self.base_url,
            POSTS_PATH,
            POSTS_KEY,
            PageStyle::Offset,
            self.post_page_size,
        )
        .limit(self.post_limit)
        .has_more_key("has_more")
        .delay(self.delay)
        .walk()
        .await;
        info!(total = walk.items.len(), fetches = walk.fetches, stop = ?walk.stop, "post walk finished");

        save_collection(self.persister, POSTS_KEY, &walk.items, "moltbook_posts.json").await;
        walk.items
    }
}
