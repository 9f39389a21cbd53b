use molt_archiver::fetch::Fetch;
use molt_archiver::paginate::{PageStyle, Paginator, StopReason};
use reqwest::Url;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Serves queued responses in order and records every requested URL.
#[derive(Clone, Default)]
struct RecordingFetcher {
    responses: Arc<Mutex<VecDeque<Option<Value>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingFetcher {
    fn with_responses(responses: Vec<Option<Value>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            ..Default::default()
        }
    }

    async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl Fetch for RecordingFetcher {
    async fn fetch_json(&self, url: &str) -> Option<Value> {
        self.calls.lock().await.push(url.to_string());
        self.responses.lock().await.pop_front().flatten()
    }

    async fn fetch_text(&self, url: &str) -> Option<String> {
        self.calls.lock().await.push(url.to_string());
        None
    }
}

fn base() -> Url {
    Url::parse("https://example.test").unwrap()
}

/// `n` items `{"id": 0..n}` split into bodies of `page_size` under `key`.
fn paged_bodies(n: usize, page_size: usize, key: &str) -> Vec<Option<Value>> {
    let items: Vec<Value> = (0..n).map(|i| json!({ "id": i })).collect();
    items
        .chunks(page_size)
        .map(|chunk| Some(json!({ key: chunk })))
        .collect()
}

fn ids(items: &[Value]) -> Vec<u64> {
    items.iter().map(|v| v["id"].as_u64().unwrap()).collect()
}

#[tokio::test]
async fn short_last_page_needs_exactly_ceil_fetches() {
    for (n, p) in [(110, 50), (1, 50), (7, 3), (99, 10), (5, 100), (51, 50)] {
        let fetcher = RecordingFetcher::with_responses(paged_bodies(n, p, "the_great_book"));
        let base = base();
        let walk = Paginator::new(
            &fetcher,
            &base,
            "/api/canon",
            "the_great_book",
            PageStyle::PageNumber,
            p,
        )
        .walk()
        .await;

        let expected_fetches = n.div_ceil(p);
        assert_eq!(walk.items.len(), n, "n={n} p={p}");
        assert_eq!(ids(&walk.items), (0..n as u64).collect::<Vec<_>>());
        assert_eq!(walk.fetches, expected_fetches, "n={n} p={p}");
        assert_eq!(fetcher.calls().await.len(), expected_fetches);
        assert_eq!(walk.stop, StopReason::ShortPage);
    }
}

#[tokio::test]
async fn page_number_urls_advance_from_one() {
    let fetcher = RecordingFetcher::with_responses(paged_bodies(110, 50, "the_great_book"));
    let base = base();
    Paginator::new(
        &fetcher,
        &base,
        "/api/canon",
        "the_great_book",
        PageStyle::PageNumber,
        50,
    )
    .walk()
    .await;

    assert_eq!(
        fetcher.calls().await,
        vec![
            "https://example.test/api/canon?page=1&per_page=50",
            "https://example.test/api/canon?page=2&per_page=50",
            "https://example.test/api/canon?page=3&per_page=50",
        ]
    );
}

#[tokio::test]
async fn full_last_page_costs_one_empty_fetch() {
    let mut responses = paged_bodies(100, 50, "submolts");
    responses.push(Some(json!({ "submolts": [] })));
    let fetcher = RecordingFetcher::with_responses(responses);
    let base = base();
    let walk = Paginator::new(
        &fetcher,
        &base,
        "/api/v1/submolts",
        "submolts",
        PageStyle::Offset,
        50,
    )
    .walk()
    .await;

    assert_eq!(walk.items.len(), 100);
    assert_eq!(walk.fetches, 3);
    assert_eq!(walk.stop, StopReason::EmptyPage);
    assert_eq!(
        fetcher.calls().await[2],
        "https://example.test/api/v1/submolts?limit=50&offset=100"
    );
}

#[tokio::test]
async fn limit_bounds_fetches() {
    let (n, p, limit) = (500, 50, 120);
    let fetcher = RecordingFetcher::with_responses(paged_bodies(n, p, "posts"));
    let base = base();
    let walk = Paginator::new(
        &fetcher,
        &base,
        "/api/v1/posts",
        "posts",
        PageStyle::Offset,
        p,
    )
    .limit(limit)
    .walk()
    .await;

    assert!(walk.items.len() >= limit);
    assert_eq!(walk.items.len(), 150);
    assert!(walk.fetches <= limit.div_ceil(p));
    assert_eq!(walk.stop, StopReason::LimitReached);
}

#[tokio::test]
async fn absent_page_truncates_walk() {
    let k = 3;
    let mut responses = paged_bodies(300, 50, "posts");
    responses[k - 1] = None;
    let fetcher = RecordingFetcher::with_responses(responses);
    let base = base();
    let walk = Paginator::new(
        &fetcher,
        &base,
        "/api/v1/posts",
        "posts",
        PageStyle::Offset,
        50,
    )
    .walk()
    .await;

    assert_eq!(ids(&walk.items), (0..100).collect::<Vec<_>>());
    assert_eq!(walk.stop, StopReason::FetchFailed);
    assert_eq!(fetcher.calls().await.len(), k);
}

#[tokio::test]
async fn has_more_false_stops_on_full_page() {
    let fetcher = RecordingFetcher::with_responses(vec![
        Some(json!({ "posts": [{"id": 0}, {"id": 1}], "has_more": true })),
        Some(json!({ "posts": [{"id": 2}, {"id": 3}], "has_more": false })),
        Some(json!({ "posts": [{"id": 4}], "has_more": false })),
    ]);
    let base = base();
    let walk = Paginator::new(&fetcher, &base, "/api/v1/posts", "posts", PageStyle::Offset, 2)
        .has_more_key("has_more")
        .walk()
        .await;

    assert_eq!(ids(&walk.items), vec![0, 1, 2, 3]);
    assert_eq!(walk.fetches, 2);
    assert_eq!(walk.stop, StopReason::NoMore);
}

#[tokio::test]
async fn missing_has_more_falls_back_to_short_page() {
    let fetcher = RecordingFetcher::with_responses(vec![
        Some(json!({ "posts": [{"id": 0}, {"id": 1}] })),
        Some(json!({ "posts": [{"id": 2}] })),
    ]);
    let base = base();
    let walk = Paginator::new(&fetcher, &base, "/api/v1/posts", "posts", PageStyle::Offset, 2)
        .has_more_key("has_more")
        .walk()
        .await;

    assert_eq!(walk.items.len(), 3);
    assert_eq!(walk.stop, StopReason::ShortPage);
}

#[tokio::test]
async fn limit_takes_precedence_over_flag_and_short_page() {
    let fetcher = RecordingFetcher::with_responses(vec![Some(
        json!({ "posts": [{"id": 0}, {"id": 1}, {"id": 2}], "has_more": false }),
    )]);
    let base = base();
    let walk = Paginator::new(&fetcher, &base, "/api/v1/posts", "posts", PageStyle::Offset, 10)
        .limit(2)
        .has_more_key("has_more")
        .walk()
        .await;

    assert_eq!(walk.items.len(), 3);
    assert_eq!(walk.stop, StopReason::LimitReached);
}

#[tokio::test]
async fn missing_item_list_is_an_empty_page() {
    let fetcher = RecordingFetcher::with_responses(vec![Some(json!({ "error": "nope" }))]);
    let base = base();
    let walk = Paginator::new(
        &fetcher,
        &base,
        "/api/canon",
        "the_great_book",
        PageStyle::PageNumber,
        50,
    )
    .walk()
    .await;

    assert!(walk.items.is_empty());
    assert_eq!(walk.fetches, 1);
    assert_eq!(walk.stop, StopReason::EmptyPage);
}

#[tokio::test(start_paused = true)]
async fn politeness_delay_only_between_pages() {
    let fetcher = RecordingFetcher::with_responses(paged_bodies(110, 50, "the_great_book"));
    let base = base();
    let start = tokio::time::Instant::now();
    let walk = Paginator::new(
        &fetcher,
        &base,
        "/api/canon",
        "the_great_book",
        PageStyle::PageNumber,
        50,
    )
    .delay(Duration::from_millis(500))
    .walk()
    .await;

    assert_eq!(walk.fetches, 3);
    assert_eq!(walk.stop, StopReason::ShortPage);
    // two pauses: after page 1 and page 2, none after the short page
    assert_eq!(start.elapsed(), Duration::from_millis(1000));
}
