use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("body is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("invalid JSON body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Single-attempt GET access to a remote site.
///
/// Every failure is reported as `None`; callers treat it as "no data".
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch_json(&self, url: &str) -> Option<Value>;

    async fn fetch_text(&self, url: &str) -> Option<String>;
}

#[derive(Clone)]
pub struct HttpFetcher {
    http: Client,
    user_agent: String,
}

impl fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .no_proxy()
            .build()?;
        Ok(Self {
            http,
            user_agent: user_agent.to_string(),
        })
    }

    /// Body decoded as strict UTF-8; malformed bytes are an error, not
    /// replacement characters.
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        debug!(url, "GET");
        let res = self.http.get(url).send().await?;
        if !res.status().is_success() {
            return Err(FetchError::Status(res.status()));
        }
        let bytes = res.bytes().await?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    pub async fn try_fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        let body = self.get_text(url).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn try_fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.get_text(url).await
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch_json(&self, url: &str) -> Option<Value> {
        match self.try_fetch_json(url).await {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(url, %err, "fetch failed");
                None
            }
        }
    }

    async fn fetch_text(&self, url: &str) -> Option<String> {
        match self.try_fetch_text(url).await {
            Ok(text) => Some(text),
            Err(err) => {
                warn!(url, %err, "fetch failed");
                None
            }
        }
    }
}
