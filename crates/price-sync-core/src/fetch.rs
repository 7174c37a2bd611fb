use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode};

use crate::error::{Result, SyncError};

/// Body of a fetched document, or a definite "no such document".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    Body(String),
    NotFound,
}

/// Retrieval of raw source text. Transport problems are errors; a missing
/// document is not.
pub trait SourceFetcher {
    fn fetch_text(&self, url: &str) -> impl Future<Output = Result<Fetched>> + Send;
}

pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("price-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }
}

impl SourceFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<Fetched> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Fetched::NotFound);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(Fetched::Body(resp.text().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hits GitHub. Run with: cargo test -- --ignored
    #[tokio::test]
    #[ignore]
    async fn fetches_live_source_and_reports_missing() {
        let fetcher = HttpFetcher::new(Duration::from_secs(30)).expect("client");
        let config = crate::config::load_bundled_config().expect("bundled config");

        let found = fetcher
            .fetch_text(&config.source_url("openai"))
            .await
            .expect("openai source should download");
        assert!(matches!(found, Fetched::Body(ref text) if text.contains("pricing")));

        let missing = fetcher
            .fetch_text(&config.source_url("no-such-provider"))
            .await
            .expect("404 is not an error");
        assert_eq!(missing, Fetched::NotFound);
    }
}
