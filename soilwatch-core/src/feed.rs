//! Sources of feed snapshots.

use crate::error::SoilwatchError;
use log::debug;
use soilwatch_schemas::feed::RawFeedEntry;
use std::future::Future;

/// Anything that can return the full current snapshot of the feed.
///
/// A fetch is an idempotent read: the feed only ever grows at the end.
pub trait FeedSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<Vec<RawFeedEntry>, SoilwatchError>> + Send;
}

/// Reads the feed with one HTTP GET against a spreadsheet web endpoint.
#[derive(Debug, Clone)]
pub struct HttpFeed {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpFeed {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, SoilwatchError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(SoilwatchError::ConfigError(
                "feed endpoint must not be empty".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| SoilwatchError::FeedRequest(endpoint.clone(), e))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl FeedSource for HttpFeed {
    async fn fetch(&self) -> Result<Vec<RawFeedEntry>, SoilwatchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SoilwatchError::FeedRequest(self.endpoint.clone(), e))?;
        let entries: Vec<RawFeedEntry> = response
            .json()
            .await
            .map_err(|e| SoilwatchError::FeedRequest(self.endpoint.clone(), e))?;
        debug!("Fetched snapshot of {} entries from {}", entries.len(), self.endpoint);
        Ok(entries)
    }
}
