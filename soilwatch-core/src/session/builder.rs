use super::{
    engine::SessionEngine,
    state::{ChartVisibility, SessionState},
};
use crate::{
    error::SoilwatchError,
    feed::FeedSource,
    ingestor::Ingestor,
    views::{TimeFormat, DEFAULT_TABLE_ROWS},
    window::{WindowNavigator, DEFAULT_PAGE_SIZE},
};
use soilwatch_schemas::file_formats::{AbsorbPolicy, Settings};
use std::{sync::Arc, time::Duration};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(8);

/// A fluent builder for a dashboard session.
///
/// Every setting has a default, so `SessionBuilder::new().build(feed)` yields a session that
/// polls every ten seconds and absorbs the whole new suffix of the feed per cycle.
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    policy: AbsorbPolicy,
    poll_interval: Duration,
    fetch_timeout: Duration,
    page_size: usize,
    table_rows: usize,
    time_format: Option<TimeFormat>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            policy: AbsorbPolicy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
            table_rows: DEFAULT_TABLE_ROWS,
            time_format: None,
        }
    }
}

impl SessionBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies every session-relevant field from loaded `Settings`.
    pub fn with_settings(self, settings: &Settings) -> Self {
        self.with_absorb_policy(settings.absorb_policy)
            .with_poll_interval(Duration::from_secs(settings.poll_interval_secs))
            .with_fetch_timeout(Duration::from_secs(settings.fetch_timeout_secs))
            .with_page_size(settings.page_size)
            .with_table_rows(settings.table_rows)
            .with_time_format(TimeFormat::from_offset_minutes(settings.utc_offset_minutes))
    }

    pub fn with_absorb_policy(mut self, policy: AbsorbPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Upper bound on one poll cycle, fetch included.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_table_rows(mut self, rows: usize) -> Self {
        self.table_rows = rows;
        self
    }

    pub fn with_time_format(mut self, format: TimeFormat) -> Self {
        self.time_format = Some(format);
        self
    }

    /// Builds an empty session state without a poller, for callers that feed snapshots
    /// themselves.
    pub fn build_state(&self) -> SessionState {
        SessionState {
            ingestor: Ingestor::new(self.policy),
            window: WindowNavigator::new(self.page_size),
            visibility: ChartVisibility::default(),
            format: self.time_format.unwrap_or_default(),
            table_rows: self.table_rows,
        }
    }

    /// Consumes the builder and returns an engine ready to `spawn`.
    ///
    /// # Errors
    ///
    /// Returns `SoilwatchError::ConfigError` if the poll interval or cycle budget is zero.
    pub fn build<F: FeedSource>(self, feed: F) -> Result<SessionEngine<F>, SoilwatchError> {
        if self.poll_interval.is_zero() {
            return Err(SoilwatchError::ConfigError(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.fetch_timeout.is_zero() {
            return Err(SoilwatchError::ConfigError(
                "fetch timeout must be greater than zero".to_string(),
            ));
        }
        Ok(SessionEngine {
            state: self.build_state(),
            feed: Arc::new(feed),
            poll_interval: self.poll_interval,
            fetch_timeout: self.fetch_timeout,
        })
    }
}
