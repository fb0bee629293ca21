use thiserror::Error;

use crate::adapter::MalformedRecord;

#[derive(Debug, Error)]
pub enum SoilwatchError {
    #[error("Failed to fetch feed snapshot: {0}")]
    FetchFailure(String),

    #[error("Feed request to '{0}' failed: {1}")]
    FeedRequest(String, #[source] reqwest::Error),

    #[error("Poll cycle exceeded its {0:?} budget")]
    FetchTimeout(std::time::Duration),

    #[error("Feed entry {index} is malformed: {reason}")]
    MalformedRecord {
        index: usize,
        #[source]
        reason: MalformedRecord,
    },

    #[error("Slice [{start}, {end}) is out of range for a log of length {len}")]
    Range { start: usize, end: usize, len: usize },

    #[error("Session has already been stopped")]
    SessionClosed,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error for file '{0}': {1}")]
    FileIO(String, #[source] std::io::Error),

    #[error("Failed to parse YAML from '{0}': {1}")]
    YamlParsing(String, #[source] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Failed to write CSV document '{0}': {1}")]
    CsvError(String, #[source] csv::Error),

    #[error("Failed to write workbook '{0}': {1}")]
    XlsxError(String, #[source] rust_xlsxwriter::XlsxError),
}

impl SoilwatchError {
    /// Errors a poll cycle recovers from by retrying on the next tick.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SoilwatchError::FetchFailure(_)
                | SoilwatchError::FeedRequest(..)
                | SoilwatchError::FetchTimeout(_)
                | SoilwatchError::MalformedRecord { .. }
                | SoilwatchError::JsonParsing(_)
        )
    }
}
