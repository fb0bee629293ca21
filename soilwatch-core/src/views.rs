//! Per-metric projections over the ingestion log: chart series and table rows.

use crate::ingestion_log::IngestionLog;
use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use soilwatch_schemas::reading::{Metric, MetricGroup, SensorRecord};

/// Rows shown per table when nothing else is configured.
pub const DEFAULT_TABLE_ROWS: usize = 10;

/// Renders timestamps the way the dashboard displays them (`5/1/2024`, `8:05:00 AM`).
///
/// Without a fixed offset every timestamp is converted through the host time zone, so
/// daylight-saving changes during a session are honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFormat {
    offset: Option<FixedOffset>,
}

impl TimeFormat {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset: Some(offset) }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    /// Follows the host time zone, one timestamp at a time.
    pub fn local() -> Self {
        Self { offset: None }
    }

    /// `None` follows the host time zone; out-of-range minutes fall back to UTC.
    pub fn from_offset_minutes(minutes: Option<i32>) -> Self {
        match minutes {
            Some(m) => m
                .checked_mul(60)
                .and_then(FixedOffset::east_opt)
                .map_or_else(Self::utc, Self::new),
            None => Self::local(),
        }
    }

    pub fn date(&self, timestamp: &DateTime<Utc>) -> String {
        self.render(timestamp, "%-m/%-d/%Y")
    }

    pub fn time(&self, timestamp: &DateTime<Utc>) -> String {
        self.render(timestamp, "%-I:%M:%S %p")
    }

    fn render(&self, timestamp: &DateTime<Utc>, pattern: &str) -> String {
        match self.offset {
            Some(offset) => timestamp.with_timezone(&offset).format(pattern).to_string(),
            None => timestamp.with_timezone(&Local).format(pattern).to_string(),
        }
    }
}

impl Default for TimeFormat {
    fn default() -> Self {
        Self::local()
    }
}

/// Projects one metric across the whole log. `series[i]` always derives from `log[i]`.
pub fn series(log: &IngestionLog, metric: Metric) -> Vec<f64> {
    log.iter().map(|record| record.value(metric)).collect()
}

/// The last `min(n, len)` elements, oldest first.
pub fn latest_slice<T>(series: &[T], n: usize) -> &[T] {
    &series[series.len().saturating_sub(n)..]
}

/// One table line: the group's channel values plus date and time of the same record.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// Position of the source record in the ingestion log.
    pub index: usize,
    pub values: Vec<f64>,
    pub date: String,
    pub time: String,
}

/// Builds the rolling table of a panel from the last `n` records.
pub fn table(log: &IngestionLog, group: MetricGroup, n: usize, format: &TimeFormat) -> Vec<TableRow> {
    let records = latest_slice(log.records(), n);
    let first = log.len() - records.len();
    let metrics = group.metrics();
    records
        .iter()
        .enumerate()
        .map(|(offset, record)| table_row(first + offset, record, &metrics, format))
        .collect()
}

fn table_row(index: usize, record: &SensorRecord, metrics: &[Metric], format: &TimeFormat) -> TableRow {
    TableRow {
        index,
        values: metrics.iter().map(|&m| record.value(m)).collect(),
        date: format.date(&record.timestamp),
        time: format.time(&record.timestamp),
    }
}

/// Incrementally maintained series for all eight metrics, index-aligned with the log.
#[derive(Debug, Clone, Default)]
pub struct DerivedViews {
    series: [Vec<f64>; 8],
}

impl DerivedViews {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extends every series by one point. Called exactly once per appended record.
    pub fn absorb(&mut self, record: &SensorRecord) {
        for metric in Metric::ALL {
            self.series[metric.index()].push(record.value(metric));
        }
    }

    pub fn series(&self, metric: Metric) -> &[f64] {
        &self.series[metric.index()]
    }

    pub fn len(&self) -> usize {
        self.series[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
