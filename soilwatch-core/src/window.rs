//! Paged windows over the log for charting.
//!
//! The navigator holds a single `offset`: the number of pages back from the most recent
//! one. Offset 0 always shows the newest page, even as the log grows under it.

use crate::{
    error::SoilwatchError,
    ingestion_log::IngestionLog,
    views::{DerivedViews, TimeFormat},
};
use soilwatch_schemas::reading::MetricGroup;
use std::ops::Range;

/// Records per chart page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowNavigator {
    offset: usize,
    page_size: usize,
}

impl Default for WindowNavigator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl WindowNavigator {
    /// A page size of zero is treated as one.
    pub fn new(page_size: usize) -> Self {
        Self {
            offset: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Largest reachable offset for a series of `len` points: `ceil(len / page) - 1`, floored at 0.
    pub fn max_offset(&self, len: usize) -> usize {
        len.div_ceil(self.page_size).saturating_sub(1)
    }

    /// Index range of the current window within a series of `len` points.
    pub fn range(&self, len: usize) -> Range<usize> {
        let back = self.page_size.saturating_add(self.offset.saturating_mul(self.page_size));
        let start = len.saturating_sub(back);
        let end = (start + self.page_size).min(len);
        start..end
    }

    /// Steps one page into history ("previous"). Returns whether the offset moved.
    pub fn older(&mut self, len: usize) -> bool {
        if self.offset < self.max_offset(len) {
            self.offset += 1;
            true
        } else {
            false
        }
    }

    /// Steps one page toward the present ("next"). Returns whether the offset moved.
    pub fn newer(&mut self) -> bool {
        if self.offset > 0 {
            self.offset -= 1;
            true
        } else {
            false
        }
    }

    pub fn can_go_older(&self, len: usize) -> bool {
        self.offset < self.max_offset(len)
    }

    pub fn can_go_newer(&self) -> bool {
        self.offset > 0
    }

    /// Time-of-day X-axis labels, one per record of the window, in window order.
    pub fn labels(&self, log: &IngestionLog, format: &TimeFormat) -> Result<Vec<String>, SoilwatchError> {
        let range = self.range(log.len());
        Ok(log
            .slice(range.start, range.end)?
            .iter()
            .map(|record| format.time(&record.timestamp))
            .collect())
    }

    /// Assembles the chart of one panel for the current window.
    pub fn chart(
        &self,
        log: &IngestionLog,
        views: &DerivedViews,
        group: MetricGroup,
        format: &TimeFormat,
    ) -> Result<ChartData, SoilwatchError> {
        let range = self.range(log.len());
        let labels = self.labels(log, format)?;
        let datasets = group
            .metrics()
            .into_iter()
            .enumerate()
            .map(|(i, metric)| {
                let series = views.series(metric);
                let data = series
                    .get(range.clone())
                    .ok_or(SoilwatchError::Range {
                        start: range.start,
                        end: range.end,
                        len: series.len(),
                    })?
                    .to_vec();
                let label = if group.is_multi_channel() {
                    format!("{} Sensor {}", group.label_prefix(), i + 1)
                } else {
                    format!("{} Sensor", group.label_prefix())
                };
                Ok(Dataset { label, data })
            })
            .collect::<Result<Vec<_>, SoilwatchError>>()?;

        Ok(ChartData {
            group,
            range,
            labels,
            datasets,
        })
    }
}

/// One line of a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
}

/// Everything a renderer needs to draw one panel's chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub group: MetricGroup,
    /// Log indices covered by this chart.
    pub range: Range<usize>,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Min and max across every dataset, or `None` for an empty chart.
    pub fn value_bounds(&self) -> Option<(f64, f64)> {
        self.datasets
            .iter()
            .flat_map(|d| d.data.iter().copied())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}
