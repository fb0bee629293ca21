use crate::{
    error::SoilwatchError,
    export,
    ingestor::{CycleOutcome, IngestStats, Ingestor},
    ingestion_log::IngestionLog,
    views::{self, DerivedViews, TableRow, TimeFormat},
    window::{ChartData, WindowNavigator},
};
use soilwatch_schemas::{feed::RawFeedEntry, reading::MetricGroup};
use std::{
    ops::Range,
    path::{Path, PathBuf},
};

/// Which panels currently show their chart. All charts start hidden.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChartVisibility {
    soil_moisture: bool,
    gas: bool,
    temperature: bool,
    humidity: bool,
}

impl ChartVisibility {
    pub fn is_visible(&self, group: MetricGroup) -> bool {
        match group {
            MetricGroup::SoilMoisture => self.soil_moisture,
            MetricGroup::Gas => self.gas,
            MetricGroup::Temperature => self.temperature,
            MetricGroup::Humidity => self.humidity,
        }
    }

    /// Flips a panel's chart and returns its new visibility.
    pub fn toggle(&mut self, group: MetricGroup) -> bool {
        let flag = match group {
            MetricGroup::SoilMoisture => &mut self.soil_moisture,
            MetricGroup::Gas => &mut self.gas,
            MetricGroup::Temperature => &mut self.temperature,
            MetricGroup::Humidity => &mut self.humidity,
        };
        *flag = !*flag;
        *flag
    }

    pub fn visible_groups(&self) -> Vec<MetricGroup> {
        MetricGroup::ALL
            .into_iter()
            .filter(|&g| self.is_visible(g))
            .collect()
    }
}

/// A point-in-time summary of the session for status lines and reports.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub log_len: usize,
    pub next_unprocessed: usize,
    pub window_offset: usize,
    pub window_range: Range<usize>,
    pub can_go_older: bool,
    pub can_go_newer: bool,
    pub visibility: ChartVisibility,
    pub stats: IngestStats,
}

/// All mutable state of one dashboard session.
///
/// The log is only written through `ingest`; the window offset only through `older` and
/// `newer`. Everything else reads.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub(crate) ingestor: Ingestor,
    pub(crate) window: WindowNavigator,
    pub(crate) visibility: ChartVisibility,
    pub(crate) format: TimeFormat,
    pub(crate) table_rows: usize,
}

impl SessionState {
    pub fn ingest(&mut self, snapshot: &[RawFeedEntry]) -> Result<CycleOutcome, SoilwatchError> {
        self.ingestor.absorb_snapshot(snapshot)
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    pub fn log(&self) -> &IngestionLog {
        self.ingestor.log()
    }

    pub fn views(&self) -> &DerivedViews {
        self.ingestor.views()
    }

    pub fn window(&self) -> &WindowNavigator {
        &self.window
    }

    pub fn time_format(&self) -> &TimeFormat {
        &self.format
    }

    pub fn older(&mut self) -> bool {
        let len = self.log().len();
        self.window.older(len)
    }

    pub fn newer(&mut self) -> bool {
        self.window.newer()
    }

    pub fn toggle_chart(&mut self, group: MetricGroup) -> bool {
        self.visibility.toggle(group)
    }

    pub fn visibility(&self) -> ChartVisibility {
        self.visibility
    }

    /// The rolling table of a panel.
    pub fn table(&self, group: MetricGroup) -> Vec<TableRow> {
        views::table(self.log(), group, self.table_rows, &self.format)
    }

    pub fn chart(&self, group: MetricGroup) -> Result<ChartData, SoilwatchError> {
        self.window.chart(self.log(), self.views(), group, &self.format)
    }

    /// Charts of every panel whose chart is toggled on.
    pub fn visible_charts(&self) -> Result<Vec<ChartData>, SoilwatchError> {
        self.visibility
            .visible_groups()
            .into_iter()
            .map(|g| self.chart(g))
            .collect()
    }

    /// Writes the whole log, not just the visible window.
    pub fn export(&self, dir: &Path, file_name: &str) -> Result<(PathBuf, usize), SoilwatchError> {
        export::export_to_dir(self.log(), dir, file_name, self.format)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let len = self.log().len();
        SessionSnapshot {
            log_len: len,
            next_unprocessed: self.ingestor.next_unprocessed(),
            window_offset: self.window.offset(),
            window_range: self.window.range(len),
            can_go_older: self.window.can_go_older(len),
            can_go_newer: self.window.can_go_newer(),
            visibility: self.visibility,
            stats: self.ingestor.stats(),
        }
    }
}
