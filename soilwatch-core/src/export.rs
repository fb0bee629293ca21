use crate::{error::SoilwatchError, ingestion_log::IngestionLog, views::TimeFormat};
use csv::Writer;
use rust_xlsxwriter::{Workbook, XlsxError};
use soilwatch_schemas::reading::{Metric, SensorRecord};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name the dashboard's export button produces.
pub const DEFAULT_EXPORT_FILE: &str = "sensor_data.xlsx";
pub const WORKSHEET_NAME: &str = "Sensor Data";

/// Document type of an export, picked from the target file's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Csv,
}

impl ExportFormat {
    /// `.csv` selects CSV; anything else gets a workbook.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ExportFormat::Csv,
            _ => ExportFormat::Xlsx,
        }
    }
}

/// Header row: every metric column, then date and time.
pub fn header() -> Vec<String> {
    Metric::ALL
        .iter()
        .map(|m| m.column_name())
        .chain(["Date".to_string(), "Time".to_string()])
        .collect()
}

fn row(record: &SensorRecord, format: &TimeFormat) -> Vec<String> {
    Metric::ALL
        .iter()
        .map(|&m| record.value(m).to_string())
        .chain([format.date(&record.timestamp), format.time(&record.timestamp)])
        .collect()
}

/// Writes the full ingestion log as one flat table.
pub struct SensorExporter<W: Write> {
    writer: Writer<W>,
    format: TimeFormat,
    label: String,
}

impl SensorExporter<fs::File> {
    pub fn create(path: &Path, format: TimeFormat) -> Result<Self, SoilwatchError> {
        let label = path.display().to_string();
        let writer = Writer::from_path(path).map_err(|e| SoilwatchError::CsvError(label.clone(), e))?;
        Ok(Self { writer, format, label })
    }
}

impl<W: Write> SensorExporter<W> {
    pub fn new(inner: W, format: TimeFormat) -> Self {
        Self {
            writer: Writer::from_writer(inner),
            format,
            label: "<writer>".to_string(),
        }
    }

    /// Emits the header and one row per record in log order. Returns the number of data rows.
    pub fn write_log(&mut self, log: &IngestionLog) -> Result<usize, SoilwatchError> {
        self.writer.write_record(header()).map_err(|e| self.csv_error(e))?;
        for record in log.iter() {
            let fields = row(record, &self.format);
            self.writer.write_record(&fields).map_err(|e| self.csv_error(e))?;
        }
        self.writer
            .flush()
            .map_err(|e| SoilwatchError::FileIO(self.label.clone(), e))?;
        Ok(log.len())
    }

    pub fn into_inner(self) -> Result<W, SoilwatchError> {
        let label = self.label;
        self.writer
            .into_inner()
            .map_err(|e| {
                let io = std::io::Error::new(e.error().kind(), e.error().to_string());
                SoilwatchError::FileIO(label, io)
            })
    }

    fn csv_error(&self, error: csv::Error) -> SoilwatchError {
        SoilwatchError::CsvError(self.label.clone(), error)
    }
}

/// Builds a one-sheet workbook: the header row, then one row per record in log order.
///
/// Metric values are stored as numbers; date and time as display strings.
pub fn workbook(log: &IngestionLog, format: &TimeFormat) -> Result<Workbook, SoilwatchError> {
    let xlsx_error = |e| SoilwatchError::XlsxError(WORKSHEET_NAME.to_string(), e);
    let mut book = Workbook::new();
    let sheet = book.add_worksheet();
    sheet.set_name(WORKSHEET_NAME).map_err(xlsx_error)?;

    for (col, name) in header().iter().enumerate() {
        sheet.write_string(0, col as u16, name.as_str()).map_err(xlsx_error)?;
    }
    let date_col = Metric::ALL.len() as u16;
    for (i, record) in log.iter().enumerate() {
        let row = u32::try_from(i + 1).map_err(|_| xlsx_error(XlsxError::RowColumnLimitError))?;
        for (col, metric) in Metric::ALL.iter().enumerate() {
            sheet
                .write_number(row, col as u16, record.value(*metric))
                .map_err(xlsx_error)?;
        }
        sheet
            .write_string(row, date_col, format.date(&record.timestamp).as_str())
            .map_err(xlsx_error)?;
        sheet
            .write_string(row, date_col + 1, format.time(&record.timestamp).as_str())
            .map_err(xlsx_error)?;
    }
    Ok(book)
}

/// Creates `dir` if needed and writes the log to `dir/file_name` as xlsx or CSV.
pub fn export_to_dir(
    log: &IngestionLog,
    dir: &Path,
    file_name: &str,
    format: TimeFormat,
) -> Result<(PathBuf, usize), SoilwatchError> {
    fs::create_dir_all(dir).map_err(|e| SoilwatchError::FileIO(dir.display().to_string(), e))?;
    let path = dir.join(file_name);
    let rows = match ExportFormat::from_path(&path) {
        ExportFormat::Csv => SensorExporter::create(&path, format)?.write_log(log)?,
        ExportFormat::Xlsx => {
            workbook(log, &format)?
                .save(&path)
                .map_err(|e| SoilwatchError::XlsxError(path.display().to_string(), e))?;
            log.len()
        }
    };
    Ok((path, rows))
}
