//! Row-per-mosaic CSV report.
//!
//! Each processed mosaic contributes its median shifts, their median absolute
//! deviations and the number of matched tiles. Failed mosaics keep a row with
//! empty statistics and the error text. The last row is labelled `average`
//! and holds the mean of the per-mosaic medians (`NaN` without any).
//! Rows are flushed as they are written so an interrupted run leaves a
//! readable prefix behind.

use crate::register::ShiftSampleSet;
use crate::util::{MisregError, MisregResult};
use std::fs::File;
use std::path::Path;

/// Column names of the report.
pub const REPORT_HEADER: [&str; 7] = [
    "filename",
    "x_shift",
    "y_shift",
    "x_shift_mad",
    "y_shift_mad",
    "tiles",
    "error",
];

/// Label of the trailing dataset row.
pub const AVERAGE_LABEL: &str = "average";

/// One report row; statistics are `None` where the cell is empty.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReportRow {
    pub filename: String,
    pub x_shift: Option<f64>,
    pub y_shift: Option<f64>,
    pub x_shift_mad: Option<f64>,
    pub y_shift_mad: Option<f64>,
    pub tiles: Option<usize>,
    pub error: Option<String>,
}

impl ReportRow {
    /// Trailing row with dataset means; missing means are written as `NaN`.
    pub fn average(x: Option<f64>, y: Option<f64>) -> Self {
        Self {
            filename: AVERAGE_LABEL.to_string(),
            x_shift: Some(x.unwrap_or(f64::NAN)),
            y_shift: Some(y.unwrap_or(f64::NAN)),
            ..Self::default()
        }
    }

    /// Row for a mosaic that could not be measured.
    pub fn failed(filename: impl Into<String>, error: &MisregError) -> Self {
        Self {
            filename: filename.into(),
            error: Some(error.to_string()),
            ..Self::default()
        }
    }

    fn to_record(&self) -> [String; 7] {
        [
            self.filename.clone(),
            number(self.x_shift),
            number(self.y_shift),
            number(self.x_shift_mad),
            number(self.y_shift_mad),
            self.tiles.map(|t| t.to_string()).unwrap_or_default(),
            self.error.clone().unwrap_or_default(),
        ]
    }
}

fn number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Append-only writer for the report.
pub struct ReportWriter {
    inner: csv::Writer<File>,
    rows: usize,
}

impl ReportWriter {
    /// Creates (or truncates) the report at `path` and writes the header.
    pub fn create(path: &Path) -> MisregResult<Self> {
        let file = File::create(path)
            .map_err(|err| MisregError::io(format!("create report {}", path.display()), err))?;
        let mut inner = csv::Writer::from_writer(file);
        inner.write_record(REPORT_HEADER)?;
        inner
            .flush()
            .map_err(|err| MisregError::io("flush report", err))?;
        Ok(Self { inner, rows: 0 })
    }

    /// Appends one row and flushes it to disk.
    pub fn write_row(&mut self, row: &ReportRow) -> MisregResult<()> {
        self.inner.write_record(row.to_record())?;
        self.inner
            .flush()
            .map_err(|err| MisregError::io("flush report", err))?;
        self.rows += 1;
        Ok(())
    }

    /// Number of rows written after the header.
    pub fn rows(&self) -> usize {
        self.rows
    }
}

/// Reads a report written by [`ReportWriter`].
pub fn read_report(path: &Path) -> MisregResult<Vec<ReportRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    if headers.iter().ne(REPORT_HEADER.iter().copied()) {
        return Err(MisregError::Report {
            reason: format!(
                "unexpected header `{}`",
                headers.iter().collect::<Vec<_>>().join(",")
            ),
        });
    }
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |idx: usize| record.get(idx).unwrap_or("").trim();
        let parse_f64 = |idx: usize| -> MisregResult<Option<f64>> {
            let text = field(idx);
            if text.is_empty() {
                return Ok(None);
            }
            text.parse::<f64>().map(Some).map_err(|_| MisregError::Report {
                reason: format!("`{text}` in column {} is not a number", REPORT_HEADER[idx]),
            })
        };
        let tiles = match field(5) {
            "" => None,
            text => Some(text.parse::<usize>().map_err(|_| MisregError::Report {
                reason: format!("`{text}` is not a tile count"),
            })?),
        };
        rows.push(ReportRow {
            filename: field(0).to_string(),
            x_shift: parse_f64(1)?,
            y_shift: parse_f64(2)?,
            x_shift_mad: parse_f64(3)?,
            y_shift_mad: parse_f64(4)?,
            tiles,
            error: Some(field(6).to_string()).filter(|e| !e.is_empty()),
        });
    }
    Ok(rows)
}

/// Writes the raw per-tile shifts of one mosaic as `x,y,x_shift,y_shift`.
pub fn write_samples(path: &Path, samples: &ShiftSampleSet) -> MisregResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["x", "y", "x_shift", "y_shift"])?;
    for s in samples.iter() {
        writer.write_record([
            s.x.to_string(),
            s.y.to_string(),
            s.dx.to_string(),
            s.dy.to_string(),
        ])?;
    }
    writer
        .flush()
        .map_err(|err| MisregError::io("flush sample export", err))?;
    Ok(())
}
