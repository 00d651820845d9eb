//! Reader for the comma-delimited shift table written by the matcher.
//!
//! Layout: one header row, then one row per matched tile with the columns
//! `sample, line, translated sample, translated line, sample shift,
//! line shift, goodness of fit`. Only columns 0, 1, 4 and 5 are used.

use crate::register::{ShiftSample, ShiftSampleSet};
use crate::util::{MisregError, MisregResult};
use std::path::Path;

const MIN_COLUMNS: usize = 6;

/// Parses the text of a results table.
pub fn parse_results_table(text: &str) -> MisregResult<ShiftSampleSet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let header = reader.headers().map_err(|err| malformed(&err))?;
    if header.iter().all(str::is_empty) {
        return Err(MisregError::MalformedResults {
            line: 1,
            reason: "results table is empty, header row missing".to_string(),
        });
    }

    let mut samples = ShiftSampleSet::empty();
    for record in reader.records() {
        let record = record.map_err(|err| malformed(&err))?;
        let line = record.position().map_or(0, |pos| pos.line() as usize);
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() < MIN_COLUMNS {
            return Err(MisregError::MalformedResults {
                line,
                reason: format!(
                    "expected at least {MIN_COLUMNS} columns, found {}",
                    record.len()
                ),
            });
        }
        let number = |col: usize| -> MisregResult<f64> {
            let field = record.get(col).unwrap_or("");
            field.parse::<f64>().map_err(|_| MisregError::MalformedResults {
                line,
                reason: format!("column {} is not a number: `{field}`", col + 1),
            })
        };
        samples.push(ShiftSample {
            x: number(0)?,
            y: number(1)?,
            dx: number(4)?,
            dy: number(5)?,
        });
    }
    Ok(samples)
}

fn malformed(err: &csv::Error) -> MisregError {
    MisregError::MalformedResults {
        line: err.position().map_or(0, |pos| pos.line() as usize),
        reason: err.to_string(),
    }
}

/// Reads and parses a results table from disk.
pub fn read_results_table(path: &Path) -> MisregResult<ShiftSampleSet> {
    let text = std::fs::read_to_string(path).map_err(|err| MisregError::Registration {
        reason: format!("results table {} unreadable: {err}", path.display()),
    })?;
    parse_results_table(&text)
}
