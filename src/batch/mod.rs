//! Batch measurement over a directory tree of mosaics.
//!
//! Every file whose name contains `.cub` is a candidate. Each candidate ends
//! in one of three states: measured (a report row with its statistics),
//! skipped because a requested band is missing (no row), or failed (a row
//! carrying the error). Failures are isolated to their mosaic; the batch
//! always runs to the end and closes the report with the dataset average of
//! the per-mosaic medians.

use crate::field::interpolate_shift_field;
use crate::mosaic::{compute_band_mismatch, BandMismatch};
use crate::register::{RegistrationConfig, ShiftAxis, ShiftSampleSet, ShiftSummary};
use crate::render::{render_heatmap, HeatmapOptions};
use crate::toolkit::Toolkit;
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::stats::mean;
use crate::util::{MisregError, MisregResult};
use std::path::{Path, PathBuf};

#[cfg(feature = "rayon")]
mod parallel;
pub mod report;

pub use report::{read_report, ReportRow, ReportWriter, AVERAGE_LABEL, REPORT_HEADER};

/// Substring that marks a file as a mosaic candidate.
pub const MOSAIC_MARKER: &str = ".cub";

/// Settings for one batch run.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchConfig {
    /// Band that is translated onto the target.
    pub source_band: String,
    /// Band the source is registered to.
    pub target_band: String,
    pub registration: RegistrationConfig,
    /// Write x/y shift heat maps next to each measured mosaic.
    pub visualize: bool,
    pub heatmap: HeatmapOptions,
    /// Mosaics measured concurrently; values above 1 need the `rayon` feature.
    pub jobs: usize,
    /// Directory for per-mosaic raw shift tables, if wanted.
    pub samples_dir: Option<PathBuf>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            source_band: "RED".to_string(),
            target_band: "NIR".to_string(),
            registration: RegistrationConfig::default(),
            visualize: false,
            heatmap: HeatmapOptions::with_range(-10.0, 10.0),
            jobs: 1,
            samples_dir: None,
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> MisregResult<()> {
        if self.source_band.trim().is_empty() || self.target_band.trim().is_empty() {
            return Err(MisregError::InvalidInput("band names must not be empty"));
        }
        if self.jobs == 0 {
            return Err(MisregError::InvalidInput("jobs must be at least 1"));
        }
        self.registration.validate()
    }
}

/// Statistics of a measured mosaic.
#[derive(Clone, Debug, PartialEq)]
pub struct MosaicShifts {
    pub samples: ShiftSampleSet,
    /// `None` when no tile matched.
    pub x: Option<ShiftSummary>,
    pub y: Option<ShiftSummary>,
    /// Non-fatal problems, e.g. a heat map that could not be written.
    pub warnings: Vec<String>,
}

/// Final state of one candidate file.
#[derive(Clone, Debug, PartialEq)]
pub enum MosaicOutcome {
    Measured(MosaicShifts),
    Skipped { missing_band: String },
    Failed(MisregError),
}

/// Outcome of one mosaic together with its report name.
#[derive(Clone, Debug, PartialEq)]
pub struct MosaicResult {
    pub path: PathBuf,
    /// Path relative to the input root, as written to the report.
    pub name: String,
    pub outcome: MosaicOutcome,
}

/// Everything a batch run produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchSummary {
    pub results: Vec<MosaicResult>,
    /// Mean of the per-mosaic median x shifts.
    pub mean_x_shift: Option<f64>,
    /// Mean of the per-mosaic median y shifts.
    pub mean_y_shift: Option<f64>,
}

impl BatchSummary {
    pub fn measured(&self) -> usize {
        self.count(|o| matches!(o, MosaicOutcome::Measured(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, MosaicOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, MosaicOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&MosaicOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Recursively lists mosaic candidates under `root`, sorted by path.
pub fn discover_mosaics(root: &Path) -> MisregResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_mosaics(root, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_mosaics(dir: &Path, files: &mut Vec<PathBuf>) -> MisregResult<()> {
    let entries = std::fs::read_dir(dir)
        .map_err(|err| MisregError::io(format!("read directory {}", dir.display()), err))?;
    for entry in entries {
        let entry = entry.map_err(|err| MisregError::io("read directory entry", err))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|err| MisregError::io(format!("inspect {}", path.display()), err))?;
        // Linked directories are not descended into; linked files still count.
        if file_type.is_dir() {
            collect_mosaics(&path, files)?;
        } else if is_mosaic_candidate(&path)
            && (file_type.is_file() || (file_type.is_symlink() && path.is_file()))
        {
            files.push(path);
        }
    }
    Ok(())
}

/// Returns true when the file name contains `.cub`.
pub fn is_mosaic_candidate(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().contains(MOSAIC_MARKER))
}

/// Heat-map path for `axis` next to `mosaic`: `m1.cub` -> `m1_x_shift.png`.
///
/// The name is cut at the first `.cub`, so outputs never look like candidates.
pub fn heatmap_path(mosaic: &Path, axis: ShiftAxis) -> PathBuf {
    mosaic.with_file_name(format!("{}_{}.png", output_stem(mosaic), axis.label()))
}

/// Measures every mosaic under `input` and writes the report to `output`.
pub fn run_batch<T: Toolkit + ?Sized>(
    toolkit: &T,
    input: &Path,
    output: &Path,
    config: &BatchConfig,
) -> MisregResult<BatchSummary> {
    config.validate()?;
    if !input.is_dir() {
        return Err(MisregError::InvalidInput("input folder does not exist"));
    }
    if let Some(dir) = &config.samples_dir {
        std::fs::create_dir_all(dir)
            .map_err(|err| MisregError::io(format!("create {}", dir.display()), err))?;
    }

    let _span = trace_span!("batch").entered();
    let mosaics = discover_mosaics(input)?;
    trace_event!("discovered", mosaics = mosaics.len());

    let mut writer = ReportWriter::create(output)?;
    let mut summary = BatchSummary::default();
    let mut x_medians = Vec::new();
    let mut y_medians = Vec::new();

    let chunk_len = effective_jobs(config.jobs);
    for chunk in mosaics.chunks(chunk_len) {
        for result in process_chunk(toolkit, input, chunk, config) {
            record(&mut writer, &result, &mut x_medians, &mut y_medians)?;
            summary.results.push(result);
        }
    }

    summary.mean_x_shift = mean(&x_medians);
    summary.mean_y_shift = mean(&y_medians);
    writer.write_row(&ReportRow::average(summary.mean_x_shift, summary.mean_y_shift))?;
    trace_event!(
        "batch_done",
        measured = summary.measured(),
        skipped = summary.skipped(),
        failed = summary.failed()
    );
    Ok(summary)
}

#[cfg(feature = "rayon")]
fn effective_jobs(jobs: usize) -> usize {
    jobs.max(1)
}

#[cfg(not(feature = "rayon"))]
fn effective_jobs(jobs: usize) -> usize {
    if jobs > 1 {
        trace_warn!("jobs_ignored", requested = jobs, reason = "built without `rayon`");
    }
    1
}

fn process_chunk<T: Toolkit + ?Sized>(
    toolkit: &T,
    root: &Path,
    chunk: &[PathBuf],
    config: &BatchConfig,
) -> Vec<MosaicResult> {
    #[cfg(feature = "rayon")]
    if chunk.len() > 1 {
        return parallel::process_chunk_par(toolkit, root, chunk, config);
    }
    chunk
        .iter()
        .map(|path| process_mosaic(toolkit, root, path, config))
        .collect()
}

fn record(
    writer: &mut ReportWriter,
    result: &MosaicResult,
    x_medians: &mut Vec<f64>,
    y_medians: &mut Vec<f64>,
) -> MisregResult<()> {
    match &result.outcome {
        MosaicOutcome::Measured(shifts) => {
            if let (Some(x), Some(y)) = (shifts.x, shifts.y) {
                x_medians.push(x.median);
                y_medians.push(y.median);
            }
            writer.write_row(&ReportRow {
                filename: result.name.clone(),
                x_shift: shifts.x.map(|s| s.median),
                y_shift: shifts.y.map(|s| s.median),
                x_shift_mad: shifts.x.map(|s| s.mad),
                y_shift_mad: shifts.y.map(|s| s.mad),
                tiles: Some(shifts.samples.len()),
                error: None,
            })
        }
        MosaicOutcome::Failed(err) => {
            writer.write_row(&ReportRow::failed(result.name.clone(), err))
        }
        MosaicOutcome::Skipped { .. } => Ok(()),
    }
}

/// Measures one mosaic; never fails, errors become [`MosaicOutcome::Failed`].
pub fn process_mosaic<T: Toolkit + ?Sized>(
    toolkit: &T,
    root: &Path,
    path: &Path,
    config: &BatchConfig,
) -> MosaicResult {
    let name = report_name(root, path);
    let outcome = match measure(toolkit, path, config) {
        Ok(outcome) => outcome,
        Err(err) => {
            trace_warn!("mosaic_failed", file = name, error = err);
            MosaicOutcome::Failed(err)
        }
    };
    if let MosaicOutcome::Skipped { missing_band } = &outcome {
        trace_event!("mosaic_skipped", file = name, missing_band = missing_band);
    }
    MosaicResult {
        path: path.to_path_buf(),
        name,
        outcome,
    }
}

fn measure<T: Toolkit + ?Sized>(
    toolkit: &T,
    path: &Path,
    config: &BatchConfig,
) -> MisregResult<MosaicOutcome> {
    let samples = match compute_band_mismatch(
        toolkit,
        path,
        &config.source_band,
        &config.target_band,
        &config.registration,
    )? {
        BandMismatch::Measured(samples) => samples,
        BandMismatch::NotApplicable { missing } => {
            return Ok(MosaicOutcome::Skipped {
                missing_band: missing,
            })
        }
    };

    let mut warnings = Vec::new();
    if config.visualize {
        if let Err(err) = visualize(toolkit, path, &samples, &config.heatmap) {
            trace_warn!("heatmap_failed", file = path.display(), error = err);
            warnings.push(format!("heat map: {err}"));
        }
    }
    if let Some(dir) = &config.samples_dir {
        let target = dir.join(format!("{}_shifts.csv", output_stem(path)));
        if let Err(err) = report::write_samples(&target, &samples) {
            trace_warn!("samples_export_failed", file = path.display(), error = err);
            warnings.push(format!("sample export: {err}"));
        }
    }

    Ok(MosaicOutcome::Measured(MosaicShifts {
        x: samples.summary(ShiftAxis::X),
        y: samples.summary(ShiftAxis::Y),
        samples,
        warnings,
    }))
}

fn visualize<T: Toolkit + ?Sized>(
    toolkit: &T,
    path: &Path,
    samples: &ShiftSampleSet,
    options: &HeatmapOptions,
) -> MisregResult<()> {
    let (raster_samples, raster_lines) = toolkit.raster_size(path)?;
    for axis in [ShiftAxis::X, ShiftAxis::Y] {
        let field = interpolate_shift_field(samples, axis, raster_samples, raster_lines)?;
        render_heatmap(&field, &heatmap_path(path, axis), options)?;
    }
    Ok(())
}

fn report_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// File name of `path` up to its first `.cub`.
fn output_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.find(MOSAIC_MARKER) {
        Some(idx) => name[..idx].to_string(),
        None => name,
    }
}
