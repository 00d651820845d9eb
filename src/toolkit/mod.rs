//! Adapter over the external planetary image-processing toolkit.
//!
//! The pipeline only talks to the toolkit through the [`Toolkit`] trait, so
//! tests can substitute canned labels and shift tables for the real
//! programs. [`IsisToolkit`] is the process-backed implementation.

use crate::register::{RegistrationConfig, ShiftSampleSet};
use crate::util::MisregResult;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

mod isis;
pub mod process;
pub mod pvl;

pub use isis::IsisToolkit;

/// Extension of single-band files produced by the band split.
pub const BAND_FILE_EXTENSION: &str = "cub";

/// Capabilities the pipeline needs from the external toolkit.
pub trait Toolkit: Sync {
    /// Band names of a mosaic in physical band order.
    fn list_bands(&self, mosaic: &Path) -> MisregResult<Vec<String>>;

    /// Raster size of a mosaic as `(samples, lines)`.
    fn raster_size(&self, mosaic: &Path) -> MisregResult<(usize, usize)>;

    /// Splits a mosaic into single-band files inside a fresh temporary directory.
    fn explode_bands(&self, mosaic: &Path) -> MisregResult<BandFiles>;

    /// Matches `source` against `target` and returns the per-tile shifts.
    fn register(
        &self,
        source: &Path,
        target: &Path,
        config: &RegistrationConfig,
    ) -> MisregResult<ShiftSampleSet>;
}

/// Program names and limits for the process-backed toolkit.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolkitConfig {
    /// Metadata query program.
    pub catlab: PathBuf,
    /// Band split program.
    pub explode: PathBuf,
    /// Template-matching registration program.
    pub coreg: PathBuf,
    /// Upper bound on a single invocation; `None` waits forever.
    pub timeout: Option<Duration>,
    /// Parent directory for temporary files; the system default when `None`.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            catlab: PathBuf::from("catlab"),
            explode: PathBuf::from("explode"),
            coreg: PathBuf::from("coreg"),
            timeout: Some(Duration::from_secs(600)),
            scratch_dir: None,
        }
    }
}

impl ToolkitConfig {
    pub(crate) fn temp_dir(&self, prefix: &str) -> std::io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);
        match &self.scratch_dir {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        }
    }
}

/// A single-band file split out of a mosaic.
#[derive(Clone, Debug, PartialEq)]
pub struct BandFile {
    pub name: String,
    pub path: PathBuf,
}

/// Single-band files of one mosaic, in band order.
///
/// Owns the temporary directory holding the files; dropping the value removes
/// them.
#[derive(Debug)]
pub struct BandFiles {
    files: Vec<BandFile>,
    _workdir: Option<TempDir>,
}

impl BandFiles {
    /// Wraps files living in `workdir`, which is deleted on drop.
    pub fn new(files: Vec<BandFile>, workdir: Option<TempDir>) -> Self {
        Self {
            files,
            _workdir: workdir,
        }
    }

    /// Files in band order.
    pub fn files(&self) -> &[BandFile] {
        &self.files
    }

    /// Path of the band named `name`, compared after trimming whitespace.
    pub fn get(&self, name: &str) -> Option<&Path> {
        let name = name.trim();
        self.files
            .iter()
            .find(|f| f.name.trim() == name)
            .map(|f| f.path.as_path())
    }

    /// Returns true when a band named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Derives the band split output paths: `<prefix>.band0001.cub`, ...
///
/// Indices are 1-based and follow the order of `names`.
pub fn band_file_paths(prefix: &Path, names: &[String]) -> Vec<BandFile> {
    let base = prefix.as_os_str().to_string_lossy();
    names
        .iter()
        .enumerate()
        .map(|(idx, name)| BandFile {
            name: name.trim().to_string(),
            path: PathBuf::from(format!(
                "{base}.band{:04}.{BAND_FILE_EXTENSION}",
                idx + 1
            )),
        })
        .collect()
}

/// File name of a mosaic cut at its first `.`, e.g. `m1` for `m1.lev1.cub`.
pub fn mosaic_stem(mosaic: &Path) -> String {
    let name = mosaic
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.split_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => name,
    }
}
