//! Co-registration of two single-band files.
//!
//! The toolkit performs the actual template matching; this module owns its
//! tuning parameters, the parameter-file syntax it expects, and the table of
//! per-tile shifts it produces.

use crate::util::stats::{median, median_abs_deviation};
use crate::util::{MisregError, MisregResult};

mod deffile;
mod results;

pub use deffile::{algorithm_definition, write_algorithm_definition};
pub use results::{parse_results_table, read_results_table};

/// Tuning of the maximum-correlation template matcher.
#[derive(Clone, Debug, PartialEq)]
pub struct RegistrationConfig {
    /// Matching algorithm understood by the toolkit.
    pub algorithm: String,
    /// Correlation tolerance below which a tile is rejected.
    pub tolerance: f64,
    /// Pattern chip size in samples.
    pub pattern_samples: usize,
    /// Pattern chip size in lines.
    pub pattern_lines: usize,
    /// Minimum z-score of the pattern chip.
    pub minimum_z_score: f64,
    /// Search chip size in samples.
    pub search_samples: usize,
    /// Search chip size in lines.
    pub search_lines: usize,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            algorithm: "MaximumCorrelation".to_string(),
            tolerance: 0.1,
            pattern_samples: 30,
            pattern_lines: 30,
            minimum_z_score: 1e-5,
            search_samples: 50,
            search_lines: 50,
        }
    }
}

impl RegistrationConfig {
    /// Checks that the chip geometry is usable.
    pub fn validate(&self) -> MisregResult<()> {
        if self.algorithm.trim().is_empty() {
            return Err(MisregError::InvalidInput("algorithm name is empty"));
        }
        if self.pattern_samples == 0 || self.pattern_lines == 0 {
            return Err(MisregError::InvalidInput("pattern chip must be non-empty"));
        }
        if self.search_samples < self.pattern_samples || self.search_lines < self.pattern_lines {
            return Err(MisregError::InvalidInput(
                "search chip must be at least as large as the pattern chip",
            ));
        }
        if !self.tolerance.is_finite() || !self.minimum_z_score.is_finite() {
            return Err(MisregError::InvalidInput("thresholds must be finite"));
        }
        Ok(())
    }
}

/// Shift component selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftAxis {
    X,
    Y,
}

impl ShiftAxis {
    /// Suffix used for per-axis output names.
    pub fn label(self) -> &'static str {
        match self {
            ShiftAxis::X => "x_shift",
            ShiftAxis::Y => "y_shift",
        }
    }
}

/// One matched tile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShiftSample {
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
}

/// Robust location and spread of one shift component.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShiftSummary {
    pub median: f64,
    /// Median absolute deviation from the median.
    pub mad: f64,
}

/// Per-tile shifts as four parallel sequences of equal length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShiftSampleSet {
    x: Vec<f64>,
    y: Vec<f64>,
    dx: Vec<f64>,
    dy: Vec<f64>,
}

impl ShiftSampleSet {
    /// Builds a set from parallel sequences, rejecting unequal lengths.
    pub fn new(x: Vec<f64>, y: Vec<f64>, dx: Vec<f64>, dy: Vec<f64>) -> MisregResult<Self> {
        let n = x.len();
        if y.len() != n || dx.len() != n || dy.len() != n {
            return Err(MisregError::InvalidInput(
                "shift sequences must have equal length",
            ));
        }
        Ok(Self { x, y, dx, dy })
    }

    /// An empty set (no tile matched).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Appends one tile.
    pub fn push(&mut self, sample: ShiftSample) {
        self.x.push(sample.x);
        self.y.push(sample.y);
        self.dx.push(sample.dx);
        self.dy.push(sample.dy);
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn x_positions(&self) -> &[f64] {
        &self.x
    }

    pub fn y_positions(&self) -> &[f64] {
        &self.y
    }

    pub fn x_shifts(&self) -> &[f64] {
        &self.dx
    }

    pub fn y_shifts(&self) -> &[f64] {
        &self.dy
    }

    /// Shift component along `axis`.
    pub fn shifts(&self, axis: ShiftAxis) -> &[f64] {
        match axis {
            ShiftAxis::X => &self.dx,
            ShiftAxis::Y => &self.dy,
        }
    }

    /// Iterates over tiles in table order.
    pub fn iter(&self) -> impl Iterator<Item = ShiftSample> + '_ {
        (0..self.len()).map(move |i| ShiftSample {
            x: self.x[i],
            y: self.y[i],
            dx: self.dx[i],
            dy: self.dy[i],
        })
    }

    /// Median and spread of one component; `None` when no tile matched.
    pub fn summary(&self, axis: ShiftAxis) -> Option<ShiftSummary> {
        let values = self.shifts(axis);
        Some(ShiftSummary {
            median: median(values)?,
            mad: median_abs_deviation(values)?,
        })
    }
}

impl FromIterator<ShiftSample> for ShiftSampleSet {
    fn from_iter<I: IntoIterator<Item = ShiftSample>>(iter: I) -> Self {
        let mut set = ShiftSampleSet::empty();
        for sample in iter {
            set.push(sample);
        }
        set
    }
}
