//! Dense shift fields interpolated from sparse tile samples.
//!
//! A [`Grid`] is a row-major matrix of `f64`. Cells that could not be
//! interpolated hold the [`UNDEFINED`] sentinel (NaN); use [`is_undefined`]
//! to test for it since NaN never compares equal.

use crate::util::{MisregError, MisregResult};

mod delaunay;
mod interp;

pub use interp::{interpolate_scattered, interpolate_shift_field};

/// Sentinel stored in cells without a value.
pub const UNDEFINED: f64 = f64::NAN;

/// Returns true when `value` is the undefined sentinel.
#[inline]
pub fn is_undefined(value: f64) -> bool {
    value.is_nan()
}

/// Owned row-major matrix.
#[derive(Clone, Debug)]
pub struct Grid {
    data: Vec<f64>,
    width: usize,
    height: usize,
}

impl Grid {
    /// Creates a grid from a row-major buffer of exactly `width * height` cells.
    pub fn new(data: Vec<f64>, width: usize, height: usize) -> MisregResult<Self> {
        if width == 0 || height == 0 {
            return Err(MisregError::InvalidDimensions { width, height });
        }
        let needed = width
            .checked_mul(height)
            .ok_or(MisregError::InvalidDimensions { width, height })?;
        if data.len() != needed {
            return Err(MisregError::InvalidInput(
                "grid buffer length must equal width * height",
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Creates a grid with every cell undefined.
    pub fn undefined(width: usize, height: usize) -> MisregResult<Self> {
        let len = width
            .checked_mul(height)
            .ok_or(MisregError::InvalidDimensions { width, height })?;
        Self::new(vec![UNDEFINED; len], width, height)
    }

    /// Returns the grid width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the grid height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the row-major backing slice.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Returns the value at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Returns row `y`.
    pub fn row(&self, y: usize) -> Option<&[f64]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.width;
        self.data.get(start..start + self.width)
    }

    /// Iterates over cells that hold a value.
    pub fn defined_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().copied().filter(|v| !is_undefined(*v))
    }

    /// Returns true when no cell holds a value.
    pub fn is_all_undefined(&self) -> bool {
        self.data.iter().all(|v| is_undefined(*v))
    }

    pub(crate) fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }
}
