//! Heat-map rendering of shift fields.
//!
//! Values are normalized into a display range and colored by a [`Colormap`].
//! Undefined cells are transparent and values outside the range are painted
//! with a separate out-of-range color so clipping stays visible. The image is
//! resampled to a fixed size along its longest side and may carry a color
//! scale strip on the right whose width is a twentieth of the map height.

use crate::field::{is_undefined, Grid};
use crate::trace::trace_span;
use crate::util::stats::percentile_of_sorted;
use crate::util::{MisregError, MisregResult};
use std::path::Path;

mod colormap;
#[cfg(feature = "image-io")]
mod io;

pub use colormap::{ColorStop, Colormap};

/// Lower percentile used when no explicit range is given.
pub const AUTO_RANGE_LOW_PERCENTILE: f64 = 0.1;
/// Upper percentile used when no explicit range is given.
pub const AUTO_RANGE_HIGH_PERCENTILE: f64 = 99.9;

const COLORBAR_ASPECT: f64 = 20.0;
const COLORBAR_PAD_FRACTION: f64 = 0.5;

/// Rendering parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct HeatmapOptions {
    /// Display range; derived from percentiles of the data when `None`.
    pub range: Option<(f64, f64)>,
    pub colormap: Colormap,
    /// Draw a color scale strip to the right of the map.
    pub colorbar: bool,
    /// Length in pixels of the longest side of the map area.
    pub max_side: usize,
    /// RGBA for values below or above the display range.
    pub out_of_range_color: [u8; 4],
    /// RGBA for undefined cells.
    pub undefined_color: [u8; 4],
}

impl Default for HeatmapOptions {
    fn default() -> Self {
        Self {
            range: None,
            colormap: Colormap::Magma,
            colorbar: true,
            max_side: 1000,
            out_of_range_color: [255, 255, 255, 255],
            undefined_color: [0, 0, 0, 0],
        }
    }
}

impl HeatmapOptions {
    /// Options with a fixed display range.
    pub fn with_range(min: f64, max: f64) -> Self {
        Self {
            range: Some((min, max)),
            ..Self::default()
        }
    }
}

/// Rendered RGBA pixels, row-major, four bytes per pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct Heatmap {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

impl Heatmap {
    /// Pixel at `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y * self.width + x) * 4;
        let px = self.rgba.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Resolves the display range for `grid`.
///
/// An explicit range must be finite with `min < max`. Otherwise the 0.1st and
/// 99.9th percentiles of the defined cells are used; a grid without defined
/// cells fails with [`MisregError::EmptyMatrix`].
pub fn display_range(grid: &Grid, range: Option<(f64, f64)>) -> MisregResult<(f64, f64)> {
    if let Some((lo, hi)) = range {
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return Err(MisregError::InvalidInput(
                "display range must be finite with min < max",
            ));
        }
        return Ok((lo, hi));
    }
    let mut values: Vec<f64> = grid.defined_values().filter(|v| v.is_finite()).collect();
    values.sort_by(f64::total_cmp);
    let lo = percentile_of_sorted(&values, AUTO_RANGE_LOW_PERCENTILE)
        .ok_or(MisregError::EmptyMatrix)?;
    let hi = percentile_of_sorted(&values, AUTO_RANGE_HIGH_PERCENTILE)
        .ok_or(MisregError::EmptyMatrix)?;
    Ok((lo, hi))
}

/// Colors `grid` into an RGBA buffer.
pub fn heatmap_rgba(grid: &Grid, options: &HeatmapOptions) -> MisregResult<Heatmap> {
    if options.max_side == 0 {
        return Err(MisregError::InvalidInput("max_side must be positive"));
    }
    let (lo, hi) = display_range(grid, options.range)?;
    let span = hi - lo;

    let scale = options.max_side as f64 / grid.width().max(grid.height()) as f64;
    let map_w = ((grid.width() as f64 * scale).round() as usize).max(1);
    let map_h = ((grid.height() as f64 * scale).round() as usize).max(1);
    let (pad, bar_w) = if options.colorbar {
        let bar_w = ((map_h as f64 / COLORBAR_ASPECT).round() as usize).max(1);
        let pad = ((bar_w as f64 * COLORBAR_PAD_FRACTION).round() as usize).max(1);
        (pad, bar_w)
    } else {
        (0, 0)
    };
    let width = map_w + pad + bar_w;
    let height = map_h;

    let mut rgba = vec![0u8; width * height * 4];
    for y in 0..height {
        let src_y = (((y as f64 + 0.5) / scale) as usize).min(grid.height() - 1);
        let src_row = grid.row(src_y).unwrap_or(&[]);
        let out_row = &mut rgba[y * width * 4..(y + 1) * width * 4];

        for x in 0..map_w {
            let src_x = (((x as f64 + 0.5) / scale) as usize).min(grid.width() - 1);
            let value = src_row.get(src_x).copied().unwrap_or(f64::NAN);
            let px = if is_undefined(value) {
                options.undefined_color
            } else if value < lo || value > hi {
                options.out_of_range_color
            } else {
                let [r, g, b] = options.colormap.eval((value - lo) / span);
                [r, g, b, 255]
            };
            out_row[x * 4..x * 4 + 4].copy_from_slice(&px);
        }

        if bar_w > 0 {
            let t = 1.0 - (y as f64 + 0.5) / height as f64;
            let [r, g, b] = options.colormap.eval(t);
            for x in map_w + pad..width {
                out_row[x * 4..x * 4 + 4].copy_from_slice(&[r, g, b, 255]);
            }
        }
    }

    Ok(Heatmap {
        width,
        height,
        rgba,
    })
}

/// Renders `grid` and writes it as a PNG file.
pub fn render_heatmap(grid: &Grid, path: &Path, options: &HeatmapOptions) -> MisregResult<()> {
    let _span = trace_span!("render").entered();
    let heatmap = heatmap_rgba(grid, options)?;
    write_png(&heatmap, path)
}

#[cfg(feature = "image-io")]
fn write_png(heatmap: &Heatmap, path: &Path) -> MisregResult<()> {
    io::write_png(heatmap, path)
}

#[cfg(not(feature = "image-io"))]
fn write_png(_heatmap: &Heatmap, _path: &Path) -> MisregResult<()> {
    Err(MisregError::NotImplemented(
        "heat-map output requires the `image-io` feature",
    ))
}
