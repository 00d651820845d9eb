//! PNG output via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::render::Heatmap;
use crate::util::{MisregError, MisregResult};
use image::{ImageFormat, RgbaImage};
use std::path::Path;

/// Writes a rendered heat map to `path` as PNG.
pub(crate) fn write_png(heatmap: &Heatmap, path: &Path) -> MisregResult<()> {
    let width = u32::try_from(heatmap.width).map_err(|_| MisregError::InvalidDimensions {
        width: heatmap.width,
        height: heatmap.height,
    })?;
    let height = u32::try_from(heatmap.height).map_err(|_| MisregError::InvalidDimensions {
        width: heatmap.width,
        height: heatmap.height,
    })?;
    let img = RgbaImage::from_raw(width, height, heatmap.rgba.clone()).ok_or(
        MisregError::InvalidDimensions {
            width: heatmap.width,
            height: heatmap.height,
        },
    )?;
    img.save_with_format(path, ImageFormat::Png)
        .map_err(|err| MisregError::ImageIo {
            reason: format!("{}: {err}", path.display()),
        })
}
