//! misreg measures band-to-band misregistration in multi-band camera mosaics.
//!
//! An external planetary image-processing toolkit splits each mosaic into
//! single-band files and template-matches a source band against a target
//! band. This crate drives those programs, parses their output into per-tile
//! shift samples, summarizes the samples per mosaic and per dataset, and can
//! interpolate the sparse shifts into dense heat maps.
//!
//! Optional features: `rayon` measures several mosaics concurrently,
//! `image-io` writes heat maps as PNG, and `tracing` emits spans and events.

pub mod batch;
pub mod field;
pub mod mosaic;
pub mod register;
pub mod render;
pub mod toolkit;
mod trace;
pub mod util;

pub use batch::{
    discover_mosaics, process_mosaic, run_batch, BatchConfig, BatchSummary, MosaicOutcome,
    MosaicResult, MosaicShifts,
};
pub use field::{interpolate_scattered, interpolate_shift_field, is_undefined, Grid, UNDEFINED};
pub use mosaic::{compute_band_mismatch, BandMismatch};
pub use register::{RegistrationConfig, ShiftAxis, ShiftSample, ShiftSampleSet, ShiftSummary};
pub use render::{display_range, heatmap_rgba, render_heatmap, Colormap, Heatmap, HeatmapOptions};
pub use toolkit::{BandFile, BandFiles, IsisToolkit, Toolkit, ToolkitConfig};
pub use util::{MisregError, MisregResult};
