//! Band misregistration of a single mosaic.

use crate::register::{RegistrationConfig, ShiftSampleSet};
use crate::toolkit::Toolkit;
use crate::trace::{trace_event, trace_span};
use crate::util::MisregResult;
use std::path::Path;

/// Result of measuring one mosaic.
#[derive(Clone, Debug, PartialEq)]
pub enum BandMismatch {
    /// Per-tile shifts of the source band relative to the target band.
    Measured(ShiftSampleSet),
    /// The mosaic lacks one of the requested bands and is skipped.
    NotApplicable { missing: String },
}

/// Splits `mosaic` into bands and registers `source_band` against `target_band`.
///
/// The temporary band files live only for the duration of this call; they are
/// removed on every exit path.
pub fn compute_band_mismatch<T: Toolkit + ?Sized>(
    toolkit: &T,
    mosaic: &Path,
    source_band: &str,
    target_band: &str,
    config: &RegistrationConfig,
) -> MisregResult<BandMismatch> {
    let _span = trace_span!("mosaic").entered();
    let bands = toolkit.explode_bands(mosaic)?;

    let (source, target) = match (bands.get(source_band), bands.get(target_band)) {
        (Some(source), Some(target)) => (source, target),
        (None, _) => {
            return Ok(BandMismatch::NotApplicable {
                missing: source_band.trim().to_string(),
            })
        }
        (_, None) => {
            return Ok(BandMismatch::NotApplicable {
                missing: target_band.trim().to_string(),
            })
        }
    };

    let samples = toolkit.register(source, target, config)?;
    trace_event!("mismatch", tiles = samples.len());
    Ok(BandMismatch::Measured(samples))
}
