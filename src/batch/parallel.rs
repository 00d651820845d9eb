//! Rayon-parallel mosaic processing (feature-gated).
//!
//! The caller hands over at most `jobs` mosaics at a time, which bounds the
//! number of concurrent toolkit invocations. Each mosaic gets its own scratch
//! directories from the toolkit, and results come back in input order so the
//! single report writer stays deterministic.

use crate::batch::{process_mosaic, BatchConfig, MosaicResult};
use crate::toolkit::Toolkit;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Measures every mosaic of `chunk` concurrently, preserving order.
pub(super) fn process_chunk_par<T: Toolkit + ?Sized>(
    toolkit: &T,
    root: &Path,
    chunk: &[PathBuf],
    config: &BatchConfig,
) -> Vec<MosaicResult> {
    chunk
        .par_iter()
        .map(|path| process_mosaic(toolkit, root, path, config))
        .collect()
}
