//! Shared utility helpers.

pub mod error;
pub mod stats;

pub use error::{MisregError, Result as MisregResult};
