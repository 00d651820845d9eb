//! Parameter file describing the template-matching algorithm.

use crate::register::RegistrationConfig;
use crate::util::{MisregError, MisregResult};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Renders `config` in the toolkit's definition-file syntax.
pub fn algorithm_definition(config: &RegistrationConfig) -> String {
    format!(
        "Object = AutoRegistration\n\
         \x20 Group = Algorithm\n\
         \x20   Name      = {algorithm}\n\
         \x20   Tolerance = {tolerance}\n\
         \x20 EndGroup\n\
         \n\
         \x20 Group = PatternChip\n\
         \x20   Samples       = {pattern_samples}\n\
         \x20   Lines         = {pattern_lines}\n\
         \x20   MinimumZScore = {z_score:e}\n\
         \x20 EndGroup\n\
         \n\
         \x20 Group = SearchChip\n\
         \x20   Samples = {search_samples}\n\
         \x20   Lines   = {search_lines}\n\
         \x20 EndGroup\n\
         EndObject\n\
         End\n",
        algorithm = config.algorithm,
        tolerance = config.tolerance,
        pattern_samples = config.pattern_samples,
        pattern_lines = config.pattern_lines,
        z_score = config.minimum_z_score,
        search_samples = config.search_samples,
        search_lines = config.search_lines,
    )
}

/// Writes the definition file to a temporary `.def` file.
///
/// The file is removed when the returned handle is dropped.
pub fn write_algorithm_definition(
    config: &RegistrationConfig,
    scratch_dir: Option<&Path>,
) -> MisregResult<NamedTempFile> {
    config.validate()?;
    let mut builder = tempfile::Builder::new();
    builder.prefix("autoreg").suffix(".def");
    let created = match scratch_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    };
    let mut file = created.map_err(|err| MisregError::io("create definition file", err))?;
    file.write_all(algorithm_definition(config).as_bytes())
        .and_then(|_| file.flush())
        .map_err(|err| MisregError::io("write definition file", err))?;
    Ok(file)
}
