//! Process-backed toolkit: `catlab`, `explode` and `coreg`.

use crate::register::{
    read_results_table, write_algorithm_definition, RegistrationConfig, ShiftSampleSet,
};
use crate::toolkit::process::{run_tool, ToolOutput};
use crate::toolkit::pvl::{parse_band_names, parse_raster_size};
use crate::toolkit::{band_file_paths, mosaic_stem, BandFiles, Toolkit, ToolkitConfig};
use crate::trace::{trace_event, trace_span};
use crate::util::{MisregError, MisregResult};
use std::ffi::OsString;
use std::path::Path;

/// Toolkit implementation that shells out to the installed programs.
#[derive(Clone, Debug, Default)]
pub struct IsisToolkit {
    config: ToolkitConfig,
}

impl IsisToolkit {
    pub fn new(config: ToolkitConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ToolkitConfig {
        &self.config
    }

    fn label(&self, mosaic: &Path) -> MisregResult<String> {
        let output = self
            .run(&self.config.catlab, &[param("from", mosaic)])
            .map_err(|reason| MisregError::Toolkit {
                program: self.config.catlab.display().to_string(),
                reason,
            })?;
        Ok(output.stdout)
    }

    fn run(&self, program: &Path, args: &[OsString]) -> Result<ToolOutput, String> {
        run_tool(program, args, self.config.timeout).map_err(|failure| failure.to_string())
    }
}

impl Toolkit for IsisToolkit {
    fn list_bands(&self, mosaic: &Path) -> MisregResult<Vec<String>> {
        parse_band_names(&self.label(mosaic)?)
    }

    fn raster_size(&self, mosaic: &Path) -> MisregResult<(usize, usize)> {
        parse_raster_size(&self.label(mosaic)?)
    }

    fn explode_bands(&self, mosaic: &Path) -> MisregResult<BandFiles> {
        let _span = trace_span!("explode").entered();
        let explode_err = |reason: String| MisregError::Explode {
            mosaic: mosaic.to_path_buf(),
            reason,
        };

        let workdir = self
            .config
            .temp_dir("explode")
            .map_err(|err| explode_err(format!("cannot create scratch directory: {err}")))?;
        let prefix = workdir.path().join(mosaic_stem(mosaic));

        self.run(
            &self.config.explode,
            &[param("from", mosaic), param("to", &prefix)],
        )
        .map_err(explode_err)?;

        let names = self.list_bands(mosaic)?;
        let files = band_file_paths(&prefix, &names);
        if let Some(missing) = files.iter().find(|f| !f.path.exists()) {
            return Err(explode_err(format!(
                "expected band file {} was not written",
                missing.path.display()
            )));
        }

        trace_event!("exploded", bands = files.len());
        Ok(BandFiles::new(files, Some(workdir)))
    }

    fn register(
        &self,
        source: &Path,
        target: &Path,
        config: &RegistrationConfig,
    ) -> MisregResult<ShiftSampleSet> {
        let _span = trace_span!("register").entered();
        let deffile = write_algorithm_definition(config, self.config.scratch_dir.as_deref())?;
        let workdir = self
            .config
            .temp_dir("coreg")
            .map_err(|err| MisregError::io("create registration scratch directory", err))?;
        let flatfile = workdir.path().join("shifts.txt");

        self.run(
            &self.config.coreg,
            &[
                param("from", source),
                param("match", target),
                param("deffile", deffile.path()),
                param("flatfile", &flatfile),
            ],
        )
        .map_err(|reason| MisregError::Registration { reason })?;

        let samples = read_results_table(&flatfile)?;
        trace_event!("registered", tiles = samples.len());
        Ok(samples)
    }
}

fn param(key: &str, path: &Path) -> OsString {
    let mut arg = OsString::from(key);
    arg.push("=");
    arg.push(path.as_os_str());
    arg
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    const LABEL: &str = "Object = IsisCube
  Object = Core
    Group = Dimensions
      Samples = 64
      Lines   = 32
      Bands   = 3
    End_Group
  End_Object
  Group = BandBin
    FilterName = (RED, GREEN, NIR)
  End_Group
End_Object
End
";

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn fake_toolkit(dir: &Path, explode_body: &str, coreg_body: &str) -> IsisToolkit {
        fs::write(dir.join("label.txt"), LABEL).unwrap();
        let catlab = script(dir, "catlab", &format!("cat {}", dir.join("label.txt").display()));
        let explode = script(dir, "explode", explode_body);
        let coreg = script(dir, "coreg", coreg_body);
        IsisToolkit::new(ToolkitConfig {
            catlab,
            explode,
            coreg,
            ..ToolkitConfig::default()
        })
    }

    const EXPLODE_OK: &str = r#"prefix="${2#to=}"
for i in 0001 0002 0003; do : > "$prefix.band$i.cub"; done"#;

    #[test]
    fn metadata_queries_parse_catlab_output() {
        let dir = tempfile::tempdir().unwrap();
        let toolkit = fake_toolkit(dir.path(), "exit 0", "exit 0");
        assert_eq!(toolkit.config().catlab, dir.path().join("catlab"));
        let mosaic = dir.path().join("m1.cub");
        assert_eq!(toolkit.list_bands(&mosaic).unwrap(), vec!["RED", "GREEN", "NIR"]);
        assert_eq!(toolkit.raster_size(&mosaic).unwrap(), (64, 32));
    }

    #[test]
    fn explode_maps_bands_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let toolkit = fake_toolkit(dir.path(), EXPLODE_OK, "exit 0");
        let bands = toolkit.explode_bands(&dir.path().join("m1.cub")).unwrap();
        let names: Vec<_> = bands.files().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["RED", "GREEN", "NIR"]);
        let nir = bands.get("NIR").unwrap().to_path_buf();
        assert!(nir.to_string_lossy().ends_with("m1.band0003.cub"));
        assert!(nir.exists());
        drop(bands);
        assert!(!nir.exists());
    }

    #[test]
    fn explode_failure_status_is_an_explode_error() {
        let dir = tempfile::tempdir().unwrap();
        let toolkit = fake_toolkit(dir.path(), "echo 'no such cube' >&2; exit 1", "exit 0");
        let err = toolkit.explode_bands(&dir.path().join("m1.cub")).unwrap_err();
        match err {
            MisregError::Explode { reason, .. } => assert!(reason.contains("no such cube")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn register_reads_flatfile_written_by_coreg() {
        let dir = tempfile::tempdir().unwrap();
        let coreg = r#"for arg in "$@"; do
  case "$arg" in
    flatfile=*) out="${arg#flatfile=}";;
    deffile=*) def="${arg#deffile=}";;
  esac
done
grep -q MaximumCorrelation "$def" || exit 2
printf 'Sample,Line,TS,TL,SampleDifference,LineDifference,Fit\n5,6,0,0,1.5,-0.25,0.9\n' > "$out""#;
        let toolkit = fake_toolkit(dir.path(), EXPLODE_OK, coreg);
        let samples = toolkit
            .register(
                Path::new("a.cub"),
                Path::new("b.cub"),
                &RegistrationConfig::default(),
            )
            .unwrap();
        assert_eq!(samples.x_shifts(), &[1.5]);
        assert_eq!(samples.y_shifts(), &[-0.25]);
    }

    #[test]
    fn register_failure_status_is_a_registration_error() {
        let dir = tempfile::tempdir().unwrap();
        let toolkit = fake_toolkit(dir.path(), EXPLODE_OK, "exit 4");
        let err = toolkit
            .register(
                Path::new("a.cub"),
                Path::new("b.cub"),
                &RegistrationConfig::default(),
            )
            .unwrap_err();
        assert!(err.is_registration_failure());
    }

    #[test]
    fn register_without_flatfile_is_a_registration_error() {
        let dir = tempfile::tempdir().unwrap();
        let toolkit = fake_toolkit(dir.path(), EXPLODE_OK, "exit 0");
        let err = toolkit
            .register(
                Path::new("a.cub"),
                Path::new("b.cub"),
                &RegistrationConfig::default(),
            )
            .unwrap_err();
        assert!(matches!(err, MisregError::Registration { .. }));
    }
}
