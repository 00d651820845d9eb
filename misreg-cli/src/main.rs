use clap::Parser;
use misreg::{
    run_batch, BatchConfig, Colormap, HeatmapOptions, IsisToolkit, MosaicOutcome,
    RegistrationConfig, ToolkitConfig,
};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Measure band misregistration in every mosaic under a folder"
)]
struct Cli {
    /// Folder (searched recursively) containing the mosaics.
    #[arg(required_unless_present_any = ["print_schema", "print_example"])]
    input_folder: Option<PathBuf>,
    /// CSV report to create or overwrite.
    #[arg(required_unless_present_any = ["print_schema", "print_example"])]
    output_file: Option<PathBuf>,
    /// Band that is translated onto the target band.
    #[arg(long, alias = "source_band", default_value = "RED")]
    source_band: String,
    /// Band the source band is registered to.
    #[arg(long, alias = "target_band", default_value = "NIR")]
    target_band: String,
    /// Write x/y shift heat maps next to every measured mosaic.
    #[arg(long)]
    visualize: bool,
    /// Path to a JSON file with registration, toolkit and heat-map settings.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Number of mosaics measured concurrently.
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,
    /// Directory for per-mosaic raw shift tables.
    #[arg(long, value_name = "DIR")]
    samples_dir: Option<PathBuf>,
    /// Heat-map color map (overrides the config file).
    #[arg(long)]
    colormap: Option<Colormap>,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable debug-level tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RegistrationConfigJson {
    algorithm: String,
    tolerance: f64,
    pattern_samples: usize,
    pattern_lines: usize,
    minimum_z_score: f64,
    search_samples: usize,
    search_lines: usize,
}

impl Default for RegistrationConfigJson {
    fn default() -> Self {
        let cfg = RegistrationConfig::default();
        Self {
            algorithm: cfg.algorithm,
            tolerance: cfg.tolerance,
            pattern_samples: cfg.pattern_samples,
            pattern_lines: cfg.pattern_lines,
            minimum_z_score: cfg.minimum_z_score,
            search_samples: cfg.search_samples,
            search_lines: cfg.search_lines,
        }
    }
}

impl From<RegistrationConfigJson> for RegistrationConfig {
    fn from(value: RegistrationConfigJson) -> Self {
        Self {
            algorithm: value.algorithm,
            tolerance: value.tolerance,
            pattern_samples: value.pattern_samples,
            pattern_lines: value.pattern_lines,
            minimum_z_score: value.minimum_z_score,
            search_samples: value.search_samples,
            search_lines: value.search_lines,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ToolkitConfigJson {
    catlab: PathBuf,
    explode: PathBuf,
    coreg: PathBuf,
    /// Zero disables the limit.
    timeout_secs: u64,
    scratch_dir: Option<PathBuf>,
}

impl Default for ToolkitConfigJson {
    fn default() -> Self {
        let cfg = ToolkitConfig::default();
        Self {
            catlab: cfg.catlab,
            explode: cfg.explode,
            coreg: cfg.coreg,
            timeout_secs: cfg.timeout.map(|t| t.as_secs()).unwrap_or(0),
            scratch_dir: cfg.scratch_dir,
        }
    }
}

impl From<ToolkitConfigJson> for ToolkitConfig {
    fn from(value: ToolkitConfigJson) -> Self {
        Self {
            catlab: value.catlab,
            explode: value.explode,
            coreg: value.coreg,
            timeout: (value.timeout_secs > 0).then(|| Duration::from_secs(value.timeout_secs)),
            scratch_dir: value.scratch_dir,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct HeatmapConfigJson {
    min: f64,
    max: f64,
    colormap: String,
    colorbar: bool,
    max_side: usize,
}

impl Default for HeatmapConfigJson {
    fn default() -> Self {
        let cfg = BatchConfig::default().heatmap;
        let (min, max) = cfg.range.unwrap_or((-10.0, 10.0));
        Self {
            min,
            max,
            colormap: cfg.colormap.name().to_string(),
            colorbar: cfg.colorbar,
            max_side: cfg.max_side,
        }
    }
}

impl HeatmapConfigJson {
    fn into_options(self) -> Result<HeatmapOptions, String> {
        Ok(HeatmapOptions {
            range: Some((self.min, self.max)),
            colormap: self.colormap.parse()?,
            colorbar: self.colorbar,
            max_side: self.max_side,
            ..HeatmapOptions::default()
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    registration: RegistrationConfigJson,
    toolkit: ToolkitConfigJson,
    heatmap: HeatmapConfigJson,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.trace { "misreg=debug" } else { "misreg=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let (Some(input), Some(output)) = (cli.input_folder, cli.output_file) else {
        return Err("input_folder and output_file are required".into());
    };
    if !input.is_dir() {
        return Err(format!("input folder {} does not exist", input.display()).into());
    }

    let config: Config = match &cli.config {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => Config::default(),
    };

    let mut heatmap = config.heatmap.into_options()?;
    if let Some(colormap) = cli.colormap {
        heatmap.colormap = colormap;
    }
    let batch = BatchConfig {
        source_band: cli.source_band,
        target_band: cli.target_band,
        registration: config.registration.into(),
        visualize: cli.visualize,
        heatmap,
        jobs: cli.jobs,
        samples_dir: cli.samples_dir,
    };
    let toolkit = IsisToolkit::new(config.toolkit.into());

    let summary = run_batch(&toolkit, &input, &output, &batch)?;

    for result in &summary.results {
        match &result.outcome {
            MosaicOutcome::Failed(err) => warn!(file = %result.name, error = %err, "failed"),
            MosaicOutcome::Skipped { missing_band } => {
                info!(file = %result.name, missing_band = %missing_band, "skipped")
            }
            MosaicOutcome::Measured(shifts) => {
                for warning in &shifts.warnings {
                    warn!(file = %result.name, "{warning}");
                }
            }
        }
    }
    eprintln!(
        "{} measured, {} skipped, {} failed; report written to {}",
        summary.measured(),
        summary.skipped(),
        summary.failed(),
        output.display()
    );

    Ok(())
}
