//! Soil XRF - Survey Loader & Per-Element Chart Renderer
//!
//! Loads an XRF soil survey export, derives site/coordinate/depth from the
//! sample code and writes one bar chart with error bars per measured element.

mod charts;
mod config;
mod data;
mod limits;
mod pipeline;
mod report;
mod stats;

use anyhow::{Context, Result};
use charts::ChartFormat;
use clap::Parser;
use config::SurveyConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "soil_xrf")]
#[command(about = "Chart an XRF soil survey, one bar chart per element", long_about = None)]
struct Args {
    /// Survey export (delimited text with a header row)
    input: Option<PathBuf>,

    /// Directory for charts, summary.json and cleaned.csv
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// JSON settings file; command line flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Chart image format
    #[arg(long, value_enum)]
    format: Option<ChartFormat>,

    /// Column holding the site_coordinate_depth sample code
    #[arg(long)]
    info_column: Option<String>,

    /// Column holding the concentration units
    #[arg(long)]
    units_column: Option<String>,

    /// Suffix of concentration columns, e.g. " Concentration"
    #[arg(long, allow_hyphen_values = true)]
    value_suffix: Option<String>,

    /// Suffix of 1σ error columns, e.g. " Error1s"
    #[arg(long, allow_hyphen_values = true)]
    error_suffix: Option<String>,

    /// Field separator of the input file
    #[arg(long)]
    separator: Option<char>,

    /// Chart width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Chart height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Do not draw EPA limit lines
    #[arg(long)]
    no_limits: bool,

    /// Print the first N rows of the prepared table (0 disables)
    #[arg(long, value_name = "N", default_value_t = 5)]
    preview: usize,

    /// Open the output directory when done
    #[arg(long)]
    open: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn preview_rows(&self) -> Option<usize> {
        (self.preview > 0).then_some(self.preview)
    }

    /// Start from the config file (or defaults) and apply command line overrides.
    fn into_config(self) -> Result<SurveyConfig> {
        let mut config = match &self.config {
            Some(path) => SurveyConfig::from_file(path)?,
            None => SurveyConfig::default(),
        };

        if let Some(input) = self.input {
            config.input = Some(input);
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(column) = self.info_column {
            config.info_column = column;
        }
        if let Some(column) = self.units_column {
            config.units_column = column;
        }
        if let Some(suffix) = self.value_suffix {
            config.value_suffix = suffix;
        }
        if let Some(suffix) = self.error_suffix {
            config.error_suffix = suffix;
        }
        if let Some(separator) = self.separator {
            config.separator = separator;
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if self.no_limits {
            config.show_limits = false;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let preview_rows = args.preview_rows();
    let open_output = args.open;
    let config = args.into_config()?;
    log::debug!("Settings: {config:?}");

    let summary = pipeline::run(&config, preview_rows)?;

    if let Some(preview) = &summary.preview {
        println!("{preview}");
    }
    println!(
        "{} rows, {} elements, {} charts written to {}",
        summary.rows,
        summary.elements,
        summary.charts_written.len(),
        config.output_dir.display()
    );
    for (element, count) in &summary.exceedances {
        println!("  {element}: {count} sample(s) above the EPA limit");
    }

    if open_output {
        open::that(&config.output_dir)
            .with_context(|| format!("opening {}", config.output_dir.display()))?;
    }

    if !summary.failures.is_empty() {
        for (element, error) in &summary.failures {
            eprintln!("  {element}: {error}");
        }
        anyhow::bail!("{} chart(s) failed", summary.failures.len());
    }
    Ok(())
}
