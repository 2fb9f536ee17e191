//! Survey Configuration
//! Defaults, optional JSON config file and command line overrides.

use crate::charts::{ChartFormat, ChartOptions};
use crate::data::{ColumnNaming, COORDINATE_COL, DEPTH_COL, SITE_COL};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

const MIN_CHART_SIZE: u32 = 200;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {1}", path = .0.display())]
    Read(PathBuf, #[source] std::io::Error),
    #[error("Invalid config {path}: {1}", path = .0.display())]
    Parse(PathBuf, #[source] serde_json::Error),
    #[error("No input file given")]
    MissingInput,
    #[error("Separator must be a single ASCII character, got {0:?}")]
    InvalidSeparator(char),
    #[error("{0} must not be empty")]
    EmptySetting(&'static str),
    #[error("Chart size {0}x{1} is too small (minimum 200)")]
    ChartTooSmall(u32, u32),
}

/// All settings of a survey run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    pub input: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub format: ChartFormat,
    pub info_column: String,
    pub units_column: String,
    pub default_units: String,
    pub value_suffix: String,
    pub error_suffix: String,
    pub separator: char,
    pub sort_by: Vec<String>,
    pub width: u32,
    pub height: u32,
    pub show_limits: bool,
    /// Element symbol → limit, replacing or extending the built-in table.
    pub limits: BTreeMap<String, f64>,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        let naming = ColumnNaming::default();
        let chart = ChartOptions::default();
        Self {
            input: None,
            output_dir: PathBuf::from("charts"),
            format: chart.format,
            info_column: "info".to_string(),
            units_column: "Units".to_string(),
            default_units: "ppm".to_string(),
            value_suffix: naming.value_suffix,
            error_suffix: naming.error_suffix,
            separator: ',',
            sort_by: vec![
                SITE_COL.to_string(),
                COORDINATE_COL.to_string(),
                DEPTH_COL.to_string(),
            ],
            width: chart.width,
            height: chart.height,
            show_limits: true,
            limits: BTreeMap::new(),
        }
    }
}

impl SurveyConfig {
    /// Load settings from a JSON file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// Check the settings before running.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.is_none() {
            return Err(ConfigError::MissingInput);
        }
        if !self.separator.is_ascii() {
            return Err(ConfigError::InvalidSeparator(self.separator));
        }
        if self.info_column.trim().is_empty() {
            return Err(ConfigError::EmptySetting("info_column"));
        }
        if self.error_suffix.is_empty() {
            return Err(ConfigError::EmptySetting("error_suffix"));
        }
        if self.width < MIN_CHART_SIZE || self.height < MIN_CHART_SIZE {
            return Err(ConfigError::ChartTooSmall(self.width, self.height));
        }
        Ok(())
    }

    pub fn separator_byte(&self) -> u8 {
        // validate() guarantees ASCII
        self.separator as u8
    }

    pub fn naming(&self) -> ColumnNaming {
        ColumnNaming {
            value_suffix: self.value_suffix.clone(),
            error_suffix: self.error_suffix.clone(),
        }
    }

    pub fn chart_options(&self) -> ChartOptions {
        ChartOptions {
            width: self.width,
            height: self.height,
            format: self.format,
        }
    }
}
