//! Report Writer
//! Writes the statistics summary and the cleaned survey table next to the charts.

use crate::stats::ElementStats;
use polars::prelude::*;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use thiserror::Error;

pub const SUMMARY_FILE: &str = "summary.json";
pub const CLEANED_FILE: &str = "cleaned.csv";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

pub struct ReportWriter;

impl ReportWriter {
    /// Write per-element statistics as a pretty JSON array.
    pub fn write_summary_json(stats: &[ElementStats], path: &Path) -> Result<(), ReportError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, stats)?;
        Ok(())
    }

    /// Write the prepared table (derived fields, numeric measurements, sorted).
    pub fn write_cleaned_csv(df: &mut DataFrame, path: &Path) -> Result<(), ReportError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file).include_header(true).finish(df)?;
        Ok(())
    }

    /// First `rows` rows formatted for the console.
    pub fn preview(df: &DataFrame, rows: usize) -> String {
        df.head(Some(rows)).to_string()
    }
}
