//! Survey Loader Module
//! Handles delimited file loading and column inspection using Polars.

use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("No data rows in {}", .0.display())]
    NoData(PathBuf),
}

/// Loads the XRF export with Polars.
pub struct SurveyLoader {
    df: Option<DataFrame>,
    file_path: Option<PathBuf>,
    separator: u8,
}

impl Default for SurveyLoader {
    fn default() -> Self {
        Self::new(b',')
    }
}

impl SurveyLoader {
    pub fn new(separator: u8) -> Self {
        Self {
            df: None,
            file_path: None,
            separator,
        }
    }

    /// Load a delimited file. Unparseable cells become nulls instead of failing the load.
    pub fn load_csv(&mut self, file_path: &Path) -> Result<&DataFrame, LoaderError> {
        if !file_path.is_file() {
            return Err(LoaderError::NotFound(file_path.to_path_buf()));
        }
        self.file_path = Some(file_path.to_path_buf());

        let df = LazyCsvReader::new(file_path)
            .with_separator(self.separator)
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .finish()?
            .collect()?;

        if df.height() == 0 {
            return Err(LoaderError::NoData(file_path.to_path_buf()));
        }

        log::info!(
            "Loaded {} rows x {} columns from {}",
            df.height(),
            df.width(),
            file_path.display()
        );

        self.df = Some(df);
        self.df
            .as_ref()
            .ok_or_else(|| LoaderError::NoData(file_path.to_path_buf()))
    }

    /// Get list of column names from loaded DataFrame.
    pub fn get_columns(&self) -> Vec<String> {
        self.df
            .as_ref()
            .map(|df| {
                df.get_column_names()
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get list of columns Polars inferred as numeric.
    pub fn get_numeric_columns(&self) -> Vec<String> {
        let Some(df) = &self.df else {
            return Vec::new();
        };

        df.get_columns()
            .iter()
            .filter(|col| {
                matches!(
                    col.dtype(),
                    DataType::Float32
                        | DataType::Float64
                        | DataType::Int8
                        | DataType::Int16
                        | DataType::Int32
                        | DataType::Int64
                        | DataType::UInt8
                        | DataType::UInt16
                        | DataType::UInt32
                        | DataType::UInt64
                )
            })
            .map(|col| col.name().to_string())
            .collect()
    }

    /// Get the number of rows in the DataFrame.
    pub fn get_row_count(&self) -> usize {
        self.df.as_ref().map(|df| df.height()).unwrap_or(0)
    }

    /// Take ownership of the loaded DataFrame.
    pub fn into_dataframe(self) -> Option<DataFrame> {
        self.df
    }

    /// Get file path.
    pub fn get_file_path(&self) -> Option<&PathBuf> {
        self.file_path.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn loads_columns_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xrf.csv");
        fs::write(
            &path,
            "info,Units,Pb Concentration,Pb Error1s\nA_1_0-10,ppm,120.5,4.1\nA_2_0-10,ppm,<LOD,3.0\n",
        )
        .unwrap();

        let mut loader = SurveyLoader::default();
        let df = loader.load_csv(&path).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(
            loader.get_columns(),
            vec!["info", "Units", "Pb Concentration", "Pb Error1s"]
        );
        assert_eq!(loader.get_row_count(), 2);
        assert!(loader.get_numeric_columns().contains(&"Pb Error1s".to_string()));
        assert_eq!(loader.get_file_path(), Some(&path));
    }

    #[test]
    fn honours_custom_separator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xrf.tsv");
        fs::write(&path, "info\tZn Concentration\nB_1_0-5\t88\n").unwrap();

        let mut loader = SurveyLoader::new(b'\t');
        loader.load_csv(&path).unwrap();
        assert_eq!(loader.get_columns(), vec!["info", "Zn Concentration"]);
    }

    #[test]
    fn missing_file_is_reported() {
        let mut loader = SurveyLoader::default();
        let err = loader.load_csv(Path::new("/nonexistent/xrf.csv")).unwrap_err();
        assert!(matches!(err, LoaderError::NotFound(_)));
    }

    #[test]
    fn header_only_file_has_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "info,Pb Concentration\n").unwrap();

        let mut loader = SurveyLoader::default();
        let err = loader.load_csv(&path).unwrap_err();
        assert!(matches!(err, LoaderError::NoData(_)));
        assert_eq!(loader.get_row_count(), 0);
    }
}
