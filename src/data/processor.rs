//! Survey Processor Module
//! Derives sampling metadata, pairs element columns and shapes the table for charting.

use super::sample::{natural_cmp_opt, SampleCode};
use polars::prelude::*;
use std::cmp::Ordering;
use thiserror::Error;

pub const SITE_COL: &str = "site";
pub const COORDINATE_COL: &str = "coordinate";
pub const DEPTH_COL: &str = "depth";

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Column '{0}' not found")]
    MissingColumn(String),
    #[error("No element columns ending in '{0}' were found")]
    NoElementColumns(String),
}

/// How value and error columns are named: `<Element><suffix>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNaming {
    pub value_suffix: String,
    pub error_suffix: String,
}

impl Default for ColumnNaming {
    fn default() -> Self {
        Self {
            value_suffix: " Concentration".to_string(),
            error_suffix: " Error1s".to_string(),
        }
    }
}

/// The concentration column of one element and its 1σ error column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementColumns {
    pub element: String,
    pub value: String,
    pub error: Option<String>,
}

impl ElementColumns {
    fn names(&self) -> impl Iterator<Item = &String> {
        std::iter::once(&self.value).chain(self.error.iter())
    }
}

/// One bar of an element chart.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePoint {
    pub label: String,
    pub site: Option<String>,
    pub value: Option<f64>,
    pub error: Option<f64>,
}

/// All sorted samples of one element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSeries {
    pub element: String,
    pub units: String,
    pub samples: Vec<SamplePoint>,
}

impl ElementSeries {
    /// Whether at least one sample has a measured value.
    pub fn has_values(&self) -> bool {
        self.samples.iter().any(|s| s.value.is_some())
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().filter_map(|s| s.value).collect()
    }

    /// Sites in order of first appearance.
    pub fn sites(&self) -> Vec<String> {
        let mut sites: Vec<String> = Vec::new();
        for site in self.samples.iter().filter_map(|s| s.site.as_ref()) {
            if !sites.contains(site) {
                sites.push(site.clone());
            }
        }
        sites
    }
}

/// Table after derivation, coercion, selection and sorting.
#[derive(Debug, Clone)]
pub struct PreparedSurvey {
    pub df: DataFrame,
    pub elements: Vec<ElementColumns>,
}

/// Column layout used while preparing the table.
#[derive(Debug, Clone)]
pub struct SurveyLayout<'a> {
    pub info_col: &'a str,
    pub units_col: &'a str,
    pub naming: &'a ColumnNaming,
    pub sort_by: &'a [String],
}

/// Handles the survey table transformations.
pub struct SurveyProcessor;

impl SurveyProcessor {
    /// Run derive, pair, coerce, select and sort in order.
    pub fn prepare(
        mut df: DataFrame,
        layout: &SurveyLayout<'_>,
    ) -> Result<PreparedSurvey, ProcessorError> {
        Self::derive_sample_fields(&mut df, layout.info_col)?;

        let columns: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let elements = Self::pair_element_columns(&columns, layout.naming);
        if elements.is_empty() {
            return Err(ProcessorError::NoElementColumns(
                layout.naming.value_suffix.clone(),
            ));
        }
        log::info!("Found {} element columns", elements.len());

        Self::coerce_numeric(&mut df, &elements)?;
        let df = Self::select_measurements(&df, layout.info_col, layout.units_col, &elements)?;
        let df = Self::sort_samples(&df, layout.sort_by)?;

        Ok(PreparedSurvey { df, elements })
    }

    /// Add `site`, `coordinate` and `depth` columns split from the sample code.
    pub fn derive_sample_fields(df: &mut DataFrame, info_col: &str) -> Result<(), ProcessorError> {
        let codes: Vec<SampleCode> = Self::string_values(df, info_col)?
            .iter()
            .map(|code| code.as_deref().map(SampleCode::parse).unwrap_or_default())
            .collect();

        let sites: Vec<Option<String>> = codes.iter().map(|c| c.site.clone()).collect();
        let coordinates: Vec<Option<String>> =
            codes.iter().map(|c| c.coordinate.clone()).collect();
        let depths: Vec<Option<String>> = codes.into_iter().map(|c| c.depth).collect();

        df.with_column(Column::new(SITE_COL.into(), sites))?;
        df.with_column(Column::new(COORDINATE_COL.into(), coordinates))?;
        df.with_column(Column::new(DEPTH_COL.into(), depths))?;
        Ok(())
    }

    /// Discover value/error column pairs sharing an element prefix, in column order.
    ///
    /// With an empty value suffix only columns that have an error partner qualify,
    /// otherwise every metadata column would look like an element.
    pub fn pair_element_columns(columns: &[String], naming: &ColumnNaming) -> Vec<ElementColumns> {
        let error_suffix = naming.error_suffix.as_str();
        let value_suffix = naming.value_suffix.as_str();
        let mut pairs = Vec::new();

        for column in columns {
            if !error_suffix.is_empty() && column.ends_with(error_suffix) {
                continue;
            }
            let Some(prefix) = column.strip_suffix(value_suffix) else {
                continue;
            };
            let element = prefix.trim();
            if element.is_empty() {
                continue;
            }

            let error_name = format!("{prefix}{error_suffix}");
            let error = (!error_suffix.is_empty() && columns.contains(&error_name))
                .then_some(error_name);

            match (&error, value_suffix.is_empty()) {
                (None, true) => continue,
                (None, false) => {
                    log::warn!("Column '{column}' has no error column, charting without error bars")
                }
                _ => {}
            }

            pairs.push(ElementColumns {
                element: element.to_string(),
                value: column.clone(),
                error,
            });
        }

        for column in columns {
            if let Some(prefix) = column.strip_suffix(error_suffix) {
                if error_suffix.is_empty() || prefix.trim().is_empty() {
                    continue;
                }
                if !pairs.iter().any(|p| p.error.as_ref() == Some(column)) {
                    log::warn!("Error column '{column}' has no value column, ignoring");
                }
            }
        }

        pairs
    }

    /// Cast every measurement column to Float64. Non-numeric cells become null.
    pub fn coerce_numeric(
        df: &mut DataFrame,
        elements: &[ElementColumns],
    ) -> Result<(), ProcessorError> {
        for name in elements.iter().flat_map(ElementColumns::names) {
            let casted = df
                .column(name)
                .map_err(|_| ProcessorError::MissingColumn(name.clone()))?
                .cast(&DataType::Float64)?;
            df.with_column(casted)?;
        }
        Ok(())
    }

    /// Keep the sample code, derived fields, units and measurement columns.
    pub fn select_measurements(
        df: &DataFrame,
        info_col: &str,
        units_col: &str,
        elements: &[ElementColumns],
    ) -> Result<DataFrame, ProcessorError> {
        let mut keep: Vec<String> = vec![
            info_col.to_string(),
            SITE_COL.to_string(),
            COORDINATE_COL.to_string(),
            DEPTH_COL.to_string(),
        ];
        if df.column(units_col).is_ok() {
            keep.push(units_col.to_string());
        }
        keep.extend(elements.iter().flat_map(ElementColumns::names).cloned());

        Ok(df.select(keep)?)
    }

    /// Stable sort by the key columns in natural order, nulls last.
    pub fn sort_samples(df: &DataFrame, keys: &[String]) -> Result<DataFrame, ProcessorError> {
        let key_values = keys
            .iter()
            .map(|key| Self::string_values(df, key))
            .collect::<Result<Vec<_>, _>>()?;

        let mut order: Vec<IdxSize> = (0..df.height() as IdxSize).collect();
        order.sort_by(|&a, &b| {
            key_values.iter().fold(Ordering::Equal, |ord, values| {
                ord.then_with(|| {
                    natural_cmp_opt(
                        values[a as usize].as_deref(),
                        values[b as usize].as_deref(),
                    )
                })
            })
        });

        let order = IdxCa::from_vec(PlSmallStr::EMPTY, order);
        Ok(df.take(&order)?)
    }

    /// Extract the sorted samples of one element.
    pub fn element_series(
        df: &DataFrame,
        element: &ElementColumns,
        info_col: &str,
        units_col: &str,
        default_units: &str,
    ) -> Result<ElementSeries, ProcessorError> {
        let labels = Self::string_values(df, info_col)?;
        let sites = Self::string_values(df, SITE_COL)?;
        let values = Self::float_values(df, &element.value)?;
        let errors = match &element.error {
            Some(name) => Self::float_values(df, name)?,
            None => vec![None; df.height()],
        };

        let units = Self::string_values(df, units_col)
            .ok()
            .and_then(|units| units.into_iter().flatten().find(|u| !u.trim().is_empty()))
            .unwrap_or_else(|| default_units.to_string());

        let samples = labels
            .into_iter()
            .zip(sites)
            .zip(values.into_iter().zip(errors))
            .enumerate()
            .map(|(i, ((label, site), (value, error)))| SamplePoint {
                label: label.unwrap_or_else(|| format!("row {}", i + 1)),
                site,
                value,
                error,
            })
            .collect();

        Ok(ElementSeries {
            element: element.element.clone(),
            units: units.trim().to_string(),
            samples,
        })
    }

    fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, ProcessorError> {
        let column = df
            .column(name)
            .map_err(|_| ProcessorError::MissingColumn(name.to_string()))?
            .cast(&DataType::String)?;
        let values = column
            .as_materialized_series()
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect();
        Ok(values)
    }

    fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, ProcessorError> {
        let column = df
            .column(name)
            .map_err(|_| ProcessorError::MissingColumn(name.to_string()))?
            .cast(&DataType::Float64)?;
        let values = column
            .as_materialized_series()
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect();
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey() -> DataFrame {
        df!(
            "info" => ["B_1_0-10", "A_10_0-10", "A_2_10-20", "A_2_0-10"],
            "Units" => ["ppm", "ppm", "ppm", "ppm"],
            "Instrument" => ["V1", "V1", "V1", "V1"],
            "Pb Concentration" => ["450", "<LOD", "38.5", "120"],
            "Pb Error1s" => [12.0, 3.0, 2.5, 5.0],
            "As Concentration" => ["8.1", "ND", "ND", "ND"],
            "As Error1s" => [1.1, 1.0, 1.0, 1.0]
        )
        .unwrap()
    }

    fn strings(df: &DataFrame, name: &str) -> Vec<Option<String>> {
        SurveyProcessor::string_values(df, name).unwrap()
    }

    #[test]
    fn derives_site_coordinate_depth() {
        let mut df = survey();
        SurveyProcessor::derive_sample_fields(&mut df, "info").unwrap();
        assert_eq!(strings(&df, SITE_COL)[0].as_deref(), Some("B"));
        assert_eq!(strings(&df, COORDINATE_COL)[1].as_deref(), Some("10"));
        assert_eq!(strings(&df, DEPTH_COL)[2].as_deref(), Some("10-20"));
    }

    #[test]
    fn derive_requires_info_column() {
        let mut df = survey();
        let err = SurveyProcessor::derive_sample_fields(&mut df, "code").unwrap_err();
        assert!(matches!(err, ProcessorError::MissingColumn(c) if c == "code"));
    }

    #[test]
    fn pairs_columns_by_element_prefix() {
        let columns: Vec<String> = [
            "info",
            "Pb Concentration",
            "Pb Error1s",
            "Zn Concentration",
            "Cu Error1s",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let pairs = SurveyProcessor::pair_element_columns(&columns, &ColumnNaming::default());
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].element, "Pb");
        assert_eq!(pairs[0].error.as_deref(), Some("Pb Error1s"));
        assert_eq!(pairs[1].element, "Zn");
        assert_eq!(pairs[1].error, None);
    }

    #[test]
    fn empty_value_suffix_requires_error_partner() {
        let columns: Vec<String> = ["info", "Units", "Pb", "Pb +/-", "Fe"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let naming = ColumnNaming {
            value_suffix: String::new(),
            error_suffix: " +/-".to_string(),
        };

        let pairs = SurveyProcessor::pair_element_columns(&columns, &naming);
        assert_eq!(
            pairs,
            vec![ElementColumns {
                element: "Pb".to_string(),
                value: "Pb".to_string(),
                error: Some("Pb +/-".to_string()),
            }]
        );
    }

    #[test]
    fn prepare_coerces_selects_and_sorts() {
        let naming = ColumnNaming::default();
        let sort_by = vec![
            SITE_COL.to_string(),
            COORDINATE_COL.to_string(),
            DEPTH_COL.to_string(),
        ];
        let layout = SurveyLayout {
            info_col: "info",
            units_col: "Units",
            naming: &naming,
            sort_by: &sort_by,
        };

        let prepared = SurveyProcessor::prepare(survey(), &layout).unwrap();
        let df = &prepared.df;

        assert!(df.column("Instrument").is_err());
        assert_eq!(df.column("Pb Concentration").unwrap().dtype(), &DataType::Float64);

        let labels: Vec<String> = strings(df, "info").into_iter().flatten().collect();
        assert_eq!(labels, vec!["A_2_0-10", "A_2_10-20", "A_10_0-10", "B_1_0-10"]);

        let pb = SurveyProcessor::float_values(df, "Pb Concentration").unwrap();
        assert_eq!(pb, vec![Some(120.0), Some(38.5), None, Some(450.0)]);
    }

    #[test]
    fn prepare_without_elements_fails() {
        let df = df!("info" => ["A_1_0-10"], "Note" => ["x"]).unwrap();
        let naming = ColumnNaming::default();
        let layout = SurveyLayout {
            info_col: "info",
            units_col: "Units",
            naming: &naming,
            sort_by: &[],
        };
        let err = SurveyProcessor::prepare(df, &layout).unwrap_err();
        assert!(matches!(err, ProcessorError::NoElementColumns(_)));
    }

    #[test]
    fn sort_puts_missing_keys_last() {
        let df = df!("info" => ["x", "y", "z"], "site" => [None, Some("B"), Some("A")]).unwrap();
        let sorted = SurveyProcessor::sort_samples(&df, &[SITE_COL.to_string()]).unwrap();
        let labels: Vec<String> = strings(&sorted, "info").into_iter().flatten().collect();
        assert_eq!(labels, vec!["z", "y", "x"]);
    }

    #[test]
    fn element_series_carries_units_and_errors() {
        let mut df = survey();
        SurveyProcessor::derive_sample_fields(&mut df, "info").unwrap();
        let pairs = vec![ElementColumns {
            element: "As".to_string(),
            value: "As Concentration".to_string(),
            error: Some("As Error1s".to_string()),
        }];
        SurveyProcessor::coerce_numeric(&mut df, &pairs).unwrap();

        let series =
            SurveyProcessor::element_series(&df, &pairs[0], "info", "Units", "mg/kg").unwrap();
        assert_eq!(series.element, "As");
        assert_eq!(series.units, "ppm");
        assert_eq!(series.samples.len(), 4);
        assert_eq!(series.samples[0].value, Some(8.1));
        assert_eq!(series.samples[0].error, Some(1.1));
        assert_eq!(series.samples[1].value, None);
        assert_eq!(series.values(), vec![8.1]);
        assert_eq!(series.sites(), vec!["B", "A"]);
        assert!(series.has_values());
    }

    #[test]
    fn element_series_falls_back_to_default_units() {
        let mut df = df!("info" => ["A_1_0-5"], "Cu Concentration" => [22.0]).unwrap();
        SurveyProcessor::derive_sample_fields(&mut df, "info").unwrap();
        let pair = ElementColumns {
            element: "Cu".to_string(),
            value: "Cu Concentration".to_string(),
            error: None,
        };
        let series = SurveyProcessor::element_series(&df, &pair, "info", "Units", "ppm").unwrap();
        assert_eq!(series.units, "ppm");
        assert_eq!(series.samples[0].error, None);
    }
}
