//! Statistics Calculator Module
//! Descriptive statistics, upper confidence limits and limit exceedances per element.

use crate::data::ElementSeries;
use crate::limits::EpaLimits;
use rayon::prelude::*;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Confidence level of the one-sided upper confidence limit of the mean.
pub const UCL_CONFIDENCE: f64 = 0.95;

/// Descriptive statistics for a set of measured values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub p05: Option<f64>,
    pub p95: Option<f64>,
    pub ucl95: Option<f64>,
}

/// Statistics for one site within an element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteStats {
    pub site: String,
    #[serde(flatten)]
    pub stats: DescriptiveStats,
    pub exceedances: usize,
}

/// Statistics for one element across the survey.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementStats {
    pub element: String,
    pub units: String,
    pub samples: usize,
    #[serde(flatten)]
    pub stats: DescriptiveStats,
    pub limit: Option<f64>,
    pub exceedances: usize,
    pub exceeding_samples: Vec<String>,
    pub sites: Vec<SiteStats>,
}

impl ElementStats {
    /// Whether any sample exceeds the element's limit.
    pub fn has_exceedances(&self) -> bool {
        self.exceedances > 0
    }
}

/// Handles statistical calculations with multi-threading support.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for an array of values.
    pub fn compute_descriptive_stats(values: &[f64]) -> DescriptiveStats {
        let n = values.len();
        if n == 0 {
            return DescriptiveStats::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mean = values.iter().sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };

        let (std, ucl95) = if n > 1 {
            let variance =
                values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            let std = variance.sqrt();
            (Some(std), Self::upper_confidence_limit(mean, std, n))
        } else {
            (None, None)
        };

        DescriptiveStats {
            count: n,
            mean: Some(mean),
            median: Some(median),
            std,
            min: sorted.first().copied(),
            max: sorted.last().copied(),
            p05: Some(Self::percentile(&sorted, 5.0)),
            p95: Some(Self::percentile(&sorted, 95.0)),
            ucl95,
        }
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// One-sided Student's t upper confidence limit of the mean.
    pub fn upper_confidence_limit(mean: f64, std: f64, n: usize) -> Option<f64> {
        if n < 2 {
            return None;
        }
        let dist = StudentsT::new(0.0, 1.0, (n - 1) as f64).ok()?;
        let t = dist.inverse_cdf(UCL_CONFIDENCE);
        Some(mean + t * std / (n as f64).sqrt())
    }

    fn count_exceedances(values: &[f64], limit: Option<f64>) -> usize {
        limit.map_or(0, |limit| values.iter().filter(|&&v| v > limit).count())
    }

    /// Compute statistics for one element, overall and per site.
    pub fn compute_element_stats(series: &ElementSeries, limit: Option<f64>) -> ElementStats {
        let values = series.values();
        let stats = Self::compute_descriptive_stats(&values);

        let exceeding_samples: Vec<String> = match limit {
            Some(limit) => series
                .samples
                .iter()
                .filter(|s| s.value.is_some_and(|v| v > limit))
                .map(|s| s.label.clone())
                .collect(),
            None => Vec::new(),
        };

        let sites = series
            .sites()
            .into_iter()
            .map(|site| {
                let site_values: Vec<f64> = series
                    .samples
                    .iter()
                    .filter(|s| s.site.as_deref() == Some(site.as_str()))
                    .filter_map(|s| s.value)
                    .collect();
                SiteStats {
                    exceedances: Self::count_exceedances(&site_values, limit),
                    stats: Self::compute_descriptive_stats(&site_values),
                    site,
                }
            })
            .collect();

        ElementStats {
            element: series.element.clone(),
            units: series.units.clone(),
            samples: series.samples.len(),
            stats,
            limit,
            exceedances: exceeding_samples.len(),
            exceeding_samples,
            sites,
        }
    }

    /// Compute statistics for all elements in parallel, preserving input order.
    pub fn compute_all_stats_parallel(
        series: &[ElementSeries],
        limits: &EpaLimits,
    ) -> Vec<ElementStats> {
        series
            .par_iter()
            .map(|s| Self::compute_element_stats(s, limits.lookup(&s.element)))
            .collect()
    }
}
