//! EPA Limit Table
//! Residential soil screening levels used as reference lines on element charts.

use std::collections::BTreeMap;

/// Built-in residential soil screening levels in mg/kg (ppm).
///
/// Values follow the EPA Regional Screening Level tables; lead uses the
/// 400 ppm residential soil hazard standard. Override per survey via config.
const DEFAULT_LIMITS: [(&str, f64); 21] = [
    ("Ag", 390.0),
    ("As", 0.68),
    ("Ba", 15000.0),
    ("Cd", 71.0),
    ("Co", 23.0),
    ("Cr", 0.3),
    ("Cu", 3100.0),
    ("Fe", 55000.0),
    ("Hg", 11.0),
    ("Mn", 1800.0),
    ("Mo", 390.0),
    ("Ni", 1500.0),
    ("Pb", 400.0),
    ("Sb", 31.0),
    ("Se", 390.0),
    ("Sn", 47000.0),
    ("Sr", 47000.0),
    ("Tl", 0.78),
    ("U", 16.0),
    ("V", 390.0),
    ("Zn", 23000.0),
];

/// Element symbol → threshold concentration.
#[derive(Debug, Clone, PartialEq)]
pub struct EpaLimits {
    limits: BTreeMap<String, f64>,
}

impl Default for EpaLimits {
    fn default() -> Self {
        Self {
            limits: DEFAULT_LIMITS
                .iter()
                .map(|(element, limit)| (normalize(element), *limit))
                .collect(),
        }
    }
}

impl EpaLimits {
    /// A table with no limits, for surveys charted without reference lines.
    pub fn empty() -> Self {
        Self {
            limits: BTreeMap::new(),
        }
    }

    /// Replace or extend entries. Negative or non-finite values are skipped.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, f64>) -> Self {
        for (element, &limit) in overrides {
            if !limit.is_finite() || limit < 0.0 {
                log::warn!("Ignoring invalid limit {limit} for {element}");
                continue;
            }
            self.limits.insert(normalize(element), limit);
        }
        self
    }

    /// Best-effort lookup by element symbol, case-insensitive.
    pub fn lookup(&self, element: &str) -> Option<f64> {
        self.limits.get(&normalize(element)).copied()
    }

    pub fn len(&self) -> usize {
        self.limits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }
}

fn normalize(element: &str) -> String {
    element.trim().to_ascii_lowercase()
}
