//! Element Chart Renderer
//! Generates one static bar chart per element with plotters.
//!
//! Layout:
//! 1. Title: "{element} concentration" centered
//! 2. One bar per sample in sorted order, coloured by site
//! 3. Vertical ±1σ error bar on every bar that has an error value
//! 4. Horizontal EPA limit line when a limit is known
//! 5. Legend in the upper right: one entry per site plus the limit line

use crate::data::ElementSeries;
use clap::ValueEnum;
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Site colours
pub const PALETTE: [RGBColor; 10] = [
    RGBColor(52, 152, 219),  // Blue
    RGBColor(231, 76, 60),   // Red
    RGBColor(46, 204, 113),  // Green
    RGBColor(155, 89, 182),  // Purple
    RGBColor(243, 156, 18),  // Orange
    RGBColor(26, 188, 156),  // Teal
    RGBColor(233, 30, 99),   // Pink
    RGBColor(0, 188, 212),   // Cyan
    RGBColor(121, 85, 72),   // Brown
    RGBColor(96, 125, 139),  // Blue Grey
];
const NO_SITE_COLOR: RGBColor = RGBColor(160, 160, 160);
const LIMIT_COLOR: RGBColor = RGBColor(192, 0, 0);

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Drawing failed: {0}")]
    Draw(String),
    #[error("Nothing to draw for {0}")]
    Empty(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn draw_err<E: std::error::Error + Send + Sync>(err: DrawingAreaErrorKind<E>) -> RenderError {
    RenderError::Draw(err.to_string())
}

/// Image format of written charts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChartFormat {
    #[default]
    Png,
    Svg,
}

impl ChartFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ChartFormat::Png => "png",
            ChartFormat::Svg => "svg",
        }
    }
}

/// Output size and format.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartOptions {
    pub width: u32,
    pub height: u32,
    pub format: ChartFormat,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 700,
            format: ChartFormat::Png,
        }
    }
}

/// One element to render.
#[derive(Debug, Clone, Copy)]
pub struct ChartJob<'a> {
    pub series: &'a ElementSeries,
    pub limit: Option<f64>,
}

/// Result of rendering one element.
#[derive(Debug)]
pub struct ChartOutcome {
    pub element: String,
    pub result: Result<PathBuf, RenderError>,
}

pub struct ElementChartRenderer;

impl ElementChartRenderer {
    /// Render every job into `out_dir`, one file per element. Failures are kept per element.
    pub fn render_all_parallel(
        jobs: &[ChartJob<'_>],
        options: &ChartOptions,
        out_dir: &Path,
    ) -> Vec<ChartOutcome> {
        let elements: Vec<&str> = jobs.iter().map(|job| job.series.element.as_str()).collect();
        let file_names = Self::unique_file_names(&elements, options.format);

        jobs.par_iter()
            .zip(file_names.par_iter())
            .map(|(job, file_name)| {
                let path = out_dir.join(file_name);
                let result = Self::render(job.series, job.limit, options, &path).map(|_| path);
                ChartOutcome {
                    element: job.series.element.clone(),
                    result,
                }
            })
            .collect()
    }

    /// Render a single element chart to `path`.
    pub fn render(
        series: &ElementSeries,
        limit: Option<f64>,
        options: &ChartOptions,
        path: &Path,
    ) -> Result<(), RenderError> {
        if series.samples.is_empty() {
            return Err(RenderError::Empty(series.element.clone()));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let size = (options.width, options.height);
        match options.format {
            ChartFormat::Png => {
                Self::draw(BitMapBackend::new(path, size).into_drawing_area(), series, limit)
            }
            ChartFormat::Svg => {
                Self::draw(SVGBackend::new(path, size).into_drawing_area(), series, limit)
            }
        }
    }

    fn draw<DB: DrawingBackend>(
        root: DrawingArea<DB, Shift>,
        series: &ElementSeries,
        limit: Option<f64>,
    ) -> Result<(), RenderError> {
        root.fill(&WHITE).map_err(draw_err)?;

        let n = series.samples.len();
        let labels: Vec<&str> = series.samples.iter().map(|s| s.label.as_str()).collect();
        let y_min = Self::y_lower_bound(series);
        let y_max = Self::y_upper_bound(series, limit);

        let mut chart = ChartBuilder::on(&root)
            .caption(format!("{} concentration", series.element), ("sans-serif", 24))
            .margin(15)
            .x_label_area_size(Self::x_label_area(&labels))
            .y_label_area_size(70)
            .build_cartesian_2d((0u32..(n as u32 - 1).max(1)).into_segmented(), y_min..y_max)
            .map_err(draw_err)?;

        let x_formatter = |v: &SegmentValue<u32>| match v {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
                labels.get(*i as usize).map(|l| l.to_string()).unwrap_or_default()
            }
            SegmentValue::Last => String::new(),
        };

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&x_formatter)
            .x_label_style(("sans-serif", 11).into_font().transform(FontTransform::Rotate90))
            .x_desc("Sample")
            .y_desc(format!("Concentration ({})", series.units))
            .axis_desc_style(("sans-serif", 15))
            .draw()
            .map_err(draw_err)?;

        // Bars, one series per site so each gets a legend entry
        let sites = series.sites();
        let mut groups: Vec<(Option<&str>, RGBColor)> = sites
            .iter()
            .enumerate()
            .map(|(idx, site)| (Some(site.as_str()), Self::site_color(idx)))
            .collect();
        if series.samples.iter().any(|s| s.site.is_none()) {
            groups.push((None, NO_SITE_COLOR));
        }

        for (site, color) in groups {
            let bars = series
                .samples
                .iter()
                .enumerate()
                .filter(|(_, s)| s.site.as_deref() == site)
                .filter_map(|(i, s)| s.value.map(|v| (i as u32, v)))
                .map(|(i, v)| {
                    let mut bar = Rectangle::new(
                        [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), v)],
                        color.filled(),
                    );
                    bar.set_margin(0, 0, 3, 3);
                    bar
                });

            let label = match site {
                Some(site) => format!("Site {site}"),
                None => "No site".to_string(),
            };
            chart
                .draw_series(bars)
                .map_err(draw_err)?
                .label(label)
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }

        // ±1σ error bars
        chart
            .draw_series(series.samples.iter().enumerate().filter_map(|(i, s)| {
                let value = s.value?;
                let (low, high) = Self::error_bar_bounds(value, s.error?);
                Some(ErrorBar::new_vertical(
                    SegmentValue::CenterOf(i as u32),
                    low,
                    value,
                    high,
                    BLACK.stroke_width(1),
                    6,
                ))
            }))
            .map_err(draw_err)?;

        if let Some(limit) = limit {
            chart
                .draw_series(LineSeries::new(
                    vec![(SegmentValue::Exact(0), limit), (SegmentValue::Last, limit)],
                    LIMIT_COLOR.stroke_width(2),
                ))
                .map_err(draw_err)?
                .label(format!("EPA limit ({} {})", format_limit(limit), series.units))
                .legend(|(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], LIMIT_COLOR.stroke_width(2))
                });
        }

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.85))
            .border_style(&BLACK)
            .position(SeriesLabelPosition::UpperRight)
            .draw()
            .map_err(draw_err)?;

        root.present().map_err(draw_err)?;
        Ok(())
    }

    /// Top of the y axis: 10% headroom above the highest bar, error bar or limit.
    pub fn y_upper_bound(series: &ElementSeries, limit: Option<f64>) -> f64 {
        let top = series
            .samples
            .iter()
            .filter_map(|s| s.value.map(|v| v + s.error.unwrap_or(0.0).abs()))
            .chain(limit)
            .filter(|v| v.is_finite())
            .fold(0.0_f64, f64::max);

        if top > 0.0 {
            top * 1.1
        } else {
            1.0
        }
    }

    /// Bottom of the y axis: zero, or 10% below the lowest negative reading.
    pub fn y_lower_bound(series: &ElementSeries) -> f64 {
        let bottom = series
            .samples
            .iter()
            .filter_map(|s| s.value)
            .filter(|v| v.is_finite())
            .fold(0.0_f64, f64::min);

        bottom * 1.1
    }

    /// Ends of a ±1σ error bar. The lower end never drops below zero,
    /// or below the value itself for readings under zero.
    pub fn error_bar_bounds(value: f64, error: f64) -> (f64, f64) {
        let error = error.abs();
        ((value - error).max(value.min(0.0)), value + error)
    }

    /// File names for a set of elements, suffixed `_2`, `_3`, ... where sanitizing collides.
    pub fn unique_file_names(elements: &[&str], format: ChartFormat) -> Vec<String> {
        let mut used: HashSet<String> = HashSet::new();
        elements
            .iter()
            .map(|element| {
                let mut name = Self::chart_file_name(element, format);
                let stem = name
                    .strip_suffix(&format!(".{}", format.extension()))
                    .unwrap_or(&name)
                    .to_string();
                let mut n = 2;
                while used.contains(&name) {
                    name = format!("{}_{}.{}", stem, n, format.extension());
                    n += 1;
                }
                if n > 2 {
                    log::warn!("Chart for {element} written as {name} to avoid a name clash");
                }
                used.insert(name.clone());
                name
            })
            .collect()
    }

    /// Get color for a site by its order of appearance.
    pub fn site_color(site_index: usize) -> RGBColor {
        PALETTE[site_index % PALETTE.len()]
    }

    /// File name for an element chart with unsafe characters replaced.
    pub fn chart_file_name(element: &str, format: ChartFormat) -> String {
        let safe_name: String = element
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}.{}", safe_name, format.extension())
    }

    // Rotated labels need room proportional to the longest sample code.
    fn x_label_area(labels: &[&str]) -> u32 {
        let longest = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u32;
        (longest * 7 + 30).clamp(50, 220)
    }
}

/// Format a limit without trailing zeros: `400`, `0.68`.
pub fn format_limit(limit: f64) -> String {
    let formatted = format!("{:.3}", limit);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SamplePoint;

    fn series(points: &[(Option<f64>, Option<f64>)]) -> ElementSeries {
        ElementSeries {
            element: "Pb".to_string(),
            units: "ppm".to_string(),
            samples: points
                .iter()
                .enumerate()
                .map(|(i, &(value, error))| SamplePoint {
                    label: format!("A_{i}_0-10"),
                    site: Some("A".to_string()),
                    value,
                    error,
                })
                .collect(),
        }
    }

    #[test]
    fn y_bound_includes_error_and_limit() {
        let s = series(&[(Some(100.0), Some(10.0)), (Some(50.0), None)]);
        assert!((ElementChartRenderer::y_upper_bound(&s, None) - 121.0).abs() < 1e-9);
        assert!((ElementChartRenderer::y_upper_bound(&s, Some(400.0)) - 440.0).abs() < 1e-9);
    }

    #[test]
    fn y_bound_defaults_when_nothing_measured() {
        let s = series(&[(None, None), (Some(0.0), None)]);
        assert_eq!(ElementChartRenderer::y_upper_bound(&s, None), 1.0);
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(ElementChartRenderer::chart_file_name("Pb", ChartFormat::Png), "Pb.png");
        assert_eq!(
            ElementChartRenderer::chart_file_name("Cr (VI)", ChartFormat::Svg),
            "Cr__VI_.svg"
        );
    }

    #[test]
    fn negative_readings_extend_axis_and_error_bar() {
        let s = series(&[(Some(-2.0), Some(1.0)), (Some(10.0), Some(1.0))]);
        assert!((ElementChartRenderer::y_lower_bound(&s) - -2.2).abs() < 1e-9);
        assert_eq!(ElementChartRenderer::error_bar_bounds(-2.0, 1.0), (-2.0, -1.0));

        let positive = series(&[(Some(3.0), None)]);
        assert_eq!(ElementChartRenderer::y_lower_bound(&positive), 0.0);
        assert_eq!(ElementChartRenderer::error_bar_bounds(3.0, -5.0), (0.0, 8.0));
        assert_eq!(ElementChartRenderer::error_bar_bounds(10.0, 2.0), (8.0, 12.0));
    }

    #[test]
    fn clashing_file_names_get_suffixes() {
        let names = ElementChartRenderer::unique_file_names(
            &["Cr (VI)", "Cr _VI_", "Pb", "Cr-VI", "Cr (VI)"],
            ChartFormat::Svg,
        );
        assert_eq!(
            names,
            vec!["Cr__VI_.svg", "Cr__VI__2.svg", "Pb.svg", "Cr-VI.svg", "Cr__VI__3.svg"]
        );
    }

    #[test]
    fn renders_svg_file() {
        let dir = tempfile::tempdir().unwrap();
        let s = series(&[(Some(120.0), Some(5.0)), (Some(-1.0), Some(2.0)), (None, None)]);
        let options = ChartOptions {
            format: ChartFormat::Svg,
            ..ChartOptions::default()
        };
        let path = dir.path().join("Pb.svg");
        ElementChartRenderer::render(&s, Some(400.0), &options, &path).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Pb concentration"));
    }

    #[test]
    fn site_colors_cycle() {
        assert_eq!(ElementChartRenderer::site_color(0), PALETTE[0]);
        assert_eq!(ElementChartRenderer::site_color(PALETTE.len() + 2), PALETTE[2]);
    }

    #[test]
    fn limits_format_without_trailing_zeros() {
        assert_eq!(format_limit(400.0), "400");
        assert_eq!(format_limit(0.68), "0.68");
        assert_eq!(format_limit(0.3), "0.3");
    }

    #[test]
    fn empty_series_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = ElementChartRenderer::render(
            &series(&[]),
            None,
            &ChartOptions::default(),
            &dir.path().join("Pb.png"),
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::Empty(e) if e == "Pb"));
    }
}
