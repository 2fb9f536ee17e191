//! Survey Pipeline
//! load → derive → coerce → sort → statistics → one chart per element.

use crate::charts::{ChartJob, ElementChartRenderer};
use crate::config::SurveyConfig;
use crate::data::{ElementSeries, SurveyLayout, SurveyLoader, SurveyProcessor};
use crate::limits::EpaLimits;
use crate::report::{ReportWriter, CLEANED_FILE, SUMMARY_FILE};
use crate::stats::StatsCalculator;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// What a run produced.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub rows: usize,
    pub elements: usize,
    pub charts_written: Vec<PathBuf>,
    /// Element and error message of every chart that failed.
    pub failures: Vec<(String, String)>,
    /// Element and number of samples above its limit.
    pub exceedances: Vec<(String, usize)>,
    pub preview: Option<String>,
}

/// Run the whole survey. `preview_rows` asks for a console preview of the prepared table.
pub fn run(config: &SurveyConfig, preview_rows: Option<usize>) -> Result<RunSummary> {
    config.validate()?;
    let input = config
        .input
        .as_deref()
        .context("No input file given")?;

    let mut loader = SurveyLoader::new(config.separator_byte());
    loader
        .load_csv(input)
        .with_context(|| format!("loading {}", input.display()))?;
    log::debug!(
        "{}: {} rows, columns {:?}, numeric {:?}",
        loader.get_file_path().map(|p| p.display().to_string()).unwrap_or_default(),
        loader.get_row_count(),
        loader.get_columns(),
        loader.get_numeric_columns()
    );
    let df = loader
        .into_dataframe()
        .context("loader returned no data")?;

    let naming = config.naming();
    let layout = SurveyLayout {
        info_col: &config.info_column,
        units_col: &config.units_column,
        naming: &naming,
        sort_by: &config.sort_by,
    };
    let mut prepared = SurveyProcessor::prepare(df, &layout).context("preparing survey table")?;

    let mut series: Vec<ElementSeries> = Vec::with_capacity(prepared.elements.len());
    for element in &prepared.elements {
        let s = SurveyProcessor::element_series(
            &prepared.df,
            element,
            &config.info_column,
            &config.units_column,
            &config.default_units,
        )?;
        if s.has_values() {
            series.push(s);
        } else {
            log::info!("Skipping {}: no numeric values", element.element);
        }
    }

    let limits = if config.show_limits {
        EpaLimits::default().with_overrides(&config.limits)
    } else {
        EpaLimits::empty()
    };
    if limits.is_empty() {
        log::info!("EPA limit lines disabled");
    } else {
        log::debug!("{} EPA limits available", limits.len());
    }

    let stats = StatsCalculator::compute_all_stats_parallel(&series, &limits);
    let exceedances: Vec<(String, usize)> = stats
        .iter()
        .filter(|s| s.has_exceedances())
        .map(|s| (s.element.clone(), s.exceedances))
        .collect();
    for (element, count) in &exceedances {
        log::warn!("{element}: {count} sample(s) above the EPA limit");
    }

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating {}", config.output_dir.display()))?;

    let jobs: Vec<ChartJob<'_>> = series
        .iter()
        .map(|s| ChartJob {
            series: s,
            limit: limits.lookup(&s.element),
        })
        .collect();
    let outcomes =
        ElementChartRenderer::render_all_parallel(&jobs, &config.chart_options(), &config.output_dir);

    let mut summary = RunSummary {
        rows: prepared.df.height(),
        elements: series.len(),
        exceedances,
        ..RunSummary::default()
    };
    for outcome in outcomes {
        match outcome.result {
            Ok(path) => {
                log::info!("Wrote {}", path.display());
                summary.charts_written.push(path);
            }
            Err(e) => {
                log::error!("Chart for {} failed: {e}", outcome.element);
                summary.failures.push((outcome.element, e.to_string()));
            }
        }
    }

    ReportWriter::write_summary_json(&stats, &config.output_dir.join(SUMMARY_FILE))
        .context("writing summary")?;
    ReportWriter::write_cleaned_csv(&mut prepared.df, &config.output_dir.join(CLEANED_FILE))
        .context("writing cleaned table")?;

    summary.preview = preview_rows.map(|rows| ReportWriter::preview(&prepared.df, rows));
    Ok(summary)
}
