//! Charts module - Chart rendering

mod renderer;

pub use renderer::{ChartFormat, ChartJob, ChartOptions, ElementChartRenderer};
