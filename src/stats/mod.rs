//! Stats module - Per-element statistics

mod calculator;

pub use calculator::{ElementStats, StatsCalculator};
