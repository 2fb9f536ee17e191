//! Data module - CSV loading and processing

mod loader;
mod processor;
mod sample;

pub use loader::SurveyLoader;
pub use processor::{
    ColumnNaming, ElementSeries, SamplePoint, SurveyLayout, SurveyProcessor,
    COORDINATE_COL, DEPTH_COL, SITE_COL,
};
