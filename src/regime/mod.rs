// Market regime detection module
pub mod trend_filter;

pub use trend_filter::TrendFilter;
