//! Data models for price charts and reports
//!
//! Series input, chart configuration, and the result structs returned by
//! the services.

pub mod chart;
pub mod chart_kind;
pub mod chart_config;
pub mod report;

// Re-export commonly used types for convenience
pub use chart::{PriceSeries, SeriesInput};
pub use chart_kind::ChartKind;
pub use chart_config::{
    AxisOptions, ChartConfig, ChartData, ChartOptions, Dataset, GridOptions, LegendOptions,
    PluginOptions, Scales,
};
pub use report::{DisplayPrices, PlatformPrices, PriceTrend, ReportResult};
