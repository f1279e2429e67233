//! Price report models

use serde::{Deserialize, Serialize};

/// Price data scraped for one trading platform
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformPrices {
    /// Average price with its unit, e.g. `"12.345 元/万银"`
    pub current_avg: String,
    pub trend: PriceTrend,
}

/// Daily lowest prices, newest first
#[derive(Debug, Clone, Deserialize)]
pub struct PriceTrend {
    pub lowest_prices: Vec<f64>,
    /// Millisecond timestamps parallel to `lowest_prices`, when known
    #[serde(default)]
    pub timestamps: Vec<i64>,
}

/// Formatted prices shown on a platform card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayPrices {
    pub current_avg: String,
    pub today_lowest: String,
    pub yesterday_lowest: String,
    pub pre_yesterday_lowest: String,
}

/// Paths of the files written for a report
#[derive(Debug)]
pub struct ReportResult {
    pub html_path: std::path::PathBuf,
    pub json_path: std::path::PathBuf,
    pub platforms: usize,
    pub charts: usize,
}
