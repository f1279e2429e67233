//! Chart configuration consumed by the drawing backend.
//!
//! Field names serialize to the `{ type, data: { labels, datasets }, options }`
//! shape browser charting libraries expect, so a config can be dumped to JSON
//! and replayed client side unchanged.

use serde::{Deserialize, Serialize};
use super::chart_kind::ChartKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub data: ChartData,
    pub options: ChartOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
    pub border_color: String,
    pub background_color: String,
    pub fill: bool,
    /// Bezier curve tension, 0 draws straight segments
    pub tension: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartOptions {
    pub responsive: bool,
    pub plugins: PluginOptions,
    pub scales: Scales,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginOptions {
    pub legend: LegendOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendOptions {
    pub display: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scales {
    pub y: AxisOptions,
    pub x: AxisOptions,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub begin_at_zero: Option<bool>,
    pub grid: GridOptions,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GridOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<bool>,
}

impl GridOptions {
    /// Grid lines are shown unless explicitly disabled
    pub fn is_visible(&self) -> bool {
        self.display.unwrap_or(true)
    }
}

impl AxisOptions {
    pub fn begins_at_zero(&self) -> bool {
        self.begin_at_zero.unwrap_or(false)
    }
}

impl ChartConfig {
    /// The first dataset, which is the only one this crate ever builds
    pub fn primary_dataset(&self) -> Option<&Dataset> {
        self.data.datasets.first()
    }
}
