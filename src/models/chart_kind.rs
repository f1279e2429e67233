//! Supported chart kinds

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::utils::ChartError;

/// The chart kinds the drawing backend knows how to paint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Line,
    Bar,
    Scatter,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
            ChartKind::Scatter => "scatter",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "line" => Ok(ChartKind::Line),
            "bar" => Ok(ChartKind::Bar),
            "scatter" => Ok(ChartKind::Scatter),
            _ => Err(ChartError::UnsupportedChartType(s.to_string())),
        }
    }
}
