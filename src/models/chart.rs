//! Chart generation models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::utils::ChartError;

/// A single data point on a price chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

/// Ordered price observations for one chart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

/// Series as it arrives on disk: parallel millisecond timestamps and values.
/// `timestamps` may be omitted for legacy input. Missing or `null` values
/// mean there is nothing to draw.
#[derive(Debug, Clone, Deserialize)]
pub struct SeriesInput {
    #[serde(default)]
    pub timestamps: Vec<i64>,
    #[serde(default)]
    pub values: Option<Vec<f64>>,
}

fn timestamp_from_millis(millis: i64) -> Result<DateTime<Utc>, ChartError> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| ChartError::InvalidTimestamp(millis.to_string()))
}

impl PriceSeries {
    /// Build a series from parallel timestamp (ms since epoch) and value slices
    pub fn from_parallel(timestamps_ms: &[i64], values: &[f64]) -> Result<Self, ChartError> {
        if timestamps_ms.len() != values.len() {
            return Err(ChartError::SeriesLengthMismatch {
                timestamps: timestamps_ms.len(),
                values: values.len(),
            });
        }

        let points = timestamps_ms
            .iter()
            .zip(values)
            .map(|(&ms, &price)| {
                Ok(PricePoint {
                    timestamp: timestamp_from_millis(ms)?,
                    price,
                })
            })
            .collect::<Result<Vec<_>, ChartError>>()?;

        Ok(PriceSeries { points })
    }

    /// Build a series from a bare value list where every value is also read
    /// as its own timestamp in milliseconds.
    ///
    /// Older callers hand over only the price list and expect time labels
    /// derived from it. The labels are meaningless for real prices; prefer
    /// [`PriceSeries::from_parallel`].
    pub fn from_legacy_values(values: &[f64]) -> Result<Self, ChartError> {
        let points = values
            .iter()
            .map(|&price| {
                if !price.is_finite() {
                    return Err(ChartError::InvalidTimestamp(price.to_string()));
                }
                Ok(PricePoint {
                    timestamp: timestamp_from_millis(price.trunc() as i64)?,
                    price,
                })
            })
            .collect::<Result<Vec<_>, ChartError>>()?;

        Ok(PriceSeries { points })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl SeriesInput {
    /// Convert into a series, `None` when no values were given. `legacy`
    /// reads the values as their own timestamps.
    pub fn into_series(self, legacy: bool) -> Result<Option<PriceSeries>, ChartError> {
        let values = match self.values {
            Some(values) => values,
            None => return Ok(None),
        };
        let series = if legacy {
            PriceSeries::from_legacy_values(&values)?
        } else {
            PriceSeries::from_parallel(&self.timestamps, &values)?
        };
        Ok(Some(series))
    }

    pub fn value_count(&self) -> usize {
        self.values.as_ref().map_or(0, Vec::len)
    }
}
