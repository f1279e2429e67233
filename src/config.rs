use std::path::PathBuf;
use chrono::FixedOffset;
use tracing::debug;
use crate::utils::ChartError;

const DEFAULT_WIDTH: u32 = 800;
const DEFAULT_HEIGHT: u32 = 400;
/// Largest canvas side accepted from the environment
const MAX_DIMENSION: u32 = 8192;
// Reports were always rendered in Asia/Shanghai time
const DEFAULT_UTC_OFFSET: &str = "+08:00";
const DEFAULT_OUTPUT_DIR: &str = "data/price_checker";

/// Runtime settings, read from the environment (and `.env`)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub label_offset: FixedOffset,
    pub output_dir: PathBuf,
}

impl AppConfig {
    /// Load settings from `PRICE_CHART_*` environment variables
    pub fn from_env() -> Result<Self, ChartError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ChartError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let canvas_width = parse_dimension("PRICE_CHART_WIDTH", lookup("PRICE_CHART_WIDTH"), DEFAULT_WIDTH)?;
        let canvas_height = parse_dimension("PRICE_CHART_HEIGHT", lookup("PRICE_CHART_HEIGHT"), DEFAULT_HEIGHT)?;

        let offset_str = lookup("PRICE_CHART_UTC_OFFSET").unwrap_or_else(|| DEFAULT_UTC_OFFSET.to_string());
        let label_offset = offset_str
            .trim()
            .parse::<FixedOffset>()
            .map_err(|e| ChartError::Config(format!("PRICE_CHART_UTC_OFFSET '{}': {}", offset_str, e)))?;

        let output_dir = lookup("PRICE_CHART_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        let config = AppConfig {
            canvas_width,
            canvas_height,
            label_offset,
            output_dir,
        };
        debug!("Loaded config: {:?}", config);
        Ok(config)
    }
}

fn parse_dimension(key: &str, value: Option<String>, default: u32) -> Result<u32, ChartError> {
    match value {
        None => Ok(default),
        Some(raw) => {
            let parsed: u32 = raw
                .trim()
                .parse()
                .map_err(|_| ChartError::Config(format!("{} must be a positive integer, got '{}'", key, raw)))?;
            if parsed == 0 {
                return Err(ChartError::Config(format!("{} must be greater than zero", key)));
            }
            if parsed > MAX_DIMENSION {
                return Err(ChartError::Config(format!(
                    "{} must be at most {}, got {}",
                    key, MAX_DIMENSION, parsed
                )));
            }
            Ok(parsed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[])).expect("defaults should load");
        assert_eq!(config.canvas_width, 800);
        assert_eq!(config.canvas_height, 400);
        assert_eq!(config.label_offset.local_minus_utc(), 8 * 3600);
        assert_eq!(config.output_dir, PathBuf::from("data/price_checker"));
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PRICE_CHART_WIDTH", "1125"),
            ("PRICE_CHART_HEIGHT", "600"),
            ("PRICE_CHART_UTC_OFFSET", "-05:00"),
            ("PRICE_CHART_OUTPUT_DIR", "/tmp/out"),
        ]))
        .expect("overrides should load");
        assert_eq!(config.canvas_width, 1125);
        assert_eq!(config.canvas_height, 600);
        assert_eq!(config.label_offset.local_minus_utc(), -5 * 3600);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            AppConfig::from_lookup(lookup_from(&[("PRICE_CHART_WIDTH", "wide")])),
            Err(ChartError::Config(_))
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup_from(&[("PRICE_CHART_HEIGHT", "0")])),
            Err(ChartError::Config(_))
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup_from(&[("PRICE_CHART_UTC_OFFSET", "shanghai")])),
            Err(ChartError::Config(_))
        ));
    }

    #[test]
    fn test_dimension_cap() {
        assert!(matches!(
            AppConfig::from_lookup(lookup_from(&[
                ("PRICE_CHART_WIDTH", "100000"),
                ("PRICE_CHART_HEIGHT", "100000"),
            ])),
            Err(ChartError::Config(_))
        ));
        let config = AppConfig::from_lookup(lookup_from(&[("PRICE_CHART_WIDTH", "8192")])).unwrap();
        assert_eq!(config.canvas_width, 8192);
    }
}
