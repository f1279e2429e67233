use thiserror::Error;

/// Errors raised while building or drawing a price chart
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Canvas '{0}' not found in document")]
    CanvasNotFound(String),
    #[error("Unsupported chart type: '{0}'. Supported: line, bar, scatter")]
    UnsupportedChartType(String),
    #[error("Series length mismatch: {timestamps} timestamps vs {values} values")]
    SeriesLengthMismatch { timestamps: usize, values: usize },
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("Invalid color: '{0}'")]
    InvalidColor(String),
    #[error("Invalid price: '{0}'")]
    InvalidPrice(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Drawing failed: {0}")]
    Drawing(String),
    #[error("PNG encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChartError {
    /// Short message suitable for showing to the person who ran the command.
    ///
    /// Drawing errors carry the backend's full error chain; only the last
    /// segment is meaningful to a user.
    pub fn user_message(&self) -> String {
        match self {
            ChartError::Drawing(detail) => match detail.rfind(": ") {
                Some(idx) => format!("❌ Drawing failed: {}", detail[idx + 2..].trim()),
                None => format!("❌ Drawing failed: {}", detail),
            },
            other => format!("❌ {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_strips_backend_chain() {
        let err = ChartError::Drawing("Drawing backend error: BitMapBackend: font unavailable".to_string());
        assert_eq!(err.user_message(), "❌ Drawing failed: font unavailable");
    }

    #[test]
    fn test_user_message_plain() {
        let err = ChartError::CanvasNotFound("chart1".to_string());
        assert_eq!(err.user_message(), "❌ Canvas 'chart1' not found in document");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ChartError = io.into();
        assert!(matches!(err, ChartError::Io(_)));
    }
}
