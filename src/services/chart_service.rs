use chrono::{DateTime, FixedOffset, Utc};
use tracing::{debug, info};
use uuid::Uuid;
use crate::models::{
    AxisOptions, ChartConfig, ChartData, ChartKind, ChartOptions, Dataset, GridOptions,
    LegendOptions, PluginOptions, PriceSeries, Scales,
};
use crate::services::canvas_service::{Canvas, ChartInstance, ChartRegistry, Document};
use crate::utils::ChartError;

pub const DATASET_LABEL: &str = "最低价趋势";
pub const BORDER_COLOR: &str = "#3e95cd";
pub const BACKGROUND_COLOR: &str = "rgba(62, 149, 205, 0.2)";
pub const Y_GRID_COLOR: &str = "#eee";
pub const LINE_TENSION: f64 = 0.4;

/// Something that can paint a chart configuration onto a canvas
pub trait ChartBackend {
    fn draw(&mut self, canvas: &mut Canvas, config: &ChartConfig) -> Result<(), ChartError>;

    /// Release whatever a previous `draw` left on the canvas
    fn clear(&mut self, canvas: &mut Canvas) {
        canvas.clear();
    }
}

/// Format a timestamp as a 24-hour `HH:MM:SS` label in the given offset
pub fn format_time_label(timestamp: &DateTime<Utc>, offset: &FixedOffset) -> String {
    timestamp.with_timezone(offset).format("%H:%M:%S").to_string()
}

/// Build the chart configuration for a price series
pub fn build_chart_config(series: &PriceSeries, kind: ChartKind, offset: &FixedOffset) -> ChartConfig {
    let labels: Vec<String> = series
        .points()
        .iter()
        .map(|p| format_time_label(&p.timestamp, offset))
        .collect();

    debug!("Built {} labels for {} chart", labels.len(), kind);

    ChartConfig {
        kind,
        data: ChartData {
            labels,
            datasets: vec![Dataset {
                label: DATASET_LABEL.to_string(),
                data: series.values(),
                border_color: BORDER_COLOR.to_string(),
                background_color: BACKGROUND_COLOR.to_string(),
                fill: true,
                tension: LINE_TENSION,
            }],
        },
        options: ChartOptions {
            responsive: true,
            plugins: PluginOptions {
                legend: LegendOptions { display: false },
            },
            scales: Scales {
                y: AxisOptions {
                    begin_at_zero: Some(false),
                    grid: GridOptions {
                        color: Some(Y_GRID_COLOR.to_string()),
                        display: None,
                    },
                },
                x: AxisOptions {
                    begin_at_zero: None,
                    grid: GridOptions {
                        color: None,
                        display: Some(false),
                    },
                },
            },
        },
    }
}

/// Renders price series into canvases and owns the resulting chart instances
pub struct ChartRenderer<B: ChartBackend> {
    backend: B,
    registry: ChartRegistry,
    label_offset: FixedOffset,
}

impl<B: ChartBackend> ChartRenderer<B> {
    pub fn new(backend: B, label_offset: FixedOffset) -> Self {
        ChartRenderer {
            backend,
            registry: ChartRegistry::new(),
            label_offset,
        }
    }

    /// Render `series` into the canvas `canvas_id`.
    ///
    /// Returns `Ok(None)` without touching the canvas when the series is
    /// missing or empty. A chart already bound to the canvas is destroyed
    /// before the new one is drawn. `kind` defaults to a line chart.
    pub fn render(
        &mut self,
        document: &mut Document,
        canvas_id: &str,
        series: Option<&PriceSeries>,
        kind: Option<ChartKind>,
    ) -> Result<Option<Uuid>, ChartError> {
        let canvas = document.context_mut(canvas_id)?;

        let series = match series {
            Some(s) if !s.is_empty() => s,
            _ => {
                debug!("No data for canvas {}, skipping render", canvas_id);
                return Ok(None);
            }
        };

        let config = build_chart_config(series, kind.unwrap_or_default(), &self.label_offset);

        if let Some(previous) = self.registry.remove(canvas_id) {
            debug!("Destroying chart {} before redrawing canvas {}", previous.id, canvas_id);
            self.backend.clear(canvas);
        }

        self.backend.draw(canvas, &config)?;

        let instance = ChartInstance::new(canvas_id, config);
        let id = instance.id;
        info!("📈 Rendered {} chart {} on canvas {} ({} points)", instance.config.kind, id, canvas_id, series.len());
        self.registry.insert(instance);

        Ok(Some(id))
    }

    /// Destroy the chart bound to `canvas_id`, if any
    pub fn destroy(&mut self, document: &mut Document, canvas_id: &str) -> bool {
        match self.registry.remove(canvas_id) {
            Some(instance) => {
                if let Ok(canvas) = document.context_mut(canvas_id) {
                    self.backend.clear(canvas);
                }
                debug!("Destroyed chart {} on canvas {}", instance.id, canvas_id);
                true
            }
            None => false,
        }
    }

    pub fn instance(&self, canvas_id: &str) -> Option<&ChartInstance> {
        self.registry.get(canvas_id)
    }

    #[cfg(test)]
    pub fn chart_count(&self) -> usize {
        self.registry.len()
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingBackend {
        drawn: Vec<ChartConfig>,
        clears: usize,
        fail: bool,
    }

    impl ChartBackend for RecordingBackend {
        fn draw(&mut self, canvas: &mut Canvas, config: &ChartConfig) -> Result<(), ChartError> {
            if self.fail {
                return Err(ChartError::Drawing("backend refused".to_string()));
            }
            canvas.pixels[0] = 0;
            self.drawn.push(config.clone());
            Ok(())
        }

        fn clear(&mut self, canvas: &mut Canvas) {
            self.clears += 1;
            canvas.clear();
        }
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn setup() -> (ChartRenderer<RecordingBackend>, Document) {
        let mut doc = Document::new();
        doc.add_canvas("chart1", 8, 4);
        (ChartRenderer::new(RecordingBackend::default(), utc()), doc)
    }

    fn is_clock_label(label: &str) -> bool {
        let parts: Vec<&str> = label.split(':').collect();
        parts.len() == 3 && parts.iter().all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_digit()))
    }

    #[test]
    fn test_format_time_label_24_hour() {
        let ts = DateTime::<Utc>::from_timestamp(15 * 3600 + 4 * 60 + 5, 0).unwrap();
        assert_eq!(format_time_label(&ts, &utc()), "15:04:05");
        let shanghai = FixedOffset::east_opt(8 * 3600).unwrap();
        assert_eq!(format_time_label(&ts, &shanghai), "23:04:05");
    }

    #[test]
    fn test_build_config_example() {
        let series = PriceSeries::from_parallel(
            &[1_700_000_000_000, 1_700_000_060_000, 1_700_000_120_000],
            &[100.0, 105.0, 98.0],
        )
        .unwrap();
        let config = build_chart_config(&series, ChartKind::default(), &utc());

        assert_eq!(config.kind, ChartKind::Line);
        assert_eq!(config.data.labels.len(), 3);
        assert!(config.data.labels.iter().all(|l| is_clock_label(l)));
        let dataset = config.primary_dataset().unwrap();
        assert_eq!(dataset.data, vec![100.0, 105.0, 98.0]);
        assert!(dataset.fill);
        assert_eq!(dataset.tension, 0.4);
        assert!(!config.options.plugins.legend.display);
        assert!(!config.options.scales.y.begins_at_zero());
        assert!(!config.options.scales.x.grid.is_visible());
    }

    #[test]
    fn test_config_json_shape() {
        let series = PriceSeries::from_parallel(&[0, 1_000, 2_000], &[100.0, 105.0, 98.0]).unwrap();
        let config = build_chart_config(&series, ChartKind::Line, &utc());
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["type"], "line");
        assert_eq!(json["data"]["labels"].as_array().unwrap().len(), 3);
        assert_eq!(json["data"]["labels"][1], "00:00:01");
        assert_eq!(json["data"]["datasets"][0]["data"], serde_json::json!([100.0, 105.0, 98.0]));
        assert_eq!(json["data"]["datasets"][0]["label"], "最低价趋势");
        assert_eq!(json["data"]["datasets"][0]["borderColor"], "#3e95cd");
        assert_eq!(json["data"]["datasets"][0]["backgroundColor"], "rgba(62, 149, 205, 0.2)");
        assert_eq!(json["options"]["responsive"], true);
        assert_eq!(json["options"]["plugins"]["legend"]["display"], false);
        assert_eq!(json["options"]["scales"]["y"]["beginAtZero"], false);
        assert_eq!(json["options"]["scales"]["y"]["grid"]["color"], "#eee");
        assert_eq!(json["options"]["scales"]["x"]["grid"]["display"], false);
    }

    #[test]
    fn test_render_empty_or_missing_is_noop() {
        let (mut renderer, mut doc) = setup();
        let empty = PriceSeries::default();

        assert_eq!(renderer.render(&mut doc, "chart1", Some(&empty), None).unwrap(), None);
        assert_eq!(renderer.render(&mut doc, "chart1", None, None).unwrap(), None);
        assert!(renderer.backend().drawn.is_empty());
        assert_eq!(renderer.chart_count(), 0);
        assert!(doc.canvas("chart1").unwrap().is_blank());
    }

    #[test]
    fn test_render_missing_canvas() {
        let (mut renderer, mut doc) = setup();
        let series = PriceSeries::from_parallel(&[0], &[1.0]).unwrap();
        let err = renderer.render(&mut doc, "missing", Some(&series), None).unwrap_err();
        assert!(matches!(err, ChartError::CanvasNotFound(_)));
        assert!(renderer.backend().drawn.is_empty());
    }

    #[test]
    fn test_render_defaults_to_line_and_registers() {
        let (mut renderer, mut doc) = setup();
        let series = PriceSeries::from_parallel(&[0, 1_000, 2_000], &[100.0, 105.0, 98.0]).unwrap();

        let id = renderer.render(&mut doc, "chart1", Some(&series), None).unwrap().unwrap();
        let instance = renderer.instance("chart1").unwrap();
        assert_eq!(instance.id, id);
        assert_eq!(instance.config.kind, ChartKind::Line);
        assert_eq!(renderer.backend().drawn.len(), 1);
        assert!(!doc.canvas("chart1").unwrap().is_blank());
    }

    #[test]
    fn test_rerender_replaces_previous_instance() {
        let (mut renderer, mut doc) = setup();
        let series = PriceSeries::from_parallel(&[0, 1_000], &[1.0, 2.0]).unwrap();

        let first = renderer.render(&mut doc, "chart1", Some(&series), None).unwrap().unwrap();
        let second = renderer
            .render(&mut doc, "chart1", Some(&series), Some(ChartKind::Bar))
            .unwrap()
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(renderer.chart_count(), 1);
        assert_eq!(renderer.backend().clears, 1);
        assert_eq!(renderer.instance("chart1").unwrap().config.kind, ChartKind::Bar);
    }

    #[test]
    fn test_failed_draw_does_not_register() {
        let mut doc = Document::new();
        doc.add_canvas("chart1", 8, 4);
        let backend = RecordingBackend { fail: true, ..Default::default() };
        let mut renderer = ChartRenderer::new(backend, utc());
        let series = PriceSeries::from_parallel(&[0], &[1.0]).unwrap();

        assert!(matches!(
            renderer.render(&mut doc, "chart1", Some(&series), None),
            Err(ChartError::Drawing(_))
        ));
        assert_eq!(renderer.chart_count(), 0);
    }

    #[test]
    fn test_destroy() {
        let (mut renderer, mut doc) = setup();
        let series = PriceSeries::from_parallel(&[0], &[1.0]).unwrap();
        renderer.render(&mut doc, "chart1", Some(&series), None).unwrap();

        assert!(renderer.destroy(&mut doc, "chart1"));
        assert!(!renderer.destroy(&mut doc, "chart1"));
        assert!(doc.canvas("chart1").unwrap().is_blank());
        assert_eq!(renderer.chart_count(), 0);
    }
}
