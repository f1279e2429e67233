use crate::config::AppConfig;
use crate::models::{ChartConfig, ChartKind, SeriesInput};
use crate::services::canvas_service::Document;
use crate::services::chart_service::ChartRenderer;
use crate::services::plot_service::{self, PlottersBackend};
use crate::utils::ChartError;

const CANVAS_ID: &str = "chart";

/// Parsed `chart` arguments
#[derive(Debug, PartialEq)]
pub struct ChartArgs {
    pub input: String,
    pub kind: Option<ChartKind>,
    pub legacy: bool,
}

pub fn parse_args(args: &[String]) -> Result<ChartArgs, String> {
    let mut input = None;
    let mut kind = None;
    let mut legacy = false;

    for arg in args {
        if arg == "--legacy" {
            legacy = true;
        } else if input.is_none() {
            input = Some(arg.clone());
        } else if kind.is_none() {
            kind = Some(arg.parse::<ChartKind>().map_err(|e| e.user_message())?);
        } else {
            return Err(format!("❌ Unexpected argument: '{}'", arg));
        }
    }

    let input = input.ok_or_else(|| {
        "❌ Usage: `chart <series.json> [line|bar|scatter] [--legacy]`".to_string()
    })?;

    Ok(ChartArgs { input, kind, legacy })
}

/// Render the series file into one canvas and encode what was drawn.
/// `Ok(None)` when the series is missing or empty.
fn render_series(
    input: SeriesInput,
    args: &ChartArgs,
    config: &AppConfig,
) -> Result<Option<(ChartConfig, Vec<u8>)>, ChartError> {
    let series = input.into_series(args.legacy)?;

    let mut document = Document::new();
    document.add_canvas(CANVAS_ID, config.canvas_width, config.canvas_height);
    let mut renderer = ChartRenderer::new(PlottersBackend, config.label_offset);

    if renderer.render(&mut document, CANVAS_ID, series.as_ref(), args.kind)?.is_none() {
        return Ok(None);
    }

    let chart_config = match renderer.instance(CANVAS_ID) {
        Some(instance) => instance.config.clone(),
        None => return Ok(None),
    };
    let canvas = document
        .canvas(CANVAS_ID)
        .ok_or_else(|| ChartError::CanvasNotFound(CANVAS_ID.to_string()))?;
    let png = plot_service::encode_png(canvas)?;

    Ok(Some((chart_config, png)))
}

pub async fn execute(config: &AppConfig, args: &[String]) -> Result<(), String> {
    tracing::info!("🎨 Chart command called with args: {:?}", args);
    let args = parse_args(args)?;

    let raw = tokio::fs::read_to_string(&args.input)
        .await
        .map_err(|e| format!("❌ Failed to read {}: {}", args.input, e))?;
    let input: SeriesInput = serde_json::from_str(&raw)
        .map_err(|e| format!("❌ Invalid series file {}: {}", args.input, e))?;
    tracing::info!("Loaded {} values from {}", input.value_count(), args.input);

    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|e| format!("❌ Failed to create {:?}: {}", config.output_dir, e))?;

    let render_config = config.clone();
    let rendered = tokio::task::spawn_blocking(move || {
        render_series(input, &args, &render_config).map_err(|e| e.user_message())
    })
    .await
    .map_err(|e| format!("❌ Chart task failed: {}", e))??;

    let (chart_config, png) = match rendered {
        Some(r) => r,
        None => {
            tracing::warn!("Series is empty, nothing rendered");
            println!("Series is empty, nothing rendered.");
            return Ok(());
        }
    };

    let png_path = config.output_dir.join("chart.png");
    tokio::fs::write(&png_path, &png)
        .await
        .map_err(|e| format!("❌ Failed to write {:?}: {}", png_path, e))?;

    let json_path = config.output_dir.join("chart.json");
    let json = serde_json::to_string_pretty(&chart_config).map_err(|e| e.to_string())?;
    tokio::fs::write(&json_path, json)
        .await
        .map_err(|e| format!("❌ Failed to write {:?}: {}", json_path, e))?;

    tracing::info!("✓ Chart written to {:?}", config.output_dir);
    println!(
        "✓ {} chart with {} points written to {}",
        chart_config.kind,
        chart_config.data.labels.len(),
        png_path.display()
    );

    Ok(())
}
