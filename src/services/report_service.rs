use std::collections::BTreeMap;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use crate::config::AppConfig;
use crate::models::{ChartConfig, DisplayPrices, PlatformPrices, PriceSeries, PriceTrend, ReportResult};
use crate::services::canvas_service::{Canvas, Document};
use crate::services::chart_service::{ChartBackend, ChartRenderer};
use crate::services::plot_service::{self, PlottersBackend};
use crate::utils::ChartError;

const REPORT_TEMPLATE: &str = include_str!("../../templates/report.html");
const PRICE_UNIT: &str = "元/万银";
const MISSING: &str = "N/A";

/// A rendered report, ready to be written out
#[derive(Debug)]
pub struct ReportPage {
    pub html: String,
    pub display_json: String,
    pub charts: usize,
}

/// Read the number at the start of a price string such as `"12.345 元/万银"`
pub fn parse_leading_price(text: &str) -> Result<f64, ChartError> {
    text.split_whitespace()
        .next()
        .and_then(|token| token.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .ok_or_else(|| ChartError::InvalidPrice(text.to_string()))
}

pub fn format_price(value: f64) -> String {
    format!("{:.3} {}", value, PRICE_UNIT)
}

/// Prices shown on a platform card: the current average and the lowest
/// price of today, yesterday and the day before
pub fn display_prices(prices: &PlatformPrices) -> Result<DisplayPrices, ChartError> {
    let current_avg = parse_leading_price(&prices.current_avg)?;
    let day = |i: usize| {
        prices
            .trend
            .lowest_prices
            .get(i)
            .map(|&v| format_price(v))
            .unwrap_or_else(|| MISSING.to_string())
    };

    Ok(DisplayPrices {
        current_avg: format_price(current_avg),
        today_lowest: day(0),
        yesterday_lowest: day(1),
        pre_yesterday_lowest: day(2),
    })
}

/// Chart series for a trend, oldest point first.
///
/// Uses the recorded timestamps when there is one per price, otherwise
/// places the prices one day apart ending at `now`.
pub fn trend_series(trend: &PriceTrend, now: DateTime<Utc>) -> Result<PriceSeries, ChartError> {
    let values: Vec<f64> = trend.lowest_prices.iter().rev().copied().collect();

    if !trend.timestamps.is_empty() && trend.timestamps.len() == values.len() {
        let timestamps: Vec<i64> = trend.timestamps.iter().rev().copied().collect();
        return PriceSeries::from_parallel(&timestamps, &values);
    }
    if !trend.timestamps.is_empty() {
        warn!(
            "Ignoring {} timestamps for {} prices",
            trend.timestamps.len(),
            values.len()
        );
    }

    let last = values.len() as i64 - 1;
    let timestamps: Vec<i64> = (0..values.len() as i64)
        .map(|i| (now - Duration::days(last - i)).timestamp_millis())
        .collect();
    PriceSeries::from_parallel(&timestamps, &values)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON safe to place inside a `<script>` element
fn script_json<T: serde::Serialize>(value: &T) -> Result<String, ChartError> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

fn canvas_id_for(platform: &str) -> String {
    format!("chart-{}", platform)
}

fn render_card(
    platform: &str,
    prices: &DisplayPrices,
    chart: Option<(&ChartConfig, &[u8])>,
) -> Result<String, ChartError> {
    let name = escape_html(platform);
    let mut card = format!(
        "<section class=\"platform-card\">\n  <h2>{}</h2>\n  <ul>\n\
         \x20   <li><span>当前均价</span><b>{}</b></li>\n\
         \x20   <li><span>今日最低</span><b>{}</b></li>\n\
         \x20   <li><span>昨日最低</span><b>{}</b></li>\n\
         \x20   <li><span>前日最低</span><b>{}</b></li>\n  </ul>\n",
        name,
        escape_html(&prices.current_avg),
        escape_html(&prices.today_lowest),
        escape_html(&prices.yesterday_lowest),
        escape_html(&prices.pre_yesterday_lowest),
    );

    if let Some((config, png)) = chart {
        card.push_str(&format!(
            "  <img alt=\"{} trend\" src=\"data:image/png;base64,{}\">\n",
            name,
            BASE64.encode(png)
        ));
        card.push_str(&format!(
            "  <script type=\"application/json\" class=\"chart-config\">{}</script>\n",
            script_json(config)?
        ));
    }

    card.push_str("</section>\n");
    Ok(card)
}

/// Build the report page with a caller supplied backend and PNG encoder.
///
/// Each platform's chart is encoded straight from its canvas and then
/// destroyed.
pub fn build_report_with<B, F>(
    platforms: &BTreeMap<String, PlatformPrices>,
    config: &AppConfig,
    now: DateTime<Utc>,
    backend: B,
    encode_png: F,
) -> Result<ReportPage, ChartError>
where
    B: ChartBackend,
    F: Fn(&Canvas) -> Result<Vec<u8>, ChartError>,
{
    let mut renderer = ChartRenderer::new(backend, config.label_offset);
    let mut document = Document::new();
    let mut display = BTreeMap::new();
    let mut cards = String::new();
    let mut charts = 0;

    for (platform, prices) in platforms {
        let shown = display_prices(prices)?;
        let canvas_id = canvas_id_for(platform);
        document.add_canvas(&canvas_id, config.canvas_width, config.canvas_height);

        let series = trend_series(&prices.trend, now)?;
        let png = match renderer.render(&mut document, &canvas_id, Some(&series), None)? {
            Some(_) => {
                let chart_config = renderer.instance(&canvas_id).map(|i| i.config.clone());
                let canvas = document
                    .canvas(&canvas_id)
                    .ok_or_else(|| ChartError::CanvasNotFound(canvas_id.clone()))?;
                let encoded = encode_png(canvas)?;
                renderer.destroy(&mut document, &canvas_id);
                chart_config.map(|c| (c, encoded))
            }
            None => {
                warn!("No trend data for {}, card has no chart", platform);
                None
            }
        };
        if png.is_some() {
            charts += 1;
        }

        cards.push_str(&render_card(
            platform,
            &shown,
            png.as_ref().map(|(c, bytes)| (c, bytes.as_slice())),
        )?);
        debug!("Built card for {}", platform);
        display.insert(platform.clone(), shown);
    }

    let display_json = serde_json::to_string_pretty(&display)?;
    let generated_at = now
        .with_timezone(&config.label_offset)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();

    let html = REPORT_TEMPLATE
        .replace("{cards}", &cards)
        .replace("{generated_at}", &generated_at)
        .replace("{prices_json}", &script_json(&display)?);

    Ok(ReportPage {
        html,
        display_json,
        charts,
    })
}

/// Build the report page, rasterizing charts with plotters
pub fn build_report(
    platforms: &BTreeMap<String, PlatformPrices>,
    config: &AppConfig,
    now: DateTime<Utc>,
) -> Result<ReportPage, ChartError> {
    build_report_with(platforms, config, now, PlottersBackend, plot_service::encode_png)
}

/// Render the report and write `report.html` and `to_html.json` into the
/// configured output directory
pub async fn write_report(
    platforms: BTreeMap<String, PlatformPrices>,
    config: AppConfig,
) -> Result<ReportResult, ChartError> {
    let platform_count = platforms.len();
    let output_dir = config.output_dir.clone();

    let page = tokio::task::spawn_blocking(move || build_report(&platforms, &config, Utc::now()))
        .await
        .map_err(|e| ChartError::Drawing(format!("report task failed: {}", e)))??;

    tokio::fs::create_dir_all(&output_dir).await?;
    let html_path = output_dir.join("report.html");
    let json_path = output_dir.join("to_html.json");
    tokio::fs::write(&html_path, page.html.as_bytes()).await?;
    tokio::fs::write(&json_path, page.display_json.as_bytes()).await?;

    info!("📝 Report written to {:?} ({} charts)", html_path, page.charts);

    Ok(ReportResult {
        html_path,
        json_path,
        platforms: platform_count,
        charts: page.charts,
    })
}
