use image::{codecs::png::PngEncoder, ExtendedColorType, ImageEncoder};
use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::debug;
use crate::models::{ChartConfig, ChartKind};
use crate::services::canvas_service::Canvas;
use crate::services::chart_service::ChartBackend;
use crate::utils::ChartError;

/// Size used when a chart is not responsive
const FIXED_SIZE: (u32, u32) = (800, 400);
const SAMPLES_PER_SEGMENT: usize = 12;
const FALLBACK_GRID: RGBAColor = RGBAColor(238, 238, 238, 1.0);

/// Rasterizes chart configurations with plotters
#[derive(Debug, Default, Clone, Copy)]
pub struct PlottersBackend;

impl ChartBackend for PlottersBackend {
    fn draw(&mut self, canvas: &mut Canvas, config: &ChartConfig) -> Result<(), ChartError> {
        debug!("Drawing {} chart on canvas {}", config.kind, canvas.id);
        let size = plot_size(config, canvas.width, canvas.height);
        let root = BitMapBackend::with_buffer(&mut canvas.pixels, (canvas.width, canvas.height))
            .into_drawing_area();
        root.fill(&WHITE).map_err(drawing_err)?;

        let area = root.shrink((0u32, 0u32), size);
        draw_config(&area, config)?;
        area.present().map_err(drawing_err)?;
        Ok(())
    }
}

fn drawing_err<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Drawing(e.to_string())
}

/// Area the chart occupies on a `width` x `height` canvas
pub fn plot_size(config: &ChartConfig, width: u32, height: u32) -> (u32, u32) {
    if config.options.responsive {
        (width, height)
    } else {
        (FIXED_SIZE.0.min(width), FIXED_SIZE.1.min(height))
    }
}

/// Draw `config` onto any plotters drawing area
pub fn draw_config<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    config: &ChartConfig,
) -> Result<(), ChartError> {
    let dataset = match config.primary_dataset() {
        Some(d) if !d.data.is_empty() => d,
        _ => return Ok(()),
    };

    let stroke = parse_css_color(&dataset.border_color)?;
    let fill = parse_css_color(&dataset.background_color)?;
    let y_axis = &config.options.scales.y;
    let x_axis = &config.options.scales.x;
    let grid = match y_axis.grid.color.as_deref() {
        Some(color) => parse_css_color(color)?,
        None => FALLBACK_GRID,
    };

    let (y_min, y_max) = value_range(&dataset.data, y_axis.begins_at_zero());
    let n = dataset.data.len();

    area.fill(&WHITE).map_err(drawing_err)?;

    let mut chart = ChartBuilder::on(area)
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), y_min..y_max)
        .map_err(drawing_err)?;

    let labels = &config.data.labels;
    let x_formatter = |x: &f64| {
        let idx = x.round();
        if (x - idx).abs() > 1e-6 || idx < 0.0 {
            return String::new();
        }
        labels.get(idx as usize).cloned().unwrap_or_default()
    };
    let y_formatter = |y: &f64| format!("{:.3}", y);

    {
        let mut mesh = chart.configure_mesh();
        mesh.x_labels(n.min(8))
            .y_labels(6)
            .x_label_formatter(&x_formatter)
            .y_label_formatter(&y_formatter)
            .light_line_style(ShapeStyle::from(&grid))
            .bold_line_style(ShapeStyle::from(&grid));
        if !x_axis.grid.is_visible() {
            mesh.disable_x_mesh();
        }
        if !y_axis.grid.is_visible() {
            mesh.disable_y_mesh();
        }
        mesh.draw().map_err(drawing_err)?;
    }

    let points: Vec<(f64, f64)> = dataset
        .data
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, &v)| (i as f64, v))
        .collect();

    // Bars and filled areas hang from the bottom of the visible range
    let floor = y_min;
    let legend_color = stroke;
    let legend = move |(x, y): (i32, i32)| PathElement::new(vec![(x, y), (x + 20, y)], legend_color);

    match config.kind {
        ChartKind::Line => {
            let path = smooth_path(&points, dataset.tension, SAMPLES_PER_SEGMENT);
            if dataset.fill {
                chart
                    .draw_series(
                        AreaSeries::new(path, floor, fill.filled()).border_style(stroke.stroke_width(2)),
                    )
                    .map_err(drawing_err)?
                    .label(dataset.label.as_str())
                    .legend(legend);
            } else {
                chart
                    .draw_series(LineSeries::new(path, stroke.stroke_width(2)))
                    .map_err(drawing_err)?
                    .label(dataset.label.as_str())
                    .legend(legend);
            }
        }
        ChartKind::Bar => {
            chart
                .draw_series(points.iter().map(|&(x, v)| {
                    Rectangle::new([(x - 0.35, floor), (x + 0.35, v)], fill.filled())
                }))
                .map_err(drawing_err)?
                .label(dataset.label.as_str())
                .legend(legend);
            chart
                .draw_series(points.iter().map(|&(x, v)| {
                    Rectangle::new([(x - 0.35, floor), (x + 0.35, v)], stroke.stroke_width(1))
                }))
                .map_err(drawing_err)?;
        }
        ChartKind::Scatter => {
            chart
                .draw_series(points.iter().map(|&p| Circle::new(p, 4, stroke.filled())))
                .map_err(drawing_err)?
                .label(dataset.label.as_str())
                .legend(legend);
        }
    }

    if config.options.plugins.legend.display {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(drawing_err)?;
    }

    Ok(())
}

/// Encode the pixels currently on `canvas` as PNG
pub fn encode_png(canvas: &Canvas) -> Result<Vec<u8>, ChartError> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(
        &canvas.pixels,
        canvas.width,
        canvas.height,
        ExtendedColorType::Rgb8,
    )?;
    debug!("Encoded canvas {} ({} bytes)", canvas.id, png.len());
    Ok(png)
}

/// Lower and upper bound of the y axis for `values`, padded by 10%
pub fn value_range(values: &[f64], begin_at_zero: bool) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values.iter().filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if min > max {
        return (0.0, 1.0);
    }
    if begin_at_zero {
        min = min.min(0.0);
        max = max.max(0.0);
    }

    let span = max - min;
    let padding = if span > 0.0 {
        span * 0.1
    } else if max != 0.0 {
        max.abs() * 0.01
    } else {
        1.0
    };

    let lower = if begin_at_zero && min >= 0.0 { 0.0 } else { min - padding };
    (lower, max + padding)
}

/// Smooth a polyline with cubic bezier segments.
///
/// Control points follow the usual charting spline: each point's handles lie
/// along the line joining its neighbours, scaled by `tension` and by the
/// relative length of the adjacent segments. Every input point is kept
/// exactly. Handles are computed on coordinates normalized to the unit box.
pub fn smooth_path(points: &[(f64, f64)], tension: f64, samples: usize) -> Vec<(f64, f64)> {
    if points.len() < 3 || tension <= 0.0 || samples == 0 {
        return points.to_vec();
    }

    let (x0, x1) = bounds(points.iter().map(|p| p.0));
    let (y0, y1) = bounds(points.iter().map(|p| p.1));
    let sx = if x1 > x0 { x1 - x0 } else { 1.0 };
    let sy = if y1 > y0 { y1 - y0 } else { 1.0 };

    let norm: Vec<(f64, f64)> = points.iter().map(|&(x, y)| ((x - x0) / sx, (y - y0) / sy)).collect();

    // (incoming handle, outgoing handle) per point
    let handles: Vec<((f64, f64), (f64, f64))> = (0..norm.len())
        .map(|i| {
            let cur = norm[i];
            let prev = if i == 0 { cur } else { norm[i - 1] };
            let next = if i + 1 == norm.len() { cur } else { norm[i + 1] };

            let d01 = distance(prev, cur);
            let d12 = distance(cur, next);
            let total = d01 + d12;
            let (s01, s12) = if total > 0.0 { (d01 / total, d12 / total) } else { (0.0, 0.0) };
            let fa = tension * s01;
            let fb = tension * s12;
            let (dx, dy) = (next.0 - prev.0, next.1 - prev.1);

            ((cur.0 - fa * dx, cur.1 - fa * dy), (cur.0 + fb * dx, cur.1 + fb * dy))
        })
        .collect();

    let mut path = Vec::with_capacity((points.len() - 1) * samples + 1);
    path.push(points[0]);
    for i in 0..norm.len() - 1 {
        let p0 = norm[i];
        let p1 = handles[i].1;
        let p2 = handles[i + 1].0;
        let p3 = norm[i + 1];
        for step in 1..samples {
            let t = step as f64 / samples as f64;
            let (x, y) = cubic_bezier(p0, p1, p2, p3, t);
            path.push((x0 + x * sx, y0 + y * sy));
        }
        path.push(points[i + 1]);
    }
    path
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt()
}

fn cubic_bezier(p0: (f64, f64), p1: (f64, f64), p2: (f64, f64), p3: (f64, f64), t: f64) -> (f64, f64) {
    let u = 1.0 - t;
    let a = u * u * u;
    let b = 3.0 * u * u * t;
    let c = 3.0 * u * t * t;
    let d = t * t * t;
    (
        a * p0.0 + b * p1.0 + c * p2.0 + d * p3.0,
        a * p0.1 + b * p1.1 + c * p2.1 + d * p3.1,
    )
}

/// Parse `#rgb`, `#rrggbb`, `rgb(r, g, b)` and `rgba(r, g, b, a)` colors
pub fn parse_css_color(input: &str) -> Result<RGBAColor, ChartError> {
    let s = input.trim();
    let invalid = || ChartError::InvalidColor(input.to_string());

    if let Some(hex) = s.strip_prefix('#') {
        let channel = |range: std::ops::Range<usize>| {
            hex.get(range).and_then(|h| u8::from_str_radix(h, 16).ok()).ok_or_else(invalid)
        };
        return match hex.len() {
            3 => Ok(RGBAColor(channel(0..1)? * 17, channel(1..2)? * 17, channel(2..3)? * 17, 1.0)),
            6 => Ok(RGBAColor(channel(0..2)?, channel(2..4)?, channel(4..6)?, 1.0)),
            _ => Err(invalid()),
        };
    }

    let lower = s.to_lowercase();
    let (body, has_alpha) = if let Some(rest) = lower.strip_prefix("rgba(") {
        (rest, true)
    } else if let Some(rest) = lower.strip_prefix("rgb(") {
        (rest, false)
    } else {
        return Err(invalid());
    };
    let body = body.strip_suffix(')').ok_or_else(invalid)?;
    let parts: Vec<&str> = body.split(',').map(|p| p.trim()).collect();
    let expected = if has_alpha { 4 } else { 3 };
    if parts.len() != expected {
        return Err(invalid());
    }

    let channel = |p: &str| p.parse::<u8>().map_err(|_| invalid());
    let alpha = if has_alpha {
        let a: f64 = parts[3].parse().map_err(|_| invalid())?;
        if !(0.0..=1.0).contains(&a) {
            return Err(invalid());
        }
        a
    } else {
        1.0
    };

    Ok(RGBAColor(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?, alpha))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_colors() {
        let c = parse_css_color("#3e95cd").unwrap();
        assert_eq!((c.0, c.1, c.2), (0x3e, 0x95, 0xcd));
        let c = parse_css_color("#eee").unwrap();
        assert_eq!((c.0, c.1, c.2), (238, 238, 238));
        assert!(parse_css_color("#12345").is_err());
        assert!(parse_css_color("#zzzzzz").is_err());
    }

    #[test]
    fn test_parse_rgba_colors() {
        let c = parse_css_color("rgba(62, 149, 205, 0.2)").unwrap();
        assert_eq!((c.0, c.1, c.2), (62, 149, 205));
        assert!((c.3 - 0.2).abs() < 1e-9);
        let c = parse_css_color("rgb(1,2,3)").unwrap();
        assert_eq!((c.0, c.1, c.2, c.3), (1, 2, 3, 1.0));
        assert!(parse_css_color("rgba(1, 2, 3)").is_err());
        assert!(parse_css_color("rgba(1, 2, 3, 2)").is_err());
        assert!(parse_css_color("blue").is_err());
    }

    #[test]
    fn test_value_range_pads_without_zero() {
        let (lo, hi) = value_range(&[100.0, 105.0, 98.0], false);
        assert!((lo - 97.3).abs() < 1e-9);
        assert!((hi - 105.7).abs() < 1e-9);
    }

    #[test]
    fn test_value_range_begin_at_zero() {
        let (lo, hi) = value_range(&[100.0, 110.0], true);
        assert_eq!(lo, 0.0);
        assert!((hi - 121.0).abs() < 1e-9);
    }

    #[test]
    fn test_value_range_degenerate() {
        assert_eq!(value_range(&[], false), (0.0, 1.0));
        assert_eq!(value_range(&[f64::NAN], false), (0.0, 1.0));
        assert_eq!(value_range(&[0.0, 0.0], false), (-1.0, 1.0));
        let (lo, hi) = value_range(&[50.0], false);
        assert!((lo - 49.5).abs() < 1e-9);
        assert!((hi - 50.5).abs() < 1e-9);
    }

    #[test]
    fn test_smooth_path_keeps_input_points() {
        let points = vec![(0.0, 100.0), (1.0, 105.0), (2.0, 98.0), (3.0, 101.0)];
        let path = smooth_path(&points, 0.4, 10);
        assert_eq!(path.len(), 3 * 10 + 1);
        for (i, p) in points.iter().enumerate() {
            assert_eq!(path[i * 10], *p);
        }
    }

    #[test]
    fn test_smooth_path_stays_monotone_in_x() {
        let points = vec![(0.0, 1.0), (1.0, 9.0), (2.0, 2.0)];
        let path = smooth_path(&points, 0.4, 8);
        assert!(path.windows(2).all(|w| w[1].0 >= w[0].0));
    }

    #[test]
    fn test_smooth_path_zero_tension_is_straight() {
        let points = vec![(0.0, 0.0), (1.0, 4.0), (2.0, 0.0)];
        assert_eq!(smooth_path(&points, 0.0, 8), points);
        let two = vec![(0.0, 0.0), (1.0, 1.0)];
        assert_eq!(smooth_path(&two, 0.4, 8), two);
    }

    #[test]
    fn test_plot_size() {
        use crate::models::PriceSeries;
        use crate::services::chart_service::build_chart_config;
        let series = PriceSeries::from_parallel(&[0], &[1.0]).unwrap();
        let mut config = build_chart_config(&series, ChartKind::Line, &chrono::FixedOffset::east_opt(0).unwrap());
        assert_eq!(plot_size(&config, 1200, 300), (1200, 300));
        config.options.responsive = false;
        assert_eq!(plot_size(&config, 1200, 300), (800, 300));
    }

    fn trend_config(kind: ChartKind) -> ChartConfig {
        use crate::models::PriceSeries;
        use crate::services::chart_service::build_chart_config;
        let series = PriceSeries::from_parallel(
            &[1_700_000_000_000, 1_700_000_060_000, 1_700_000_120_000, 1_700_000_180_000],
            &[100.0, 105.0, 98.0, 101.5],
        )
        .unwrap();
        build_chart_config(&series, kind, &chrono::FixedOffset::east_opt(8 * 3600).unwrap())
    }

    #[test]
    fn test_plotters_draws_every_kind() {
        for kind in [ChartKind::Line, ChartKind::Bar, ChartKind::Scatter] {
            let mut canvas = Canvas::new("chart", 320, 200);
            PlottersBackend
                .draw(&mut canvas, &trend_config(kind))
                .unwrap_or_else(|e| panic!("{} chart failed: {}", kind, e));
            assert!(!canvas.is_blank(), "{} chart left the canvas blank", kind);
        }
    }

    #[test]
    fn test_plotters_draws_unfilled_line_with_legend() {
        let mut config = trend_config(ChartKind::Line);
        config.data.datasets[0].fill = false;
        config.options.plugins.legend.display = true;
        config.options.responsive = false;
        let mut canvas = Canvas::new("chart", 900, 300);
        PlottersBackend.draw(&mut canvas, &config).unwrap();
        assert!(!canvas.is_blank());
    }

    #[test]
    fn test_encode_png_matches_canvas() {
        let mut canvas = Canvas::new("chart", 240, 160);
        PlottersBackend.draw(&mut canvas, &trend_config(ChartKind::Line)).unwrap();

        let png = encode_png(&canvas).unwrap();
        assert!(png.starts_with(b"\x89PNG"));

        let decoded = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (240, 160));
        assert_eq!(decoded.into_raw(), canvas.pixels);
    }
}
