pub fn execute() -> Result<(), String> {
    println!(
        "📖 price-trend-chart commands\n\n\
         \x20 chart <series.json> [line|bar|scatter] [--legacy]\n\
         \x20     Render a price series to chart.png and chart.json in the output directory.\n\
         \x20     series.json: {{\"timestamps\": [ms, ...], \"values\": [...]}}\n\
         \x20     --legacy reads each value as its own timestamp (values only).\n\n\
         \x20 report <platforms.json>\n\
         \x20     Render report.html and to_html.json for every platform.\n\
         \x20     platforms.json: {{\"<name>\": {{\"current_avg\": \"12.3 元/万银\",\n\
         \x20                     \"trend\": {{\"lowest_prices\": [...]}}}}}}\n\n\
         \x20 help\n\
         \x20     Show this message.\n\n\
         Environment: PRICE_CHART_WIDTH, PRICE_CHART_HEIGHT, PRICE_CHART_UTC_OFFSET, PRICE_CHART_OUTPUT_DIR"
    );
    Ok(())
}
