use std::collections::BTreeMap;
use crate::config::AppConfig;
use crate::models::PlatformPrices;
use crate::services::report_service;
use crate::utils::Table;

pub async fn execute(config: &AppConfig, args: &[String]) -> Result<(), String> {
    tracing::info!("📝 Report command called with args: {:?}", args);

    let input = args
        .first()
        .ok_or_else(|| "❌ Usage: `report <platforms.json>`".to_string())?;

    let raw = tokio::fs::read_to_string(input)
        .await
        .map_err(|e| format!("❌ Failed to read {}: {}", input, e))?;
    let platforms: BTreeMap<String, PlatformPrices> = serde_json::from_str(&raw)
        .map_err(|e| format!("❌ Invalid platforms file {}: {}", input, e))?;

    if platforms.is_empty() {
        tracing::warn!("No platform prices in {}", input);
        return Err("❌ No price data found, please try again later.".to_string());
    }
    tracing::info!("Loaded prices for {} platforms", platforms.len());

    let mut table = Table::new(vec!["Platform", "Average", "Today", "Yesterday", "Day before"]);
    for (name, prices) in &platforms {
        let shown = report_service::display_prices(prices).map_err(|e| e.user_message())?;
        table.add_row(vec![
            name.clone(),
            shown.current_avg,
            shown.today_lowest,
            shown.yesterday_lowest,
            shown.pre_yesterday_lowest,
        ]);
    }

    let result = report_service::write_report(platforms, config.clone())
        .await
        .map_err(|e| e.user_message())?;

    print!("{}", table.render());
    println!(
        "✓ Report for {} platforms ({} charts) written to {}",
        result.platforms,
        result.charts,
        result.html_path.display()
    );
    println!("✓ Display prices saved to {}", result.json_path.display());

    Ok(())
}
