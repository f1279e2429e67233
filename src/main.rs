use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod models;
mod services;
mod utils;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // Initialize tracing
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "price_trend_chart=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("📈 Starting price-trend-chart v{}", env!("CARGO_PKG_VERSION"));

    let config = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(2);
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = commands::handle_args(&config, &args).await {
        error!("Command failed: {}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
