pub mod chart;
pub mod report;
pub mod help;

use crate::config::AppConfig;

/// Dispatch a command line to its handler
pub async fn handle_args(config: &AppConfig, args: &[String]) -> Result<(), String> {
    let command = match args.first() {
        Some(c) => c.as_str(),
        None => return help::execute(),
    };
    let rest = &args[1..];

    match command {
        "chart" | "render" => chart::execute(config, rest).await,
        "report" => report::execute(config, rest).await,
        "help" | "--help" | "-h" => help::execute(),
        other => Err(format!("❌ Unknown command '{}'. Run `help` for usage.", other)),
    }
}
