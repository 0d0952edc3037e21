use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use kalshi_odds_finder::api::{MarketFilter, fetch_cheap_markets, fetch_league_odds};
use kalshi_odds_finder::config::{self, AppConfig, CONFIG_PATH};
use kalshi_odds_finder::engine::find_matches;
use kalshi_odds_finder::reporter;
use kalshi_odds_finder::types::RunSummary;

#[derive(Parser)]
#[command(
    name = "find-opportunities",
    about = "Match cheap Kalshi team-win markets against sportsbook moneylines"
)]
struct Args {
    /// Path to the TOML config file (defaults are used if it is missing)
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// Output JSON file, overrides `settings.output_path`
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();
    let args = Args::parse();

    info!("--- Starting opportunity finder ---");
    let app_config = AppConfig::load_or_default(&args.config);
    let settings = &app_config.settings;
    let output_path = args
        .output
        .unwrap_or_else(|| PathBuf::from(&settings.output_path));

    let api_key = config::odds_api_key();
    if api_key.is_none() {
        warn!(
            "{} not set; sportsbook odds will be skipped",
            kalshi_odds_finder::ODDS_API_KEY_VAR
        );
    }

    let client = reqwest::Client::new();
    let filter = MarketFilter::from_settings(settings);

    let markets = fetch_cheap_markets(&client, &settings.kalshi_api_url, &filter).await;
    let odds = fetch_league_odds(&client, settings, api_key.as_deref()).await;
    let games_considered: usize = odds.values().map(Vec::len).sum();

    let records = find_matches(&markets, &odds, &settings.kalshi_web_url);
    let highlighted = reporter::report_highlights(&records, &settings.highlight);

    reporter::write_records(&output_path, &records)?;
    info!(
        "Process complete. Wrote {} record(s) to {}",
        records.len(),
        output_path.display()
    );

    reporter::report_summary(&RunSummary {
        timestamp: chrono::Utc::now().to_rfc3339(),
        markets_considered: markets.len(),
        leagues_fetched: odds.len(),
        games_considered,
        records_written: records.len(),
        highlighted,
        output_path: output_path.display().to_string(),
    });

    Ok(())
}
