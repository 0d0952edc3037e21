//! Probe: The Odds API moneylines for one league
//!
//! Hits GET https://api.the-odds-api.com/v4/sports/<league>/odds and documents:
//! - Response shape and remaining request quota
//! - Games, bookmakers and h2h prices as parsed by the finder
//! - The converted American moneyline for every quote

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use kalshi_odds_finder::api::parse_games;
use kalshi_odds_finder::engine::decimal_to_moneyline;
use kalshi_odds_finder::{ODDS_API_KEY_VAR, ODDS_API_URL, REQUESTS_REMAINING_HEADER};

#[derive(Parser)]
#[command(name = "probe_odds", about = "Dump parsed moneyline odds for one league")]
struct Cli {
    /// League identifier, e.g. basketball_nba
    #[arg(long, default_value = "americanfootball_nfl")]
    league: String,

    /// Bookmaker region
    #[arg(long, default_value = "us")]
    regions: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let api_key =
        std::env::var(ODDS_API_KEY_VAR).with_context(|| format!("{ODDS_API_KEY_VAR} not set"))?;

    let client = reqwest::Client::new();
    let url = format!("{}/{}/odds", ODDS_API_URL, cli.league);

    println!("=== Probe: Odds API ({}) ===", cli.league);
    println!();

    println!("--- 1. Fetch h2h odds ---");
    let start = Instant::now();
    let resp = client
        .get(&url)
        .query(&[
            ("apiKey", api_key.as_str()),
            ("regions", cli.regions.as_str()),
            ("markets", "h2h"),
            ("oddsFormat", "decimal"),
        ])
        .send()
        .await?;
    let latency = start.elapsed();
    println!("Status: {}", resp.status());
    println!("Latency: {:?}", latency);
    let remaining = resp
        .headers()
        .get(REQUESTS_REMAINING_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("?")
        .to_string();
    println!("Requests remaining: {}", remaining);
    let text = resp.text().await?;
    println!();

    println!("--- 2. Parsed games ---");
    let games = match parse_games(&text) {
        Ok(games) => games,
        Err(e) => {
            println!("Could not parse games: {e:#}");
            println!("{}", text);
            return Ok(());
        }
    };
    println!("Game count: {}", games.len());
    for game in &games {
        println!("\n{}", game.event_label());
        for quote in &game.quotes {
            for team in [&game.away_team, &game.home_team] {
                let Some(price) = quote.prices.get(team.as_str()) else {
                    continue;
                };
                let moneyline = match decimal_to_moneyline(*price) {
                    Ok(ml) => format!("{ml:+}"),
                    Err(e) => format!("({e})"),
                };
                println!(
                    "  {:<20} {:<28} {:>6.2} {:>8}",
                    quote.bookmaker, team, price, moneyline
                );
            }
        }
    }
    println!();

    println!("=== Probe Complete ===");
    Ok(())
}
