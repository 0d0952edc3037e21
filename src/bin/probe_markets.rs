//! Probe: Kalshi open sports markets
//!
//! Hits GET https://api.elections.kalshi.com/trade-api/v2/markets?status=open&category=sports
//! and documents:
//! - Response shape and fields
//! - How many markets survive the price filter
//! - Which raw records are missing fields the finder relies on

use std::time::Instant;

use anyhow::Result;
use kalshi_odds_finder::KALSHI_API_URL;
use kalshi_odds_finder::api::{MarketFilter, parse_markets};
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<()> {
    let client = reqwest::Client::new();

    println!("=== Probe: Kalshi markets ===");
    println!("Endpoint: {}", KALSHI_API_URL);
    println!();

    // 1. Fetch raw listing
    println!("--- 1. Fetch open sports markets ---");
    let start = Instant::now();
    let resp = client
        .get(KALSHI_API_URL)
        .query(&[("status", "open"), ("category", "sports")])
        .send()
        .await?;
    let latency = start.elapsed();
    let status = resp.status();
    let text = resp.text().await?;
    println!("Status: {}", status);
    println!("Latency: {:?}", latency);

    let body: Value = serde_json::from_str(&text)?;
    let markets = body.get("markets").and_then(|m| m.as_array());
    match markets {
        Some(arr) => {
            println!("Market count: {}", arr.len());
            if let Some(first) = arr.first() {
                println!("\nSample market (first):");
                println!("{}", serde_json::to_string_pretty(first)?);
            }
        }
        None => {
            println!("Response has no `markets` array:");
            println!("{}", serde_json::to_string_pretty(&body)?);
            return Ok(());
        }
    }
    println!();

    // 2. Field completeness
    println!("--- 2. Field completeness check ---");
    let arr = markets.map(Vec::as_slice).unwrap_or_default();
    for field in ["ticker", "title", "yes_price"] {
        let missing = arr.iter().filter(|m| m.get(field).is_none()).count();
        println!("  {:<12} missing in {} of {}", field, missing, arr.len());
    }
    println!();

    // 3. Price filter
    println!("--- 3. Cheap markets (default price filter) ---");
    let filter = MarketFilter::default();
    let cheap = parse_markets(&text, &filter)?;
    println!(
        "{} market(s) priced strictly between {}c and {}c",
        cheap.len(),
        filter.min_price_cents,
        filter.max_price_cents
    );
    for m in cheap.iter().take(20) {
        let title: String = m.title.chars().take(60).collect();
        println!("  {:>3}c  {:<62} {}", m.yes_price_cents, title, m.ticker);
    }
    println!();

    println!("=== Probe Complete ===");
    Ok(())
}
