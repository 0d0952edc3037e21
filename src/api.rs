use std::collections::HashMap;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::REQUESTS_REMAINING_HEADER;
use crate::config::SettingsConfig;
use crate::types::{BookmakerQuote, Game, LeagueOdds, Market};

/// Head-to-head (moneyline) market key in The Odds API.
const H2H_MARKET: &str = "h2h";

#[derive(Debug, Deserialize)]
struct MarketsResponse {
    #[serde(default)]
    markets: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawMarket {
    ticker: Option<String>,
    title: Option<String>,
    yes_price: Option<i64>,
    /// Current v2 payloads carry the ask and last trade instead of `yes_price`.
    yes_ask: Option<i64>,
    last_price: Option<i64>,
}

impl RawMarket {
    fn price_cents(&self) -> Option<i64> {
        self.yes_price.or(self.yes_ask).or(self.last_price)
    }
}

#[derive(Debug, Deserialize)]
struct RawGame {
    home_team: Option<String>,
    away_team: Option<String>,
    #[serde(default)]
    bookmakers: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawBookmaker {
    #[serde(default)]
    key: String,
    title: Option<String>,
    #[serde(default)]
    markets: Vec<RawOddsMarket>,
}

#[derive(Debug, Deserialize)]
struct RawOddsMarket {
    key: Option<String>,
    #[serde(default)]
    outcomes: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawOutcome {
    name: Option<String>,
    price: Option<f64>,
}

/// Which Kalshi markets are worth matching.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketFilter {
    /// Exclusive lower bound on the yes price, in cents.
    pub min_price_cents: i64,
    /// Exclusive upper bound on the yes price, in cents.
    pub max_price_cents: i64,
    /// Lower-case substring the title must contain, if set.
    pub title_keyword: Option<String>,
}

impl Default for MarketFilter {
    fn default() -> Self {
        Self::from_settings(&SettingsConfig::default())
    }
}

impl MarketFilter {
    pub fn from_settings(settings: &SettingsConfig) -> Self {
        Self {
            min_price_cents: settings.min_price_cents,
            max_price_cents: settings.max_price_cents,
            title_keyword: settings
                .title_keyword
                .as_ref()
                .map(|k| k.to_lowercase())
                .filter(|k| !k.is_empty()),
        }
    }

    /// True if the price lies strictly inside the configured bounds.
    pub fn is_cheap(&self, yes_price_cents: i64) -> bool {
        yes_price_cents > self.min_price_cents && yes_price_cents < self.max_price_cents
    }

    pub fn accepts(&self, market: &Market) -> bool {
        if !self.is_cheap(market.yes_price_cents) {
            return false;
        }
        match &self.title_keyword {
            Some(keyword) => market.title.to_lowercase().contains(keyword.as_str()),
            None => true,
        }
    }
}

/// Parse a Kalshi `/markets` response body and keep markets passing `filter`.
///
/// Markets missing a ticker, title or yes price are skipped.
pub fn parse_markets(body: &str, filter: &MarketFilter) -> Result<Vec<Market>> {
    let response: MarketsResponse =
        serde_json::from_str(body).context("invalid Kalshi markets json")?;
    let total = response.markets.len();

    let markets: Vec<Market> = response
        .markets
        .into_iter()
        .filter_map(|value| {
            let raw: RawMarket = match serde_json::from_value(value) {
                Ok(raw) => raw,
                Err(e) => {
                    debug!("Skipping malformed Kalshi market: {e}");
                    return None;
                }
            };
            let price = raw.price_cents();
            match (raw.ticker, raw.title, price) {
                (Some(ticker), Some(title), Some(yes_price_cents)) => Some(Market {
                    ticker,
                    title,
                    yes_price_cents,
                }),
                (ticker, _, _) => {
                    debug!(
                        "Skipping Kalshi market {} with missing fields",
                        ticker.as_deref().unwrap_or("?")
                    );
                    None
                }
            }
        })
        .filter(|m| filter.accepts(m))
        .collect();

    debug!("Kept {} of {} Kalshi markets", markets.len(), total);
    Ok(markets)
}

/// Parse an Odds API `/odds` response body into games.
///
/// Games without both team names are skipped. Only each bookmaker's `h2h`
/// market contributes a quote; a malformed bookmaker or outcome is dropped
/// without affecting the rest of the game.
pub fn parse_games(body: &str) -> Result<Vec<Game>> {
    let values: Vec<Value> = serde_json::from_str(body).context("invalid odds json")?;

    let games = values
        .into_iter()
        .filter_map(|value| {
            let raw: RawGame = match serde_json::from_value(value) {
                Ok(raw) => raw,
                Err(e) => {
                    debug!("Skipping malformed game: {e}");
                    return None;
                }
            };
            let (Some(home_team), Some(away_team)) = (raw.home_team, raw.away_team) else {
                debug!("Skipping game with missing team names");
                return None;
            };
            let quotes = raw
                .bookmakers
                .into_iter()
                .filter_map(to_quote)
                .collect();
            Some(Game {
                home_team,
                away_team,
                quotes,
            })
        })
        .collect();

    Ok(games)
}

fn to_quote(value: Value) -> Option<BookmakerQuote> {
    let book: RawBookmaker = match serde_json::from_value(value) {
        Ok(book) => book,
        Err(e) => {
            debug!("Skipping malformed bookmaker: {e}");
            return None;
        }
    };
    let market = book
        .markets
        .into_iter()
        .find(|m| m.key.as_deref() == Some(H2H_MARKET))?;
    let prices: HashMap<String, f64> = market
        .outcomes
        .into_iter()
        .filter_map(|value| {
            let outcome: RawOutcome = serde_json::from_value(value).ok()?;
            match (outcome.name, outcome.price) {
                (Some(name), Some(price)) => Some((name, price)),
                _ => {
                    debug!("Skipping {} outcome with missing fields", book.key);
                    None
                }
            }
        })
        .collect();
    if prices.is_empty() {
        return None;
    }
    Some(BookmakerQuote {
        bookmaker: book.title.unwrap_or(book.key),
        prices,
    })
}

async fn try_fetch_markets(client: &Client, url: &str, filter: &MarketFilter) -> Result<Vec<Market>> {
    let body = client
        .get(url)
        .query(&[("status", "open"), ("category", "sports")])
        .send()
        .await
        .context("Kalshi request failed")?
        .error_for_status()
        .context("Kalshi returned an error status")?
        .text()
        .await
        .context("failed reading Kalshi body")?;
    parse_markets(&body, filter)
}

/// Fetch open Kalshi sports markets priced inside `filter`.
///
/// Never fails: errors are logged and yield an empty list.
pub async fn fetch_cheap_markets(client: &Client, url: &str, filter: &MarketFilter) -> Vec<Market> {
    info!("Fetching Kalshi markets...");
    match try_fetch_markets(client, url, filter).await {
        Ok(markets) => {
            info!("Found {} relevant Kalshi markets", markets.len());
            markets
        }
        Err(e) => {
            warn!("Error fetching Kalshi data: {e:#}");
            Vec::new()
        }
    }
}

/// Fetch moneyline games for one league.
pub async fn fetch_games(
    client: &Client,
    base_url: &str,
    league: &str,
    api_key: &str,
    regions: &str,
) -> Result<Vec<Game>> {
    let url = format!("{}/{league}/odds", base_url.trim_end_matches('/'));
    let resp = client
        .get(&url)
        .query(&[
            ("apiKey", api_key),
            ("regions", regions),
            ("markets", H2H_MARKET),
            ("oddsFormat", "decimal"),
        ])
        .send()
        .await
        .with_context(|| format!("odds request for {league} failed"))?;

    if let Some(remaining) = resp.headers().get(REQUESTS_REMAINING_HEADER) {
        info!(
            "Odds API requests remaining: {}",
            remaining.to_str().unwrap_or("?")
        );
    }

    let body = resp
        .error_for_status()
        .with_context(|| format!("odds API returned an error status for {league}"))?
        .text()
        .await
        .context("failed reading odds body")?;
    parse_games(&body)
}

/// Fetch moneyline odds for every configured league.
///
/// Without an API key this returns an empty map. A league that fails is
/// logged and left out; the others still proceed.
pub async fn fetch_league_odds(
    client: &Client,
    settings: &SettingsConfig,
    api_key: Option<&str>,
) -> LeagueOdds {
    let mut odds = LeagueOdds::new();

    let Some(api_key) = api_key else {
        warn!("Skipping odds fetch, API key is missing");
        return odds;
    };

    info!("Fetching sportsbook odds...");
    for league in &settings.leagues {
        info!("  ...fetching {league}");
        match fetch_games(client, &settings.odds_api_url, league, api_key, &settings.regions).await {
            Ok(games) => {
                debug!("{league}: {} games", games.len());
                odds.insert(league.clone(), games);
            }
            Err(e) => {
                warn!("Error fetching odds for {league}: {e:#}");
            }
        }
    }

    odds
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn filter() -> MarketFilter {
        MarketFilter::default()
    }

    fn market(title: &str, cents: i64) -> Market {
        Market {
            ticker: "T".to_string(),
            title: title.to_string(),
            yes_price_cents: cents,
        }
    }

    #[test]
    fn price_bounds_are_exclusive() {
        let f = filter();
        assert!(!f.is_cheap(0));
        assert!(!f.is_cheap(40));
        assert!(!f.is_cheap(100));
        assert!(f.is_cheap(39));
        assert!(f.is_cheap(1));
    }

    #[test]
    fn title_keyword_is_case_insensitive() {
        let f = MarketFilter {
            title_keyword: Some(" win ".to_string()),
            ..filter()
        };
        assert!(f.accepts(&market("Will the Chiefs WIN the game?", 20)));
        assert!(!f.accepts(&market("Chiefs winner?", 20)));
        assert!(!f.accepts(&market("Will the Chiefs win the game?", 45)));
    }

    #[test]
    fn blank_keyword_from_settings_is_ignored() {
        let settings = SettingsConfig {
            title_keyword: Some(String::new()),
            ..SettingsConfig::default()
        };
        assert_eq!(MarketFilter::from_settings(&settings).title_keyword, None);
    }

    #[test]
    fn parse_markets_filters_and_skips_incomplete() {
        let body = json!({
            "cursor": "abc",
            "markets": [
                { "ticker": "KX-1", "title": "Chiefs win", "yes_price": 35 },
                { "ticker": "KX-2", "title": "Bills win", "yes_price": 40 },
                { "ticker": "KX-3", "title": "Jets win", "yes_price": 0 },
                { "ticker": "KX-4", "yes_price": 20 },
                { "ticker": "KX-5", "title": "Rams win" },
                { "ticker": "KX-6", "title": "Bears win", "yes_price": "cheap" },
                { "ticker": "KX-7", "title": "Lions win", "yes_price": 1, "status": "active" }
            ]
        })
        .to_string();

        let markets = parse_markets(&body, &filter()).expect("valid body");
        let tickers: Vec<&str> = markets.iter().map(|m| m.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["KX-1", "KX-7"]);
        assert_eq!(markets[0].title, "Chiefs win");
        assert_eq!(markets[0].yes_price_cents, 35);
    }

    #[test]
    fn parse_markets_without_list_is_empty() {
        let markets = parse_markets("{}", &filter()).expect("valid body");
        assert!(markets.is_empty());
    }

    #[test]
    fn parse_markets_rejects_non_json() {
        assert!(parse_markets("<html>", &filter()).is_err());
    }

    #[test]
    fn parse_games_keeps_h2h_quotes_only() {
        let body = json!([
            {
                "id": "g1",
                "sport_key": "americanfootball_nfl",
                "home_team": "Kansas City Chiefs",
                "away_team": "Denver Broncos",
                "bookmakers": [
                    {
                        "key": "draftkings",
                        "title": "DraftKings",
                        "markets": [
                            { "key": "h2h", "outcomes": [
                                { "name": "Kansas City Chiefs", "price": 1.4 },
                                { "name": "Denver Broncos", "price": 3.1 }
                            ]}
                        ]
                    },
                    {
                        "key": "fanduel",
                        "title": "FanDuel",
                        "markets": [
                            { "key": "spreads", "outcomes": [
                                { "name": "Kansas City Chiefs", "price": 1.91, "point": -6.5 }
                            ]}
                        ]
                    },
                    {
                        "key": "betmgm",
                        "markets": [
                            { "key": "h2h", "outcomes": [
                                { "name": "Kansas City Chiefs", "price": 1.45 }
                            ]}
                        ]
                    }
                ]
            },
            { "home_team": "Buffalo Bills", "bookmakers": [] }
        ])
        .to_string();

        let games = parse_games(&body).expect("valid body");
        assert_eq!(games.len(), 1);
        let game = &games[0];
        assert_eq!(game.home_team, "Kansas City Chiefs");
        assert_eq!(game.away_team, "Denver Broncos");
        assert_eq!(game.quotes.len(), 2);
        assert_eq!(game.quotes[0].bookmaker, "DraftKings");
        assert_eq!(game.quotes[0].prices.get("Denver Broncos"), Some(&3.1));
        // Falls back to the bookmaker key when no title is given.
        assert_eq!(game.quotes[1].bookmaker, "betmgm");
    }

    #[test]
    fn parse_games_rejects_error_object() {
        let body = json!({ "message": "Invalid API key" }).to_string();
        assert!(parse_games(&body).is_err());
    }

    #[test]
    fn bad_bookmaker_does_not_drop_the_game() {
        let body = json!([
            {
                "home_team": "Kansas City Chiefs",
                "away_team": "Denver Broncos",
                "bookmakers": [
                    {
                        "key": "draftkings",
                        "title": "DraftKings",
                        "markets": [
                            { "key": "h2h", "outcomes": [
                                { "name": "Kansas City Chiefs", "price": 1.4 },
                                { "name": "Denver Broncos", "price": 3.1 }
                            ]}
                        ]
                    },
                    {
                        "key": "fanduel",
                        "title": "FanDuel",
                        "markets": [
                            { "key": "h2h", "outcomes": [
                                { "name": "Kansas City Chiefs", "price": null },
                                { "name": "Denver Broncos" }
                            ]}
                        ]
                    },
                    { "key": "betmgm", "markets": "unavailable" }
                ]
            }
        ])
        .to_string();

        let games = parse_games(&body).expect("valid body");
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].quotes.len(), 1);
        assert_eq!(games[0].quotes[0].bookmaker, "DraftKings");
    }

    #[test]
    fn bad_outcome_keeps_the_rest_of_the_quote() {
        let body = json!([
            {
                "home_team": "Boston Celtics",
                "away_team": "Miami Heat",
                "bookmakers": [
                    {
                        "key": "fanduel",
                        "title": "FanDuel",
                        "markets": [
                            { "key": "h2h", "outcomes": [
                                { "name": "Boston Celtics", "price": "n/a" },
                                { "name": "Miami Heat", "price": 2.75 }
                            ]}
                        ]
                    }
                ]
            }
        ])
        .to_string();

        let games = parse_games(&body).expect("valid body");
        let prices = &games[0].quotes[0].prices;
        assert_eq!(prices.len(), 1);
        assert_eq!(prices.get("Miami Heat"), Some(&2.75));
    }

    #[test]
    fn parse_markets_falls_back_to_ask_then_last_price() {
        let body = json!({
            "markets": [
                { "ticker": "KX-1", "title": "Chiefs win", "yes_ask": 33, "last_price": 31 },
                { "ticker": "KX-2", "title": "Bills win", "last_price": 12 },
                { "ticker": "KX-3", "title": "Jets win", "yes_price": 20, "yes_ask": 45 }
            ]
        })
        .to_string();

        let markets = parse_markets(&body, &filter()).expect("valid body");
        let prices: Vec<(&str, i64)> = markets
            .iter()
            .map(|m| (m.ticker.as_str(), m.yes_price_cents))
            .collect();
        assert_eq!(prices, vec![("KX-1", 33), ("KX-2", 12), ("KX-3", 20)]);
    }

    /// Serve `body` for `GET /{league}/odds` and 404 for any other path.
    async fn serve_league(league: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let body = body.clone();
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let request = String::from_utf8_lossy(&request);
                    let (status, payload) = if request.starts_with(&format!("GET /{league}/odds")) {
                        ("200 OK", body)
                    } else {
                        ("404 Not Found", r#"{"message":"Unknown sport"}"#.to_string())
                    };
                    let response = format!(
                        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nx-requests-remaining: 42\r\nConnection: close\r\n\r\n{payload}",
                        payload.len()
                    );
                    socket.write_all(response.as_bytes()).await.ok();
                    socket.shutdown().await.ok();
                });
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn one_failing_league_leaves_the_others() {
        let body = json!([
            {
                "home_team": "Boston Celtics",
                "away_team": "Miami Heat",
                "bookmakers": [
                    {
                        "key": "draftkings",
                        "title": "DraftKings",
                        "markets": [
                            { "key": "h2h", "outcomes": [
                                { "name": "Boston Celtics", "price": 1.5 },
                                { "name": "Miami Heat", "price": 2.75 }
                            ]}
                        ]
                    }
                ]
            }
        ])
        .to_string();
        let base_url = serve_league("basketball_nba", body).await;

        let client = Client::new();
        let settings = SettingsConfig {
            odds_api_url: base_url,
            leagues: vec!["icehockey_nhl".to_string(), "basketball_nba".to_string()],
            ..SettingsConfig::default()
        };
        let odds = fetch_league_odds(&client, &settings, Some("key")).await;

        let leagues: Vec<&str> = odds.keys().map(String::as_str).collect();
        assert_eq!(leagues, vec!["basketball_nba"]);
        let games = &odds["basketball_nba"];
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].home_team, "Boston Celtics");
        assert_eq!(games[0].quotes[0].prices.get("Miami Heat"), Some(&2.75));
    }

    #[tokio::test]
    async fn unreachable_kalshi_yields_no_markets() {
        let client = Client::new();
        let markets = fetch_cheap_markets(&client, "http://127.0.0.1:1/markets", &filter()).await;
        assert!(markets.is_empty());
    }

    #[tokio::test]
    async fn missing_api_key_skips_odds_fetch() {
        let client = Client::new();
        let settings = SettingsConfig {
            odds_api_url: "http://127.0.0.1:1".to_string(),
            ..SettingsConfig::default()
        };
        let odds = fetch_league_odds(&client, &settings, None).await;
        assert!(odds.is_empty());
    }

    #[tokio::test]
    async fn unreachable_odds_api_yields_no_leagues() {
        let client = Client::new();
        let settings = SettingsConfig {
            odds_api_url: "http://127.0.0.1:1".to_string(),
            leagues: vec!["basketball_nba".to_string(), "icehockey_nhl".to_string()],
            ..SettingsConfig::default()
        };
        let odds = fetch_league_odds(&client, &settings, Some("key")).await;
        assert!(odds.is_empty());
    }
}
