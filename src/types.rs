use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An open Kalshi yes/no contract.
#[derive(Debug, Clone, PartialEq)]
pub struct Market {
    pub ticker: String,
    pub title: String,
    /// Yes price in cents (0-100), i.e. implied probability of "yes".
    pub yes_price_cents: i64,
}

impl Market {
    /// Yes price as a fraction of a dollar.
    pub fn yes_price(&self) -> Decimal {
        Decimal::new(self.yes_price_cents, 2)
    }
}

/// Decimal prices quoted by one bookmaker, keyed by team name.
#[derive(Debug, Clone, PartialEq)]
pub struct BookmakerQuote {
    pub bookmaker: String,
    pub prices: HashMap<String, f64>,
}

/// A scheduled game with its head-to-head quotes.
#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    pub home_team: String,
    pub away_team: String,
    pub quotes: Vec<BookmakerQuote>,
}

impl Game {
    /// Event label in "Away @ Home" form.
    pub fn event_label(&self) -> String {
        format!("{} @ {}", self.away_team, self.home_team)
    }
}

/// Games per league identifier.
pub type LeagueOdds = BTreeMap<String, Vec<Game>>;

/// One bookmaker's moneyline for the matched team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmakerLine {
    pub name: String,
    pub moneyline: i64,
}

/// A Kalshi market matched to a team in a sportsbook game.
///
/// Field names on the wire are the ones the website reads from
/// `opportunities.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub event: String,
    pub league: String,
    #[serde(rename = "team_on_kalshi")]
    pub team_on_exchange: String,
    #[serde(rename = "kalshi_market")]
    pub market_title: String,
    #[serde(rename = "kalshi_price")]
    pub price: f64,
    #[serde(rename = "kalshi_url")]
    pub url: String,
    pub bookmakers: Vec<BookmakerLine>,
}

/// Moneyline range (exclusive both ends) used to flag underdog value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoneylineWindow {
    pub min: i64,
    pub max: i64,
}

impl MoneylineWindow {
    pub fn contains(&self, moneyline: i64) -> bool {
        moneyline > self.min && moneyline < self.max
    }

    /// True if any bookmaker line of the record falls inside the window.
    pub fn matches(&self, record: &MatchRecord) -> bool {
        record.bookmakers.iter().any(|b| self.contains(b.moneyline))
    }
}

/// Summary printed to stdout at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub timestamp: String,
    pub markets_considered: usize,
    pub leagues_fetched: usize,
    pub games_considered: usize,
    pub records_written: usize,
    pub highlighted: usize,
    pub output_path: String,
}
