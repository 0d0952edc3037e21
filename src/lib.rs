pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod reporter;
pub mod types;

/// Kalshi market listing endpoint (public, no auth required)
pub const KALSHI_API_URL: &str = "https://api.elections.kalshi.com/trade-api/v2/markets";

/// Kalshi web base URL, a market ticker is appended to build its page link
pub const KALSHI_WEB_URL: &str = "https://kalshi.com/markets";

/// The Odds API per-sport base URL. Append `/{league}/odds`.
pub const ODDS_API_URL: &str = "https://api.the-odds-api.com/v4/sports";

/// Environment variable holding The Odds API key.
pub const ODDS_API_KEY_VAR: &str = "ODDS_API_KEY";

/// Response header carrying the remaining monthly request quota.
pub const REQUESTS_REMAINING_HEADER: &str = "x-requests-remaining";
