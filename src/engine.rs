use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use tracing::{debug, warn};

use crate::error::OddsError;
use crate::types::{BookmakerLine, Game, LeagueOdds, Market, MatchRecord};

/// Convert decimal odds to an American moneyline, truncated toward zero.
///
/// Prices at or above 2.0 are underdogs: `(price - 1) * 100`. Prices between
/// 1.0 and 2.0 are favorites: `-100 / (price - 1)`. Anything not strictly
/// above 1.0 has no moneyline. The arithmetic runs in `Decimal` so quoted
/// prices like 2.8 give exactly +180.
pub fn decimal_to_moneyline(price: f64) -> Result<i64, OddsError> {
    if !price.is_finite() || price <= 1.0 {
        return Err(OddsError::InvalidPrice(price));
    }
    let invalid = || OddsError::InvalidPrice(price);
    let decimal = Decimal::from_f64(price).ok_or_else(invalid)?;
    let hundred = Decimal::ONE_HUNDRED;
    let excess = decimal - Decimal::ONE;
    let moneyline = if decimal >= Decimal::TWO {
        excess.checked_mul(hundred)
    } else {
        (-hundred).checked_div(excess)
    }
    .ok_or_else(invalid)?;
    moneyline.trunc().to_i64().ok_or_else(invalid)
}

/// True if the lower-cased `title` contains the team's full name or any
/// single word of it.
pub fn name_matches(title_lower: &str, team: &str) -> bool {
    let team = team.trim().to_lowercase();
    if team.is_empty() {
        return false;
    }
    title_lower.contains(&team) || team.split_whitespace().any(|word| title_lower.contains(word))
}

/// Decide which team of a game a market title refers to. Home is checked first.
pub fn match_team<'a>(title: &str, home_team: &'a str, away_team: &'a str) -> Option<&'a str> {
    let title = title.to_lowercase();
    if name_matches(&title, home_team) {
        Some(home_team)
    } else if name_matches(&title, away_team) {
        Some(away_team)
    } else {
        None
    }
}

/// Build the output record for a matched (game, market, team).
///
/// Returns `None` when no bookmaker prices `team`, or none of its prices
/// convert to a moneyline.
pub fn assemble_record(
    league: &str,
    game: &Game,
    market: &Market,
    team: &str,
    web_url: &str,
) -> Option<MatchRecord> {
    let bookmakers: Vec<BookmakerLine> = game
        .quotes
        .iter()
        .filter_map(|quote| {
            let price = *quote.prices.get(team)?;
            match decimal_to_moneyline(price) {
                Ok(moneyline) => Some(BookmakerLine {
                    name: quote.bookmaker.clone(),
                    moneyline,
                }),
                Err(e) => {
                    warn!("Skipping {} quote for {team}: {e}", quote.bookmaker);
                    None
                }
            }
        })
        .collect();

    if bookmakers.is_empty() {
        return None;
    }

    Some(MatchRecord {
        event: game.event_label(),
        league: league.to_string(),
        team_on_exchange: team.to_string(),
        market_title: market.title.clone(),
        price: market.yes_price().to_f64().unwrap_or(0.0),
        url: format!("{}/{}", web_url.trim_end_matches('/'), market.ticker),
        bookmakers,
    })
}

/// Match every market against every game and assemble the output records.
///
/// Each (game, market) pair is judged on its own; a game may yield several
/// records when several markets mention its teams. Order follows leagues,
/// then games and markets in fetch order.
pub fn find_matches(markets: &[Market], odds: &LeagueOdds, web_url: &str) -> Vec<MatchRecord> {
    let mut records = Vec::new();

    for (league, games) in odds {
        for game in games {
            for market in markets {
                let Some(team) = match_team(&market.title, &game.home_team, &game.away_team)
                else {
                    continue;
                };
                match assemble_record(league, game, market, team, web_url) {
                    Some(record) => {
                        debug!(
                            "Matched \"{}\" to {team} in {}",
                            market.title, record.event
                        );
                        records.push(record);
                    }
                    None => {
                        debug!(
                            "\"{}\" matched {team} but no bookmaker quotes it",
                            market.title
                        );
                    }
                }
            }
        }
    }

    records
}
