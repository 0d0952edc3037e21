use thiserror::Error;

/// Errors from converting sportsbook prices.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum OddsError {
    /// Decimal odds must be finite and strictly greater than 1.0.
    #[error("invalid decimal price {0}: must be finite and greater than 1.0")]
    InvalidPrice(f64),
}
