//! Currency code type
//!
//! Validated ISO-style currency code (fiat or crypto ticker).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A validated currency code, stored uppercase.
///
/// Accepts 2-5 character alphanumeric tickers, covering both fiat
/// codes (USD, EUR, NGN) and crypto tickers (BTC, USDT, SOL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

/// Errors that can occur when creating a CurrencyCode
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CurrencyError {
    #[error("Invalid currency code: {0}")]
    Invalid(String),
}

impl CurrencyCode {
    /// Create a validated currency code. Input is uppercased.
    pub fn new(code: &str) -> Result<Self, CurrencyError> {
        let trimmed = code.trim();
        if trimmed.len() < 2 || trimmed.len() > 5 {
            return Err(CurrencyError::Invalid(code.to_string()));
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CurrencyError::Invalid(code.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// The US dollar, the rebase reference for all exchange rates.
    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_usd(&self) -> bool {
        self.0 == "USD"
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CurrencyCode::new(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CurrencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CurrencyCode::new(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}
