use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Delimiter used for the venue-agnostic canonical form of a pair.
pub const CANONICAL_DELIMITER: &str = "-";

/// Represents a pair of currencies being traded (e.g. BTC/USD).
///
/// Equality and hashing ignore ASCII case and the delimiter, so `btc_usd` and
/// `BTC-USD` are the same pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyPair {
    /// First currency of the pair (e.g., BTC)
    pub first: String,
    /// Second currency of the pair (e.g., USD)
    pub second: String,
    /// Delimiter used when the pair is displayed
    #[serde(default)]
    pub delimiter: String,
}

impl CurrencyPair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self::with_delimiter(first, second, CANONICAL_DELIMITER)
    }

    pub fn with_delimiter(
        first: impl Into<String>,
        second: impl Into<String>,
        delimiter: impl Into<String>,
    ) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
            delimiter: delimiter.into(),
        }
    }

    /// Uppercase `FIRST-SECOND` form used as the cache key for this pair.
    pub fn canonical(&self) -> String {
        format!(
            "{}{}{}",
            self.first.to_ascii_uppercase(),
            CANONICAL_DELIMITER,
            self.second.to_ascii_uppercase()
        )
    }

    /// True if either side of the pair is `code`.
    pub fn contains(&self, code: &str) -> bool {
        self.first.eq_ignore_ascii_case(code) || self.second.eq_ignore_ascii_case(code)
    }
}

impl PartialEq for CurrencyPair {
    fn eq(&self, other: &Self) -> bool {
        self.first.eq_ignore_ascii_case(&other.first)
            && self.second.eq_ignore_ascii_case(&other.second)
    }
}

impl Eq for CurrencyPair {}

impl Hash for CurrencyPair {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.first.to_ascii_uppercase().hash(state);
        self.second.to_ascii_uppercase().hash(state);
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.first, self.delimiter, self.second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_ignores_case_and_delimiter() {
        let a = CurrencyPair::with_delimiter("btc", "usd", "_");
        let b = CurrencyPair::new("BTC", "USD");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn display_uses_own_delimiter() {
        let pair = CurrencyPair::with_delimiter("BTC", "DOGE", "");
        assert_eq!(pair.to_string(), "BTCDOGE");
        assert_eq!(pair.canonical(), "BTC-DOGE");
    }

    #[test]
    fn contains_either_side() {
        let pair = CurrencyPair::new("ETH", "USDT");
        assert!(pair.contains("usdt"));
        assert!(!pair.contains("BTC"));
    }
}
