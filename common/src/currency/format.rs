use crate::currency::code;
use crate::currency::pair::CurrencyPair;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Describes how a venue writes currency pairs.
///
/// Every adapter carries two of these: the request format used on the wire
/// and the config format used for persisted pair lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyPairFormatConfig {
    /// Joins the two currencies of a pair (e.g. "-" in `BTC-USD`)
    pub delimiter: String,
    /// Joins several pairs into one request parameter
    pub separator: String,
    /// Known currency used to split symbols that have no delimiter
    pub index: String,
    pub uppercase: bool,
}

impl CurrencyPairFormatConfig {
    pub fn new(delimiter: &str, uppercase: bool) -> Self {
        Self {
            delimiter: delimiter.to_string(),
            uppercase,
            ..Default::default()
        }
    }

    pub fn with_index(mut self, index: &str) -> Self {
        self.index = index.to_string();
        self
    }

    pub fn with_separator(mut self, separator: &str) -> Self {
        self.separator = separator.to_string();
        self
    }

    /// Applies this format's letter case to a raw symbol.
    pub fn normalise(&self, symbol: &str) -> String {
        let symbol = symbol.trim();
        if self.uppercase {
            symbol.to_ascii_uppercase()
        } else {
            symbol.to_ascii_lowercase()
        }
    }

    /// Renders `pair` in this format.
    pub fn format(&self, pair: &CurrencyPair) -> String {
        self.normalise(&format!("{}{}{}", pair.first, self.delimiter, pair.second))
    }

    /// Renders several pairs joined by the separator.
    pub fn format_many(&self, pairs: &[CurrencyPair]) -> String {
        pairs
            .iter()
            .map(|pair| self.format(pair))
            .collect::<Vec<_>>()
            .join(&self.separator)
    }

    /// Splits a symbol written in this format back into a pair.
    ///
    /// With no delimiter the index currency is matched as a prefix or suffix;
    /// with no index either, the symbol is split against the known code list.
    pub fn parse(&self, symbol: &str) -> Result<CurrencyPair> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(Error::FormatAmbiguous("empty symbol".to_string()));
        }

        if !self.delimiter.is_empty() {
            return match symbol.split_once(self.delimiter.as_str()) {
                Some((first, second))
                    if !first.is_empty()
                        && !second.is_empty()
                        && !second.contains(self.delimiter.as_str()) =>
                {
                    Ok(CurrencyPair::with_delimiter(first, second, &self.delimiter))
                }
                _ => Err(Error::FormatAmbiguous(format!(
                    "{} cannot be split on delimiter {:?}",
                    symbol, self.delimiter
                ))),
            };
        }

        let at = if !self.index.is_empty() {
            self.index_split_point(symbol)
        } else {
            code::split_point(symbol)
        };

        match at {
            Some(at) => Ok(CurrencyPair::with_delimiter(&symbol[..at], &symbol[at..], "")),
            None => Err(Error::FormatAmbiguous(format!(
                "{} has no delimiter and matches no known currency{}",
                symbol,
                if self.index.is_empty() {
                    String::new()
                } else {
                    format!(" or index {}", self.index)
                }
            ))),
        }
    }

    fn index_split_point(&self, symbol: &str) -> Option<usize> {
        if !symbol.is_ascii() {
            return None;
        }
        let upper = symbol.to_ascii_uppercase();
        let index = self.index.to_ascii_uppercase();
        if upper.len() <= index.len() {
            return None;
        }
        if upper.starts_with(&index) {
            Some(index.len())
        } else if upper.ends_with(&index) {
            Some(upper.len() - index.len())
        } else {
            None
        }
    }
}

/// True when two formats would render pairs identically.
pub fn compare_formats(a: &CurrencyPairFormatConfig, b: &CurrencyPairFormatConfig) -> bool {
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_applies_delimiter_and_case() {
        let pair = CurrencyPair::new("btc", "usd");
        assert_eq!(CurrencyPairFormatConfig::new("-", true).format(&pair), "BTC-USD");
        assert_eq!(CurrencyPairFormatConfig::new("_", false).format(&pair), "btc_usd");
        assert_eq!(CurrencyPairFormatConfig::new("", true).format(&pair), "BTCUSD");
    }

    #[test]
    fn format_many_uses_separator() {
        let format = CurrencyPairFormatConfig::new("_", false).with_separator("-");
        let pairs = vec![CurrencyPair::new("BTC", "USD"), CurrencyPair::new("LTC", "BTC")];
        assert_eq!(format.format_many(&pairs), "btc_usd-ltc_btc");
    }

    #[test]
    fn parse_with_delimiter() {
        let pair = CurrencyPairFormatConfig::new("-", true).parse("BTC-USD").unwrap();
        assert_eq!(pair.first, "BTC");
        assert_eq!(pair.second, "USD");
        assert_eq!(pair.to_string(), "BTC-USD");
    }

    #[test]
    fn parse_rejects_missing_or_repeated_delimiter() {
        let format = CurrencyPairFormatConfig::new("_", true);
        assert!(matches!(format.parse("BTCUSD"), Err(Error::FormatAmbiguous(_))));
        assert!(matches!(format.parse("BTC_USD_X"), Err(Error::FormatAmbiguous(_))));
        assert!(matches!(format.parse("_USD"), Err(Error::FormatAmbiguous(_))));
    }

    #[test]
    fn parse_with_index_prefix_and_suffix() {
        let format = CurrencyPairFormatConfig::new("", true).with_index("BTC");
        let pair = format.parse("BTCDOGE").unwrap();
        assert_eq!((pair.first.as_str(), pair.second.as_str()), ("BTC", "DOGE"));

        let pair = format.parse("DOGEBTC").unwrap();
        assert_eq!((pair.first.as_str(), pair.second.as_str()), ("DOGE", "BTC"));

        assert!(matches!(format.parse("ETHUSD"), Err(Error::FormatAmbiguous(_))));
    }

    #[test]
    fn parse_without_index_uses_known_codes() {
        let format = CurrencyPairFormatConfig::new("", true);
        assert_eq!(format.parse("BTCUSD").unwrap(), CurrencyPair::new("BTC", "USD"));
        assert!(matches!(format.parse("FOOBAR"), Err(Error::FormatAmbiguous(_))));
    }

    #[test]
    fn parse_inverts_format() {
        let formats = [
            CurrencyPairFormatConfig::new("-", true),
            CurrencyPairFormatConfig::new("_", false),
            CurrencyPairFormatConfig::new("", true).with_index("BTC"),
            CurrencyPairFormatConfig::new("", false),
        ];
        let pairs = [
            CurrencyPair::new("BTC", "USD"),
            CurrencyPair::new("BTC", "USDT"),
            CurrencyPair::new("ETH", "BTC"),
        ];
        for format in &formats {
            for pair in &pairs {
                let wire = format.format(pair);
                assert_eq!(&format.parse(&wire).unwrap(), pair, "{:?} via {}", format, wire);
            }
        }
    }

    #[test]
    fn compare_detects_delimiter_change() {
        let one = CurrencyPairFormatConfig::new("-", true).with_separator(",");
        let mut two = one.clone();
        assert!(compare_formats(&one, &two));
        two.delimiter = "~".to_string();
        assert!(!compare_formats(&one, &two));
    }
}
