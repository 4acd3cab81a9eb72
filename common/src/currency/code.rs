//! Known currency codes used to split concatenated symbols such as `BTCUSD`
//! when a venue's format has neither a delimiter nor an index currency.

/// Ordered longest first so `USDT` wins over `USD` when both would match.
const KNOWN_CODES: &[&str] = &[
    "DASH", "DOGE", "USDC", "USDT", "AUD", "BCH", "BNB", "BTC", "CAD", "CHF", "CNY", "DAI",
    "EOS", "ETC", "ETH", "EUR", "GBP", "HKD", "JPY", "KRW", "LTC", "NEO", "NZD", "OMG",
    "PLN", "RUB", "SGD", "TRX", "UAH", "USD", "XBT", "XLM", "XMR", "XRP", "ZAR", "ZEC", "HT",
];

pub fn is_known(code: &str) -> bool {
    KNOWN_CODES.iter().any(|known| known.eq_ignore_ascii_case(code))
}

/// Finds the byte offset at which `symbol` splits into two currency codes.
///
/// A split where both halves are known codes is preferred; otherwise a known
/// prefix, then a known suffix, is accepted.
pub fn split_point(symbol: &str) -> Option<usize> {
    if !symbol.is_ascii() {
        return None;
    }
    let upper = symbol.to_ascii_uppercase();

    let mut prefix_only = None;
    let mut suffix_only = None;

    for code in KNOWN_CODES {
        if upper.len() <= code.len() {
            continue;
        }
        if upper.starts_with(code) {
            if is_known(&upper[code.len()..]) {
                return Some(code.len());
            }
            prefix_only.get_or_insert(code.len());
        }
        if upper.ends_with(code) {
            let at = upper.len() - code.len();
            if is_known(&upper[..at]) {
                return Some(at);
            }
            suffix_only.get_or_insert(at);
        }
    }

    prefix_only.or(suffix_only)
}
