use crate::currency::format::CurrencyPairFormatConfig;

/// Result of reconciling a venue's reported symbols with the persisted lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairDiff {
    pub available: Vec<String>,
    pub enabled: Vec<String>,
    /// Entries in `available` that were not there before
    pub added: Vec<String>,
    /// Entries dropped from `available`
    pub removed: Vec<String>,
    /// Enabled entries dropped because they left `available`
    pub pruned: Vec<String>,
    /// Enabled list was replaced by the seed list
    pub reset: bool,
    pub changed: bool,
}

/// Trims, applies the format's case, drops empties and duplicates.
pub fn normalise_list(format: &CurrencyPairFormatConfig, symbols: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let symbol = format.normalise(symbol);
        if symbol.is_empty() || out.contains(&symbol) {
            continue;
        }
        out.push(symbol);
    }
    out
}

/// Computes the new available and enabled lists.
///
/// Inputs are expected to be normalised with [`normalise_list`].
/// Without `force` the available list only grows (union with the venue's
/// list). With `force` it is replaced by the venue's list; enabled entries
/// that disappeared are pruned and, if a `seed` is given, the enabled list is
/// reset to the seed instead.
pub fn diff_pairs(
    available: &[String],
    enabled: &[String],
    venue_symbols: &[String],
    force: bool,
    seed: &[String],
) -> PairDiff {
    let new_available: Vec<String> = if force {
        venue_symbols.to_vec()
    } else {
        let mut merged = available.to_vec();
        merged.extend(
            venue_symbols
                .iter()
                .filter(|symbol| !available.contains(symbol))
                .cloned(),
        );
        merged
    };

    let added = difference(&new_available, available);
    let removed = difference(available, &new_available);

    let (mut new_enabled, pruned): (Vec<String>, Vec<String>) = enabled
        .iter()
        .cloned()
        .partition(|symbol| new_available.contains(symbol));

    let mut reset = false;
    if force && !pruned.is_empty() && !seed.is_empty() {
        new_enabled = seed
            .iter()
            .filter(|symbol| new_available.contains(symbol))
            .cloned()
            .collect();
        reset = true;
    }

    let changed = new_available != available || new_enabled != enabled;

    PairDiff {
        available: new_available,
        enabled: new_enabled,
        added,
        removed,
        pruned,
        reset,
        changed,
    }
}

fn difference(left: &[String], right: &[String]) -> Vec<String> {
    left.iter()
        .filter(|symbol| !right.contains(symbol))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalise_drops_empties_and_duplicates() {
        let format = CurrencyPairFormatConfig::new("-", true);
        let raw = list(&["ltc", "btc", " usd ", "", "BTC"]);
        assert_eq!(normalise_list(&format, &raw), list(&["LTC", "BTC", "USD"]));
    }

    #[test]
    fn union_when_not_forced() {
        let diff = diff_pairs(
            &list(&["BTC-USD"]),
            &list(&["BTC-USD"]),
            &list(&["ETH-USD", "BTC-USD"]),
            false,
            &[],
        );
        assert_eq!(diff.available, list(&["BTC-USD", "ETH-USD"]));
        assert_eq!(diff.added, list(&["ETH-USD"]));
        assert!(diff.removed.is_empty());
        assert!(diff.changed);
    }

    #[test]
    fn repeated_diff_is_idempotent() {
        let venue = list(&["BTC", "LTC", "USD"]);
        let first = diff_pairs(&[], &[], &venue, false, &[]);
        assert!(first.changed);

        let second = diff_pairs(&first.available, &first.enabled, &venue, false, &[]);
        assert!(!second.changed);
        assert_eq!(second.available, first.available);
        assert_eq!(second.enabled, first.enabled);
    }

    #[test]
    fn forced_diff_replaces_and_prunes() {
        let diff = diff_pairs(
            &list(&["BTC", "LTC", "USD"]),
            &list(&["LTC", "BTC"]),
            &list(&["BTC"]),
            true,
            &[],
        );
        assert_eq!(diff.available, list(&["BTC"]));
        assert_eq!(diff.enabled, list(&["BTC"]));
        assert_eq!(diff.removed, list(&["LTC", "USD"]));
        assert_eq!(diff.pruned, list(&["LTC"]));
        assert!(!diff.reset);
        assert!(diff.changed);
    }

    #[test]
    fn forced_diff_resets_to_seed_when_enabled_pairs_vanish() {
        let diff = diff_pairs(
            &list(&["BTCUSDT"]),
            &list(&["BTCUSDT"]),
            &list(&["BTC-USDT", "ETH-BTC"]),
            true,
            &list(&["BTC-USDT"]),
        );
        assert!(diff.reset);
        assert_eq!(diff.enabled, list(&["BTC-USDT"]));
    }

    #[test]
    fn non_forced_diff_still_prunes_nothing_from_a_growing_set() {
        let diff = diff_pairs(
            &list(&["BTC-USD"]),
            &list(&["BTC-USD"]),
            &list(&["ETH-USD"]),
            false,
            &[],
        );
        assert_eq!(diff.enabled, list(&["BTC-USD"]));
        assert!(diff.pruned.is_empty());
    }
}
