//! Currency pair notation: the venue-agnostic pair type, per-venue wire and
//! config formats, and reconciliation of a venue's symbol list with the
//! persisted one.

pub mod code;
pub mod diff;
pub mod format;
pub mod pair;

pub use diff::{diff_pairs, normalise_list, PairDiff};
pub use format::{compare_formats, CurrencyPairFormatConfig};
pub use pair::CurrencyPair;
