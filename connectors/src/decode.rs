//! Helpers for the number encodings venues use in JSON payloads.

use common::models::PriceLevel;
use common::{Error, Result};
use serde_json::Value;

/// Reads a number sent either as a JSON number or as a numeric string.
pub fn number(value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| Error::DecodeFailed(format!("{} is not a float", n))),
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|e| Error::DecodeFailed(format!("failed to parse {:?}: {}", s, e))),
        other => Err(Error::DecodeFailed(format!("expected a number, got {}", other))),
    }
}

pub fn parse_str(value: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .map_err(|e| Error::DecodeFailed(format!("failed to parse {:?}: {}", value, e)))
}

/// Converts `[[price, amount, ..], ..]` rows into price levels.
///
/// Repeated prices are merged so the result has one level per price.
pub fn levels(rows: &[Vec<Value>]) -> Result<Vec<PriceLevel>> {
    let mut out: Vec<PriceLevel> = Vec::with_capacity(rows.len());
    for row in rows {
        if row.len() < 2 {
            return Err(Error::DecodeFailed(format!("short orderbook row {:?}", row)));
        }
        let price = number(&row[0])?;
        let amount = number(&row[1])?;
        match out.iter_mut().find(|level| level.price == price) {
            Some(level) => level.amount += amount,
            None => out.push(PriceLevel::new(price, amount)),
        }
    }
    Ok(out)
}
