use crate::Error;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Market segment a pair trades in
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AssetType {
    #[default]
    #[serde(rename = "SPOT")]
    Spot,
    #[serde(rename = "MARGIN")]
    Margin,
    #[serde(rename = "FUTURES")]
    Futures,
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetType::Spot => write!(f, "SPOT"),
            AssetType::Margin => write!(f, "MARGIN"),
            AssetType::Futures => write!(f, "FUTURES"),
        }
    }
}

impl FromStr for AssetType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SPOT" => Ok(AssetType::Spot),
            "MARGIN" => Ok(AssetType::Margin),
            "FUTURES" => Ok(AssetType::Futures),
            other => Err(Error::NotFound(format!("asset type {}", other))),
        }
    }
}
