use serde::{Deserialize, Serialize};

/// Balances held on one venue
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountInfo {
    pub exchange: String,
    pub currencies: Vec<AccountCurrencyInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AccountCurrencyInfo {
    pub currency: String,
    pub total: f64,
    /// Amount locked in open orders or pending withdrawals
    pub hold: f64,
}
