use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("duplicate {side} price level {price} in {key}")]
    DuplicatePriceLevel {
        key: String,
        side: &'static str,
        price: f64,
    },

    #[error("non-finite {field} in {key}")]
    NonFiniteValue { key: String, field: &'static str },

    #[error("snapshot for {actual} stored under {expected}")]
    KeyMismatch { expected: String, actual: String },
}

impl From<StoreError> for common::Error {
    fn from(err: StoreError) -> Self {
        common::Error::InvalidSnapshot(err.to_string())
    }
}
