use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown exchange: {0}")]
    UnknownVenue(String),

    #[error("Exchange already loaded: {0}")]
    AlreadyLoaded(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No exchanges have been loaded")]
    NoneLoaded,

    #[error("Exchange failed to load: {0}")]
    LoadFailed(String),

    #[error("Exchange {0} has no configuration entry")]
    MissingConfig(String),

    #[error("Ambiguous currency pair format: {0}")]
    FormatAmbiguous(String),

    #[error("{0} authenticated API support is not enabled")]
    AuthNotConfigured(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to decode response: {0}")]
    DecodeFailed(String),

    #[error("Request rejected by exchange: {0}")]
    VenueRejected(String),

    #[error("{0} is not implemented for this exchange")]
    NotImplemented(&'static str),

    #[error("Exchange {0} is disabled")]
    ExchangeDisabled(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl Error {
    /// True for failures that came from the venue itself rather than from the
    /// transport or local state.
    pub fn is_venue_rejection(&self) -> bool {
        matches!(self, Error::VenueRejected(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::RequestFailed(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::DecodeFailed(err.to_string())
    }
}
