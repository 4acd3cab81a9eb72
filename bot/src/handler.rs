use crate::engine::{Engine, ExchangeStatus};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use common::{
    currency::{CurrencyPair, CurrencyPairFormatConfig},
    models::{AssetType, OrderbookSnapshot, TickerSnapshot},
    Error as CommonError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::debug;

type SharedEngine = Arc<Engine>;

// Wrapper so common::Error can be returned from handlers
pub struct ApiError(CommonError);

impl From<CommonError> for ApiError {
    fn from(err: CommonError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            CommonError::UnknownVenue(_) | CommonError::NotFound(_) | CommonError::MissingConfig(_) => {
                StatusCode::NOT_FOUND
            }
            CommonError::RequestFailed(_)
            | CommonError::DecodeFailed(_)
            | CommonError::VenueRejected(_) => StatusCode::BAD_GATEWAY,
            CommonError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            CommonError::FormatAmbiguous(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let status = self.status();
        (status, Json(ErrorResponse { error: self.0.to_string() })).into_response()
    }
}

pub fn router(engine: SharedEngine) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/exchanges", get(list_exchanges))
        .route("/api/v1/exchanges/:name/ticker", get(get_ticker))
        .route("/api/v1/exchanges/:name/orderbook", get(get_orderbook))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(engine)
}

pub async fn list_exchanges(State(engine): State<SharedEngine>) -> Json<Vec<ExchangeStatus>> {
    Json(engine.statuses())
}

#[derive(Debug, Deserialize)]
pub struct MarketQuery {
    /// Pair in canonical form, e.g. `BTC-USD`
    pub pair: String,
    pub asset: Option<String>,
}

impl MarketQuery {
    pub fn parse(&self) -> Result<(CurrencyPair, AssetType), ApiError> {
        let pair = CurrencyPairFormatConfig::new("-", true).parse(&self.pair)?;
        let asset = match self.asset.as_deref() {
            Some(asset) => asset.parse::<AssetType>().map_err(|_| {
                CommonError::FormatAmbiguous(format!("unknown asset type {}", asset))
            })?,
            None => AssetType::default(),
        };
        Ok((pair, asset))
    }
}

pub async fn get_ticker(
    State(engine): State<SharedEngine>,
    Path(name): Path<String>,
    Query(query): Query<MarketQuery>,
) -> Result<Json<TickerSnapshot>, ApiError> {
    let (pair, asset) = query.parse()?;
    debug!("Ticker request for {} {} {}", name, pair, asset);
    let ticker = engine.get_ticker(&name, &pair, asset).await?;
    Ok(Json(ticker.as_ref().clone()))
}

pub async fn get_orderbook(
    State(engine): State<SharedEngine>,
    Path(name): Path<String>,
    Query(query): Query<MarketQuery>,
) -> Result<Json<OrderbookSnapshot>, ApiError> {
    let (pair, asset) = query.parse()?;
    debug!("Orderbook request for {} {} {}", name, pair, asset);
    let orderbook = engine.get_orderbook(&name, &pair, asset).await?;
    Ok(Json(orderbook.as_ref().clone()))
}
