mod account;
mod asset;
mod order;
mod orderbook;
mod ticker;

pub use account::{AccountCurrencyInfo, AccountInfo};
pub use asset::AssetType;
pub use order::{OrderDetail, OrderSide, OrderType};
pub use orderbook::{OrderbookSnapshot, PriceLevel};
pub use ticker::TickerSnapshot;
