pub mod base;
pub mod binance;
pub mod coinbase;
pub mod decode;
pub mod exchange;
pub mod huobi;
pub mod itbit;
pub mod poloniex;
pub mod registry;
pub mod request;

pub use base::{Descriptor, ExchangeBase};
pub use exchange::Exchange;
pub use registry::{AdapterContext, AdapterFactory, AdapterRegistry};
