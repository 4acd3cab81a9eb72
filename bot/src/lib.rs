pub mod config;
pub mod engine;
pub mod handler;
pub mod supervisor;

pub use engine::{Engine, ExchangeStatus};
