//! Poolsniper - Raydium V4 pool watcher and trade bot
//! Built with Domain-Driven Design principles

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;

// Re-export main types for convenience
pub use application::commands::{ChainCommand, CommandExecutor, CommandOutput};
pub use application::listener::LogStreamListener;
pub use domain::pool::event_parser::PoolEventParser;
pub use domain::pool::manager::PoolManager;
pub use domain::token::enricher::TokenEnricher;
pub use domain::token::risk::{RiskEvaluator, RiskFlag};
pub use domain::trade::executor::TradeExecutor;
pub use infrastructure::wallet::WalletManager;
