pub mod config;
pub mod constants;
pub mod errors;
pub mod tx;
pub mod types;
pub mod utils;
