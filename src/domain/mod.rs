pub mod dedup;
pub mod pool;
pub mod token;
pub mod trade;
