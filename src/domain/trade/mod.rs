pub mod executor;
pub mod swap;
