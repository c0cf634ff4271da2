pub mod metadata;
pub mod notify;
pub mod price;
pub mod rpc;
pub mod store;
pub mod wallet;
