//! Token and trade persistence
//!
//! Both stores are trait seams with in-memory implementations. Writes are
//! last-write-wins whole-record upserts for tokens; trade records instead
//! take field-level patches and refuse changes once terminal.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::shared::errors::AppError;
use crate::shared::types::{TokenRecord, TradeRecord, TradeStatus};

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, token_address: &str) -> Result<Option<TokenRecord>, AppError>;
    async fn exists(&self, token_address: &str) -> Result<bool, AppError>;
    async fn upsert(&self, record: TokenRecord) -> Result<(), AppError>;
    async fn list(&self) -> Result<Vec<TokenRecord>, AppError>;
}

/// Field-level patch for a trade record. Unset fields keep their value.
#[derive(Debug, Default, Clone)]
pub struct TradeUpdate {
    pub status: Option<TradeStatus>,
    pub output_amount: Option<f64>,
    pub time_taken_secs: Option<f64>,
}

#[async_trait]
pub trait TradeStore: Send + Sync {
    async fn get(&self, tx_id: &str) -> Result<Option<TradeRecord>, AppError>;
    async fn insert(&self, record: TradeRecord) -> Result<(), AppError>;
    /// Apply a patch. A record already in a terminal status is left as-is.
    async fn update(&self, tx_id: &str, update: TradeUpdate) -> Result<(), AppError>;
    /// Most recent trade touching the token, by creation time
    async fn latest_for_token(&self, token_address: &str) -> Result<Option<TradeRecord>, AppError>;
    async fn list_for_token(&self, token_address: &str) -> Result<Vec<TradeRecord>, AppError>;
}

#[derive(Default)]
pub struct InMemoryTokenStore {
    records: RwLock<HashMap<String, TokenRecord>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn get(&self, token_address: &str) -> Result<Option<TokenRecord>, AppError> {
        Ok(self.records.read().await.get(token_address).cloned())
    }

    async fn exists(&self, token_address: &str) -> Result<bool, AppError> {
        Ok(self.records.read().await.contains_key(token_address))
    }

    async fn upsert(&self, record: TokenRecord) -> Result<(), AppError> {
        self.records
            .write()
            .await
            .insert(record.token_address.clone(), record);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<TokenRecord>, AppError> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryTradeStore {
    records: RwLock<HashMap<String, TradeRecord>>,
}

impl InMemoryTradeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TradeStore for InMemoryTradeStore {
    async fn get(&self, tx_id: &str) -> Result<Option<TradeRecord>, AppError> {
        Ok(self.records.read().await.get(tx_id).cloned())
    }

    async fn insert(&self, record: TradeRecord) -> Result<(), AppError> {
        self.records
            .write()
            .await
            .insert(record.tx_id.clone(), record);
        Ok(())
    }

    async fn update(&self, tx_id: &str, update: TradeUpdate) -> Result<(), AppError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(tx_id)
            .ok_or_else(|| AppError::NotFound(format!("trade {tx_id}")))?;
        if record.status.is_terminal() {
            debug!(tx_id, "ignoring update to terminal trade");
            return Ok(());
        }
        if let Some(status) = update.status {
            record.status = status;
        }
        if let Some(output_amount) = update.output_amount {
            record.output_amount = Some(output_amount);
        }
        if let Some(time_taken) = update.time_taken_secs {
            record.time_taken_secs = Some(time_taken);
        }
        Ok(())
    }

    async fn latest_for_token(&self, token_address: &str) -> Result<Option<TradeRecord>, AppError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.token_address == token_address)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn list_for_token(&self, token_address: &str) -> Result<Vec<TradeRecord>, AppError> {
        let mut trades: Vec<TradeRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.token_address == token_address)
            .cloned()
            .collect();
        trades.sort_by_key(|r| r.created_at);
        Ok(trades)
    }
}
