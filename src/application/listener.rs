//! Pool discovery over the log stream
//!
//! Subscribes to the AMM program's logs at finalized commitment and hands
//! every fresh pool-init signature to a handler on its own task. The
//! subscription is re-established whenever the stream ends.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use solana_client::nonblocking::pubsub_client::PubsubClient;
use solana_client::rpc_config::{RpcTransactionLogsConfig, RpcTransactionLogsFilter};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::dedup::Deduplicator;
use crate::domain::pool::manager::PoolManager;
use crate::domain::token::enricher::TokenEnricher;
use crate::infrastructure::store::TokenStore;
use crate::shared::constants::{POOL_INIT_LOG_MARKER, WSOL_MINT};
use crate::shared::errors::AppError;
use crate::shared::types::TokenRecord;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Some RPC providers emit this placeholder instead of a real signature
const PLACEHOLDER_SIGNATURE: &str =
    "1111111111111111111111111111111111111111111111111111111111111111";

#[async_trait]
pub trait DiscoveryHandler: Send + Sync {
    async fn on_pool_init(&self, signature: &str) -> Result<(), AppError>;
}

/// Registers the token behind a newly initialized pool and kicks off its
/// first enrichment pass.
pub struct NewTokenHandler {
    tokens: Arc<dyn TokenStore>,
    pools: Arc<PoolManager>,
    enricher: Arc<TokenEnricher>,
}

impl NewTokenHandler {
    pub fn new(
        tokens: Arc<dyn TokenStore>,
        pools: Arc<PoolManager>,
        enricher: Arc<TokenEnricher>,
    ) -> Self {
        Self {
            tokens,
            pools,
            enricher,
        }
    }
}

#[async_trait]
impl DiscoveryHandler for NewTokenHandler {
    async fn on_pool_init(&self, signature: &str) -> Result<(), AppError> {
        let (keys, open_time, lp_reserve) =
            self.pools.fetch_pool_keys_for_init_tx(signature).await?;

        // The tradable token is whichever side of the pair is not SOL
        let token_mint = if keys.base_mint == WSOL_MINT {
            keys.quote_mint
        } else {
            keys.base_mint
        };
        let address = token_mint.to_string();

        if self.tokens.exists(&address).await? {
            debug!(token = %address, "token already tracked, skipping");
            return Ok(());
        }

        let mut record = TokenRecord::new(&address);
        record.init_tx = Some(signature.to_string());
        record.pool_id = Some(keys.id.to_string());
        record.lp_reserve = Some(lp_reserve);
        record.pool_created_at = Some(open_time);
        record.pool_keys = Some(keys);
        self.tokens.upsert(record).await?;
        info!(token = %address, signature, "new pool registered");

        // The record is saved either way; a failed first enrichment only
        // delays the derived fields.
        if let Err(err) = self.enricher.enrich(&address, false, true).await {
            warn!(token = %address, error = %err, "initial enrichment failed");
        }
        Ok(())
    }
}

pub struct LogStreamListener {
    ws_url: String,
    program_id: Pubkey,
    handler: Arc<dyn DiscoveryHandler>,
    dedup: Arc<Mutex<Deduplicator>>,
}

impl LogStreamListener {
    pub fn new(ws_url: String, program_id: Pubkey, handler: Arc<dyn DiscoveryHandler>) -> Self {
        Self {
            ws_url,
            program_id,
            handler,
            dedup: Arc::new(Mutex::new(Deduplicator::new())),
        }
    }

    /// Subscribe and dispatch until cancelled, reconnecting on stream loss
    pub async fn run(&self) -> Result<(), AppError> {
        loop {
            match self.listen_once().await {
                Ok(()) => warn!("log stream ended, reconnecting"),
                Err(err) => warn!(error = %err, "log stream failed, reconnecting"),
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    async fn listen_once(&self) -> Result<(), AppError> {
        let client = PubsubClient::new(&self.ws_url)
            .await
            .map_err(|e| AppError::Rpc(format!("pubsub connect: {e}")))?;
        let (mut stream, _unsubscribe) = client
            .logs_subscribe(
                RpcTransactionLogsFilter::Mentions(vec![self.program_id.to_string()]),
                RpcTransactionLogsConfig {
                    commitment: Some(CommitmentConfig::finalized()),
                },
            )
            .await
            .map_err(|e| AppError::Rpc(format!("logs subscribe: {e}")))?;
        info!(program = %self.program_id, "listening for pool initializations");

        while let Some(response) = stream.next().await {
            let logs = &response.value;
            let had_error = logs.err.is_some();
            if !self
                .should_process(&logs.signature, had_error, &logs.logs)
                .await
            {
                continue;
            }

            let handler = self.handler.clone();
            let signature = logs.signature.clone();
            tokio::spawn(async move {
                if let Err(err) = handler.on_pool_init(&signature).await {
                    warn!(signature, error = %err, "pool init handling failed");
                }
            });
        }
        Ok(())
    }

    /// Filter and dedup one log batch
    async fn should_process(&self, signature: &str, had_error: bool, logs: &[String]) -> bool {
        if had_error {
            return false;
        }
        if !logs.iter().any(|l| l.contains(POOL_INIT_LOG_MARKER)) {
            return false;
        }
        if signature == PLACEHOLDER_SIGNATURE {
            return false;
        }
        let mut dedup = self.dedup.lock().await;
        if dedup.seen(signature) {
            return false;
        }
        dedup.mark_seen(signature);
        true
    }
}
