//! Token record enrichment
//!
//! Fans out over several chain and HTTP sources to fill the derived fields
//! of a token record. Only the record load and the mint-account fetch are
//! fatal; every other step degrades independently and leaves its field
//! untouched. Calls against the RPC node are paced with a fixed delay.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

use crate::domain::pool::manager::PoolManager;
use crate::infrastructure::metadata::MetadataSource;
use crate::infrastructure::notify::Notifier;
use crate::infrastructure::price::PriceOracle;
use crate::infrastructure::rpc::ChainRpc;
use crate::infrastructure::store::TokenStore;
use crate::shared::errors::{AppError, ParseError};
use crate::shared::types::{ParsedPoolInfo, TokenRecord};

/// How many of the largest holders to keep
const TOP_HOLDERS: usize = 10;

/// Share of the LP supply that has been burned since pool creation.
///
/// The minted amount is reconstructed as `max(supply, reserve - 1)` because
/// the live supply can exceed the recorded mint when LP was minted again.
/// `None` when the supply reads zero.
pub fn burn_percentage(raw_reserve: u64, decimals: u8, raw_supply: u64) -> Option<f64> {
    let scale = 10f64.powi(decimals as i32);
    let reserve = raw_reserve as f64 / scale;
    let supply = raw_supply as f64 / scale;
    if supply == 0.0 {
        return None;
    }
    let max_supply = supply.max(reserve - 1.0);
    Some((max_supply - supply) / max_supply * 100.0)
}

pub struct TokenEnricher {
    rpc: Arc<dyn ChainRpc>,
    store: Arc<dyn TokenStore>,
    pools: Arc<PoolManager>,
    metadata: Arc<dyn MetadataSource>,
    prices: Arc<dyn PriceOracle>,
    notifier: Arc<dyn Notifier>,
    pacing: Duration,
}

impl TokenEnricher {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        store: Arc<dyn TokenStore>,
        pools: Arc<PoolManager>,
        metadata: Arc<dyn MetadataSource>,
        prices: Arc<dyn PriceOracle>,
        notifier: Arc<dyn Notifier>,
        pacing_ms: u64,
    ) -> Self {
        Self {
            rpc,
            store,
            pools,
            metadata,
            prices,
            notifier,
            pacing: Duration::from_millis(pacing_ms),
        }
    }

    /// Enrich the stored record for `address` and upsert the result.
    ///
    /// Returns `Ok(None)` when `gate_on_authority` is set and the mint still
    /// has a mint or freeze authority; nothing is persisted for a gated
    /// token.
    pub async fn enrich(
        &self,
        address: &str,
        fetch_metadata: bool,
        gate_on_authority: bool,
    ) -> Result<Option<TokenRecord>, AppError> {
        let mut record = self
            .store
            .get(address)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("token {address}")))?;
        let mint = Pubkey::from_str(address)
            .map_err(|_| AppError::Parse(ParseError::InvalidField("token address")))?;

        self.pace().await;
        let mint_info = self.rpc.get_mint_info(&mint).await?;
        record.mint_authority = mint_info.mint_authority;
        record.freeze_authority = mint_info.freeze_authority;
        record.supply = Some(mint_info.supply);
        record.decimals = Some(mint_info.decimals);

        if gate_on_authority
            && (record.mint_authority.is_some() || record.freeze_authority.is_some())
        {
            debug!(token = address, "authorities still enabled, deferring enrichment");
            return Ok(None);
        }

        self.pace().await;
        match self.rpc.get_token_largest_accounts(&mint).await {
            Ok(mut holders) => {
                holders.truncate(TOP_HOLDERS);
                record.holders_distribution = holders;
            }
            Err(err) => warn!(token = address, error = %err, "holder fetch failed"),
        }

        if let Some(keys) = record.pool_keys.clone() {
            self.pace().await;
            match self.pools.vaults_info(&keys).await {
                Ok((base_amount, quote_amount)) => {
                    let base_price = self
                        .prices
                        .price_usd(&keys.base_mint.to_string())
                        .await
                        .unwrap_or(0.0);
                    let quote_price = self
                        .prices
                        .price_usd(&keys.quote_mint.to_string())
                        .await
                        .unwrap_or(0.0);
                    record.pool_info = Some(ParsedPoolInfo {
                        base_token_amount: base_amount,
                        quote_token_amount: quote_amount,
                        base_price_usd: base_price,
                        quote_price_usd: quote_price,
                        base_liquidity: base_amount * base_price,
                        quote_liquidity: quote_amount * quote_price,
                    });
                }
                Err(err) => warn!(token = address, error = %err, "pool info fetch failed"),
            }

            self.pace().await;
            match self.rpc.get_mint_info(&keys.lp_mint).await {
                Ok(lp_info) => {
                    record.burned_lp_percentage = burn_percentage(
                        record.lp_reserve.unwrap_or(0),
                        lp_info.decimals,
                        lp_info.supply,
                    );
                }
                Err(err) => warn!(token = address, error = %err, "lp mint fetch failed"),
            }
        }

        if fetch_metadata {
            self.pace().await;
            match self.metadata.fetch(&mint).await {
                Ok(meta) => record.metadata = Some(meta),
                Err(err) => warn!(token = address, error = %err, "metadata fetch failed"),
            }
        }

        record.last_updated_at = Utc::now();
        self.store.upsert(record.clone()).await?;
        self.notifier.publish(address).await;
        Ok(Some(record))
    }

    async fn pace(&self) {
        if !self.pacing.is_zero() {
            tokio::time::sleep(self.pacing).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::rpc::testing::StaticRpc;
    use crate::infrastructure::store::InMemoryTokenStore;
    use crate::shared::types::{HolderBalance, MintInfo, TokenMetadata};
    use async_trait::async_trait;

    struct NoMetadata;

    #[async_trait]
    impl MetadataSource for NoMetadata {
        async fn fetch(&self, mint: &Pubkey) -> Result<TokenMetadata, AppError> {
            Err(AppError::NotFound(format!("metadata for {mint}")))
        }
    }

    struct FixedPrice(f64);

    #[async_trait]
    impl PriceOracle for FixedPrice {
        async fn price_usd(&self, _mint: &str) -> Result<f64, AppError> {
            Ok(self.0)
        }
    }

    struct CountingNotifier(std::sync::Mutex<Vec<String>>);

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn publish(&self, token_address: &str) {
            self.0.lock().unwrap().push(token_address.to_string());
        }
    }

    fn enricher_with(
        rpc: StaticRpc,
        store: Arc<InMemoryTokenStore>,
        notifier: Arc<CountingNotifier>,
    ) -> TokenEnricher {
        let rpc: Arc<dyn ChainRpc> = Arc::new(rpc);
        TokenEnricher::new(
            rpc.clone(),
            store,
            Arc::new(PoolManager::new(rpc)),
            Arc::new(NoMetadata),
            Arc::new(FixedPrice(1.5)),
            notifier,
            0,
        )
    }

    #[test]
    fn test_burn_percentage_nothing_burned() {
        // Supply above the recorded reserve reads as zero burn
        assert_eq!(burn_percentage(900, 0, 1000), Some(0.0));
    }

    #[test]
    fn test_burn_percentage_mostly_burned() {
        let pct = burn_percentage(1000, 0, 100).unwrap();
        assert!((pct - 89.99).abs() < 0.01, "got {pct}");
    }

    #[test]
    fn test_burn_percentage_zero_supply() {
        assert_eq!(burn_percentage(1000, 6, 0), None);
    }

    #[tokio::test]
    async fn test_enrich_missing_record_fails() {
        let store = Arc::new(InMemoryTokenStore::new());
        let notifier = Arc::new(CountingNotifier(Default::default()));
        let enricher = enricher_with(StaticRpc::default(), store, notifier);

        let err = enricher
            .enrich(&Pubkey::new_unique().to_string(), false, false)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_enrich_fills_mint_fields_and_holders() {
        let mint = Pubkey::new_unique();
        let address = mint.to_string();

        let mut rpc = StaticRpc::default();
        rpc.mints.insert(
            mint,
            MintInfo {
                mint_authority: None,
                freeze_authority: None,
                supply: 1_000_000,
                decimals: 6,
            },
        );
        rpc.largest_accounts.insert(
            mint,
            (0..15)
                .map(|i| HolderBalance {
                    address: format!("holder-{i}"),
                    amount: 100,
                    ui_amount: 0.0001,
                })
                .collect(),
        );

        let store = Arc::new(InMemoryTokenStore::new());
        store.upsert(TokenRecord::new(&address)).await.unwrap();
        let notifier = Arc::new(CountingNotifier(Default::default()));
        let enricher = enricher_with(rpc, store.clone(), notifier.clone());

        let record = enricher.enrich(&address, true, false).await.unwrap().unwrap();
        assert_eq!(record.supply, Some(1_000_000));
        assert_eq!(record.decimals, Some(6));
        assert_eq!(record.holders_distribution.len(), TOP_HOLDERS);
        // Metadata source failed, field stays unset
        assert!(record.metadata.is_none());

        let stored = store.get(&address).await.unwrap().unwrap();
        assert_eq!(stored, record);
        assert_eq!(notifier.0.lock().unwrap().as_slice(), [address]);
    }

    #[tokio::test]
    async fn test_enrich_is_idempotent_modulo_timestamp() {
        let mint = Pubkey::new_unique();
        let address = mint.to_string();

        let mut rpc = StaticRpc::default();
        rpc.mints.insert(
            mint,
            MintInfo {
                mint_authority: None,
                freeze_authority: None,
                supply: 1_000_000,
                decimals: 6,
            },
        );

        let store = Arc::new(InMemoryTokenStore::new());
        store.upsert(TokenRecord::new(&address)).await.unwrap();
        let notifier = Arc::new(CountingNotifier(Default::default()));
        let enricher = enricher_with(rpc, store, notifier);

        let mut first = enricher.enrich(&address, true, false).await.unwrap().unwrap();
        let second = enricher.enrich(&address, true, false).await.unwrap().unwrap();
        first.last_updated_at = second.last_updated_at;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_enrich_gates_on_live_authority() {
        let mint = Pubkey::new_unique();
        let address = mint.to_string();

        let mut rpc = StaticRpc::default();
        rpc.mints.insert(
            mint,
            MintInfo {
                mint_authority: Some(Pubkey::new_unique().to_string()),
                freeze_authority: None,
                supply: 1_000_000,
                decimals: 6,
            },
        );

        let store = Arc::new(InMemoryTokenStore::new());
        store.upsert(TokenRecord::new(&address)).await.unwrap();
        let notifier = Arc::new(CountingNotifier(Default::default()));
        let enricher = enricher_with(rpc, store.clone(), notifier.clone());

        let result = enricher.enrich(&address, true, true).await.unwrap();
        assert!(result.is_none());

        // Gated: the stored record is untouched and nothing was published
        let stored = store.get(&address).await.unwrap().unwrap();
        assert!(stored.mint_authority.is_none());
        assert!(stored.supply.is_none());
        assert!(notifier.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_enrich_degrades_on_holder_failure() {
        let mint = Pubkey::new_unique();
        let address = mint.to_string();

        let mut rpc = StaticRpc::default();
        rpc.mints.insert(
            mint,
            MintInfo {
                mint_authority: None,
                freeze_authority: None,
                supply: 500,
                decimals: 0,
            },
        );
        // no largest_accounts entry: that fetch fails

        let store = Arc::new(InMemoryTokenStore::new());
        store.upsert(TokenRecord::new(&address)).await.unwrap();
        let notifier = Arc::new(CountingNotifier(Default::default()));
        let enricher = enricher_with(rpc, store, notifier);

        let record = enricher.enrich(&address, false, false).await.unwrap().unwrap();
        assert_eq!(record.supply, Some(500));
        assert!(record.holders_distribution.is_empty());
    }
}
