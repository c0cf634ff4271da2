//! Pool key assembly and live pool economics
//!
//! Combines the init-transaction parse with on-chain account reads to
//! produce fully-qualified [`LiquidityPoolKeys`], and reads vault state for
//! reserve math and pricing.

use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use crate::domain::pool::event_parser::{PoolEventParser, PoolInitEvent};
use crate::domain::pool::layouts::{
    amm_associated_authority, market_associated_authority, MarketStateV3, OpenOrdersState,
    RaydiumV4PoolState,
};
use crate::infrastructure::rpc::ChainRpc;
use crate::shared::constants::{RAYDIUM_POOL_V4_PROGRAM_ID, WSOL_MINT};
use crate::shared::errors::AppError;
use crate::shared::types::LiquidityPoolKeys;
use crate::shared::utils::ui_amount;

pub struct PoolManager {
    rpc: Arc<dyn ChainRpc>,
    parser: PoolEventParser,
}

impl PoolManager {
    pub fn new(rpc: Arc<dyn ChainRpc>) -> Self {
        Self {
            rpc,
            parser: PoolEventParser::new(RAYDIUM_POOL_V4_PROGRAM_ID, 4),
        }
    }

    /// Assemble full pool keys from a pool-init transaction signature.
    ///
    /// Returns the keys plus the pool open time and minted LP supply, which
    /// only exist in the init transaction.
    pub async fn fetch_pool_keys_for_init_tx(
        &self,
        signature: &str,
    ) -> Result<(LiquidityPoolKeys, i64, u64), AppError> {
        let tx = self.rpc.get_parsed_transaction(signature).await?;
        let event = self.parser.parse(&tx)?;

        let market_data = self.rpc.get_account_data(&event.market_id).await?;
        let market = MarketStateV3::decode(&market_data)?;

        let keys = self.assemble_keys(&event, &market)?;
        Ok((keys, event.open_time, event.lp_reserve))
    }

    /// Look up an existing pool for a mint pair via program-account filters.
    /// Both orientations of the pair are tried.
    pub async fn pool_keys_by_pair(
        &self,
        base_mint: &Pubkey,
        quote_mint: &Pubkey,
    ) -> Result<LiquidityPoolKeys, AppError> {
        let mut accounts = self.pools_by_mints(base_mint, quote_mint).await?;
        if accounts.is_empty() {
            accounts = self.pools_by_mints(quote_mint, base_mint).await?;
        }
        let (pool_id, data) = accounts.into_iter().next().ok_or_else(|| {
            AppError::NotFound(format!("pool for pair {}/{}", base_mint, quote_mint))
        })?;
        debug!(pool = %pool_id, "resolved pool for pair");
        self.pool_keys_by_id(&pool_id, &data).await
    }

    /// Effective base/quote reserves in ui units: vault balances plus the
    /// open-orders totals, minus the protocol's pending PnL take.
    pub async fn vaults_info(&self, keys: &LiquidityPoolKeys) -> Result<(f64, f64), AppError> {
        let state_data = self.rpc.get_account_data(&keys.id).await?;
        let state = RaydiumV4PoolState::decode(&state_data)?;

        let oo_data = self.rpc.get_account_data(&keys.open_orders).await?;
        let open_orders = OpenOrdersState::decode(&oo_data)?;

        let base_vault_balance = self.rpc.get_token_account_balance(&keys.base_vault).await?;
        let quote_vault_balance = self
            .rpc
            .get_token_account_balance(&keys.quote_vault)
            .await?;

        let base_decimals = state.base_decimal as u8;
        let quote_decimals = state.quote_decimal as u8;

        let base = base_vault_balance + ui_amount(open_orders.base_token_total, base_decimals)
            - ui_amount(state.base_need_take_pnl, base_decimals);
        let quote = quote_vault_balance + ui_amount(open_orders.quote_token_total, quote_decimals)
            - ui_amount(state.quote_need_take_pnl, quote_decimals);

        Ok((base, quote))
    }

    /// Spot price of the pool's non-SOL token, denominated in SOL.
    /// Returns 0.0 when the pool cannot be read, so price displays degrade
    /// instead of failing the caller.
    pub async fn token_price_in_sol(&self, pool_id: &Pubkey) -> f64 {
        match self.token_price_in_sol_inner(pool_id).await {
            Ok(price) => price,
            Err(err) => {
                debug!(pool = %pool_id, error = %err, "price lookup failed");
                0.0
            }
        }
    }

    async fn token_price_in_sol_inner(&self, pool_id: &Pubkey) -> Result<f64, AppError> {
        let state_data = self.rpc.get_account_data(pool_id).await?;
        let state = RaydiumV4PoolState::decode(&state_data)?;

        let base_balance = self.rpc.get_token_account_balance(&state.base_vault).await?;
        let quote_balance = self
            .rpc
            .get_token_account_balance(&state.quote_vault)
            .await?;

        let (sol_side, token_side) = if state.base_mint == WSOL_MINT {
            (base_balance, quote_balance)
        } else {
            (quote_balance, base_balance)
        };
        if token_side == 0.0 {
            return Ok(0.0);
        }
        Ok(sol_side / token_side)
    }

    async fn pools_by_mints(
        &self,
        base_mint: &Pubkey,
        quote_mint: &Pubkey,
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, AppError> {
        self.rpc
            .get_program_accounts_with_filters(
                &RAYDIUM_POOL_V4_PROGRAM_ID,
                RaydiumV4PoolState::LEN as u64,
                vec![
                    (
                        RaydiumV4PoolState::BASE_MINT_OFFSET,
                        base_mint.to_bytes().to_vec(),
                    ),
                    (
                        RaydiumV4PoolState::QUOTE_MINT_OFFSET,
                        quote_mint.to_bytes().to_vec(),
                    ),
                ],
            )
            .await
    }

    /// Build keys from a fetched pool state account
    async fn pool_keys_by_id(
        &self,
        pool_id: &Pubkey,
        state_data: &[u8],
    ) -> Result<LiquidityPoolKeys, AppError> {
        let state = RaydiumV4PoolState::decode(state_data)?;

        let market_data = self.rpc.get_account_data(&state.market_id).await?;
        let market = MarketStateV3::decode(&market_data)?;

        let lp_mint_info = self.rpc.get_mint_info(&state.lp_mint).await?;

        let market_authority = market_associated_authority(&state.market_program_id, &state.market_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("market vault-signer authority for {}", state.market_id))
            })?;

        Ok(LiquidityPoolKeys {
            id: *pool_id,
            base_mint: state.base_mint,
            quote_mint: state.quote_mint,
            lp_mint: state.lp_mint,
            base_decimals: state.base_decimal as u8,
            quote_decimals: state.quote_decimal as u8,
            lp_decimals: lp_mint_info.decimals,
            version: 4,
            program_id: RAYDIUM_POOL_V4_PROGRAM_ID,
            authority: amm_associated_authority(&RAYDIUM_POOL_V4_PROGRAM_ID),
            open_orders: state.open_orders,
            target_orders: state.target_orders,
            base_vault: state.base_vault,
            quote_vault: state.quote_vault,
            withdraw_queue: state.withdraw_queue,
            lp_vault: state.lp_vault,
            market_version: 3,
            market_program_id: state.market_program_id,
            market_id: state.market_id,
            market_authority,
            market_base_vault: market.base_vault,
            market_quote_vault: market.quote_vault,
            market_bids: market.bids,
            market_asks: market.asks,
            market_event_queue: market.event_queue,
        })
    }

    fn assemble_keys(
        &self,
        event: &PoolInitEvent,
        market: &MarketStateV3,
    ) -> Result<LiquidityPoolKeys, AppError> {
        let market_authority =
            market_associated_authority(&event.market_program_id, &event.market_id).ok_or_else(
                || {
                    AppError::NotFound(format!(
                        "market vault-signer authority for {}",
                        event.market_id
                    ))
                },
            )?;

        Ok(LiquidityPoolKeys {
            id: event.id,
            base_mint: event.base_mint,
            quote_mint: event.quote_mint,
            lp_mint: event.lp_mint,
            base_decimals: event.base_decimals,
            quote_decimals: event.quote_decimals,
            lp_decimals: event.lp_decimals,
            version: event.version,
            program_id: event.program_id,
            authority: event.authority,
            open_orders: event.open_orders,
            target_orders: event.target_orders,
            base_vault: event.base_vault,
            quote_vault: event.quote_vault,
            withdraw_queue: event.withdraw_queue,
            lp_vault: event.lp_vault,
            market_version: 3,
            market_program_id: event.market_program_id,
            market_id: event.market_id,
            market_authority,
            market_base_vault: market.base_vault,
            market_quote_vault: market.quote_vault,
            market_bids: market.bids,
            market_asks: market.asks,
            market_event_queue: market.event_queue,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::rpc::testing::StaticRpc;

    fn pool_state_bytes(
        base_mint: &Pubkey,
        quote_mint: &Pubkey,
        base_vault: &Pubkey,
        quote_vault: &Pubkey,
        base_decimals: u64,
        quote_decimals: u64,
        base_need_take_pnl: u64,
        quote_need_take_pnl: u64,
    ) -> Vec<u8> {
        let mut buf = vec![0u8; RaydiumV4PoolState::LEN];
        buf[32..40].copy_from_slice(&base_decimals.to_le_bytes());
        buf[40..48].copy_from_slice(&quote_decimals.to_le_bytes());
        buf[192..200].copy_from_slice(&base_need_take_pnl.to_le_bytes());
        buf[200..208].copy_from_slice(&quote_need_take_pnl.to_le_bytes());
        buf[336..368].copy_from_slice(base_vault.as_ref());
        buf[368..400].copy_from_slice(quote_vault.as_ref());
        buf[400..432].copy_from_slice(base_mint.as_ref());
        buf[432..464].copy_from_slice(quote_mint.as_ref());
        buf
    }

    fn open_orders_bytes(base_total: u64, quote_total: u64) -> Vec<u8> {
        let mut buf = vec![0u8; 200];
        buf[85..93].copy_from_slice(&base_total.to_le_bytes());
        buf[101..109].copy_from_slice(&quote_total.to_le_bytes());
        buf
    }

    fn keys_for(pool_id: Pubkey, base_vault: Pubkey, quote_vault: Pubkey) -> LiquidityPoolKeys {
        LiquidityPoolKeys {
            id: pool_id,
            base_mint: Pubkey::new_unique(),
            quote_mint: WSOL_MINT,
            lp_mint: Pubkey::new_unique(),
            base_decimals: 6,
            quote_decimals: 9,
            lp_decimals: 9,
            version: 4,
            program_id: RAYDIUM_POOL_V4_PROGRAM_ID,
            authority: Pubkey::new_unique(),
            open_orders: Pubkey::new_unique(),
            target_orders: Pubkey::new_unique(),
            base_vault,
            quote_vault,
            withdraw_queue: Pubkey::new_unique(),
            lp_vault: Pubkey::new_unique(),
            market_version: 3,
            market_program_id: Pubkey::new_unique(),
            market_id: Pubkey::new_unique(),
            market_authority: Pubkey::new_unique(),
            market_base_vault: Pubkey::new_unique(),
            market_quote_vault: Pubkey::new_unique(),
            market_bids: Pubkey::new_unique(),
            market_asks: Pubkey::new_unique(),
            market_event_queue: Pubkey::new_unique(),
        }
    }

    #[tokio::test]
    async fn test_vaults_info_subtracts_pending_pnl() {
        let pool_id = Pubkey::new_unique();
        let base_vault = Pubkey::new_unique();
        let quote_vault = Pubkey::new_unique();
        let keys = keys_for(pool_id, base_vault, quote_vault);

        let mut rpc = StaticRpc::default();
        rpc.accounts.insert(
            pool_id,
            pool_state_bytes(
                &keys.base_mint,
                &WSOL_MINT,
                &base_vault,
                &quote_vault,
                6,
                9,
                2_000_000,     // 2.0 base units pending
                1_000_000_000, // 1.0 SOL pending
            ),
        );
        rpc.accounts
            .insert(keys.open_orders, open_orders_bytes(5_000_000, 3_000_000_000));
        rpc.token_balances.insert(base_vault, 100.0);
        rpc.token_balances.insert(quote_vault, 50.0);

        let manager = PoolManager::new(Arc::new(rpc));
        let (base, quote) = manager.vaults_info(&keys).await.unwrap();

        // 100 + 5 - 2, 50 + 3 - 1
        assert!((base - 103.0).abs() < 1e-9);
        assert!((quote - 52.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_token_price_in_sol() {
        let pool_id = Pubkey::new_unique();
        let base_vault = Pubkey::new_unique();
        let quote_vault = Pubkey::new_unique();
        let token_mint = Pubkey::new_unique();

        let mut rpc = StaticRpc::default();
        rpc.accounts.insert(
            pool_id,
            pool_state_bytes(&token_mint, &WSOL_MINT, &base_vault, &quote_vault, 6, 9, 0, 0),
        );
        rpc.token_balances.insert(base_vault, 1_000_000.0);
        rpc.token_balances.insert(quote_vault, 500.0);

        let manager = PoolManager::new(Arc::new(rpc));
        let price = manager.token_price_in_sol(&pool_id).await;
        assert!((price - 0.0005).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_token_price_degrades_to_zero() {
        let manager = PoolManager::new(Arc::new(StaticRpc::default()));
        let price = manager.token_price_in_sol(&Pubkey::new_unique()).await;
        assert_eq!(price, 0.0);
    }
}
