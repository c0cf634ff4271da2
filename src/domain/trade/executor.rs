//! Trade orchestration
//!
//! Drives the full swap flow: balance and risk gating, quoting against live
//! reserves, build/sign/submit, then a polling confirmation loop. Dry runs
//! go through simulation instead of submission and record a synthetic trade
//! id so the trade history stays uniform.

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use solana_sdk::pubkey::Pubkey;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::pool::manager::PoolManager;
use crate::domain::token::risk::{RiskEvaluator, RiskFlag};
use crate::domain::trade::swap::{build_swap_transaction, SwapParams};
use crate::infrastructure::rpc::ChainRpc;
use crate::infrastructure::store::{TokenStore, TradeStore, TradeUpdate};
use crate::infrastructure::wallet::WalletManager;
use crate::shared::constants::WSOL_MINT;
use crate::shared::errors::{AppError, ParseError, SwapError};
use crate::shared::types::{
    LiquidityPoolKeys, TokenRecord, TradeRecord, TradeSettings, TradeStatus, TxStatus,
};
use crate::shared::utils::now_epoch_secs;

/// Gain over the entry price that triggers a sell
const TAKE_PROFIT_PCT: f64 = 20.0;

#[derive(Debug)]
pub enum TradeOutcome {
    /// Preconditions not met, nothing was recorded
    Skipped(String),
    /// Risk checks raised flags, nothing was recorded
    RiskRejected(Vec<RiskFlag>),
    Completed {
        tx_id: String,
        status: TradeStatus,
        time_taken_secs: f64,
    },
}

pub struct TradeExecutor {
    rpc: Arc<dyn ChainRpc>,
    tokens: Arc<dyn TokenStore>,
    trades: Arc<dyn TradeStore>,
    pools: Arc<PoolManager>,
    wallet: Arc<WalletManager>,
    settings: TradeSettings,
}

impl TradeExecutor {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        tokens: Arc<dyn TokenStore>,
        trades: Arc<dyn TradeStore>,
        pools: Arc<PoolManager>,
        wallet: Arc<WalletManager>,
        settings: TradeSettings,
    ) -> Self {
        Self {
            rpc,
            tokens,
            trades,
            pools,
            wallet,
            settings,
        }
    }

    /// Swap between SOL and `mint`. `to_token` buys, otherwise sells.
    /// With `execute_swap` off the transaction is only simulated. A token
    /// with no stored record gets a minimal one once its pool resolves.
    pub async fn trade(
        &self,
        mint: &str,
        to_token: bool,
        amount_ui: f64,
        check_risk_flags: bool,
        execute_swap: bool,
    ) -> Result<TradeOutcome, AppError> {
        let mint_key = Pubkey::from_str(mint)
            .map_err(|_| AppError::Parse(ParseError::InvalidField("token address")))?;
        let record = match self.tokens.get(mint).await? {
            Some(record) => record,
            // First trade attempt on an unseen token creates a minimal record
            None => match self.pools.pool_keys_by_pair(&mint_key, &WSOL_MINT).await {
                Ok(keys) => {
                    let mut record = TokenRecord::new(mint.to_string());
                    record.pool_id = Some(keys.id.to_string());
                    record.pool_keys = Some(keys);
                    self.tokens.upsert(record.clone()).await?;
                    record
                }
                Err(err) if err.is_not_found() => {
                    return Ok(TradeOutcome::Skipped("no pool found for token".to_string()))
                }
                Err(err) => return Err(err),
            },
        };

        if check_risk_flags {
            let flags = RiskEvaluator::evaluate(&record, now_epoch_secs());
            if !flags.is_empty() {
                return Ok(TradeOutcome::RiskRejected(flags));
            }
        }

        if to_token {
            let sol = self.wallet.sol_balance(&self.rpc).await?;
            if sol < amount_ui {
                return Ok(TradeOutcome::Skipped(format!(
                    "insufficient SOL balance: have {sol}, need {amount_ui}"
                )));
            }
        } else {
            let tokens = self.wallet.token_balance(&self.rpc, &mint_key).await?;
            if tokens < amount_ui {
                return Ok(TradeOutcome::Skipped(format!(
                    "insufficient token balance: have {tokens}, need {amount_ui}"
                )));
            }
        }

        let keys = match record.pool_keys.clone() {
            Some(keys) => keys,
            None => match self.pools.pool_keys_by_pair(&mint_key, &WSOL_MINT).await {
                Ok(keys) => {
                    // Resolved keys are persisted so later calls skip the lookup
                    let mut updated = record.clone();
                    updated.pool_id = Some(keys.id.to_string());
                    updated.pool_keys = Some(keys.clone());
                    updated.last_updated_at = Utc::now();
                    self.tokens.upsert(updated).await?;
                    keys
                }
                Err(err) if err.is_not_found() => {
                    return Ok(TradeOutcome::Skipped("no pool found for token".to_string()))
                }
                Err(err) => return Err(err),
            },
        };

        let started = Instant::now();
        match self
            .run_swap(mint, &keys, to_token, amount_ui, execute_swap, started)
            .await
        {
            Ok(outcome) => Ok(outcome),
            // Swap failures resolve to a Failed trade record, they never
            // escape this boundary.
            Err((tx_id, err)) => {
                warn!(token = mint, error = %err, "swap flow failed");
                let time_taken = started.elapsed().as_secs_f64();
                let (input_token, output_token) = Self::trade_pair(mint, to_token);
                let tx_id = match tx_id {
                    Some(id) => {
                        self.trades
                            .update(
                                &id,
                                TradeUpdate {
                                    status: Some(TradeStatus::Failed),
                                    time_taken_secs: Some(time_taken),
                                    ..TradeUpdate::default()
                                },
                            )
                            .await?;
                        id
                    }
                    None => {
                        let id = Uuid::new_v4().to_string();
                        self.trades
                            .insert(TradeRecord {
                                tx_id: id.clone(),
                                token_address: mint.to_string(),
                                input_token,
                                output_token,
                                input_amount: Some(amount_ui),
                                output_amount: None,
                                status: TradeStatus::Failed,
                                time_taken_secs: Some(time_taken),
                                is_simulated: !execute_swap,
                                created_at: Utc::now(),
                            })
                            .await?;
                        id
                    }
                };
                Ok(TradeOutcome::Completed {
                    tx_id,
                    status: TradeStatus::Failed,
                    time_taken_secs: time_taken,
                })
            }
        }
    }

    fn trade_pair(mint: &str, to_token: bool) -> (String, String) {
        if to_token {
            (WSOL_MINT.to_string(), mint.to_string())
        } else {
            (mint.to_string(), WSOL_MINT.to_string())
        }
    }

    /// Quote, build, submit and confirm. Errors carry the trade id when one
    /// was already persisted so the caller can finalize the record.
    async fn run_swap(
        &self,
        mint: &str,
        keys: &LiquidityPoolKeys,
        to_token: bool,
        amount_ui: f64,
        execute_swap: bool,
        started: Instant,
    ) -> Result<TradeOutcome, (Option<String>, AppError)> {
        let (base_reserve, quote_reserve) = self
            .pools
            .vaults_info(keys)
            .await
            .map_err(|e| (None, e))?;
        let blockhash = self
            .rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| (None, e))?;

        let built = build_swap_transaction(SwapParams {
            keys,
            wallet: self.wallet.keypair(),
            amount_in_ui: amount_ui,
            sol_to_token: to_token,
            slippage_pct: self.settings.slippage_pct,
            priority_fee_microlamports: self.settings.priority_fee_microlamports,
            base_reserve_ui: base_reserve,
            quote_reserve_ui: quote_reserve,
            blockhash,
        })
        .map_err(|e| (None, AppError::Swap(e)))?;

        let (input_token, output_token) = Self::trade_pair(mint, to_token);

        if !execute_swap {
            self.rpc
                .simulate_transaction(&built.transaction)
                .await
                .map_err(|e| (None, e))?;
            let tx_id = Uuid::new_v4().to_string();
            let time_taken = started.elapsed().as_secs_f64();
            self.trades
                .insert(TradeRecord {
                    tx_id: tx_id.clone(),
                    token_address: mint.to_string(),
                    input_token,
                    output_token,
                    input_amount: Some(amount_ui),
                    output_amount: Some(built.expected_out_ui),
                    status: TradeStatus::Success,
                    time_taken_secs: Some(time_taken),
                    is_simulated: true,
                    created_at: Utc::now(),
                })
                .await
                .map_err(|e| (None, e))?;
            info!(token = mint, tx_id, "simulated swap recorded");
            return Ok(TradeOutcome::Completed {
                tx_id,
                status: TradeStatus::Success,
                time_taken_secs: time_taken,
            });
        }

        let tx_id = self
            .rpc
            .send_transaction(&built.transaction)
            .await
            .map_err(|e| (None, e))?;
        self.trades
            .insert(TradeRecord {
                tx_id: tx_id.clone(),
                token_address: mint.to_string(),
                input_token,
                output_token,
                input_amount: Some(amount_ui),
                output_amount: Some(built.expected_out_ui),
                status: TradeStatus::Pending,
                time_taken_secs: None,
                is_simulated: false,
                created_at: Utc::now(),
            })
            .await
            .map_err(|e| (None, e))?;
        info!(token = mint, tx_id, "swap submitted");

        let status = self
            .await_confirmation(&tx_id, started)
            .await
            .map_err(|e| (Some(tx_id.clone()), e))?;
        let time_taken = started.elapsed().as_secs_f64();
        self.trades
            .update(
                &tx_id,
                TradeUpdate {
                    status: Some(status),
                    time_taken_secs: Some(time_taken),
                    ..TradeUpdate::default()
                },
            )
            .await
            .map_err(|e| (Some(tx_id.clone()), e))?;

        Ok(TradeOutcome::Completed {
            tx_id,
            status,
            time_taken_secs: time_taken,
        })
    }

    /// True when the latest successful buy of `mint` is up more than the
    /// take-profit threshold at current pool prices.
    pub async fn should_sell(&self, mint: &str) -> Result<bool, AppError> {
        let record = self
            .tokens
            .get(mint)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("token {mint}")))?;
        let pool_id = match record.pool_keys.as_ref() {
            Some(keys) => keys.id,
            None => return Ok(false),
        };

        let entry = match self.trades.latest_for_token(mint).await? {
            Some(trade)
                if trade.status == TradeStatus::Success && trade.output_token == *mint =>
            {
                trade
            }
            _ => return Ok(false),
        };
        let (sol_in, tokens_out) = match (entry.input_amount, entry.output_amount) {
            (Some(sol), Some(tokens)) if tokens > 0.0 => (sol, tokens),
            _ => return Ok(false),
        };
        let entry_price = sol_in / tokens_out;

        let current_price = self.pools.token_price_in_sol(&pool_id).await;
        if current_price == 0.0 {
            return Ok(false);
        }
        Ok(current_price > entry_price * (1.0 + TAKE_PROFIT_PCT / 100.0))
    }

    async fn await_confirmation(
        &self,
        tx_id: &str,
        started: Instant,
    ) -> Result<TradeStatus, AppError> {
        let poll = Duration::from_millis(self.settings.confirm_poll_ms);
        loop {
            if let Some(timeout_secs) = self.settings.confirm_timeout_secs {
                if started.elapsed() >= Duration::from_secs(timeout_secs) {
                    return Err(AppError::Swap(SwapError::ConfirmationTimeout(timeout_secs)));
                }
            }

            match self.rpc.get_transaction_status(tx_id).await? {
                TxStatus::Success => return Ok(TradeStatus::Success),
                TxStatus::Failed => return Ok(TradeStatus::Failed),
                TxStatus::Pending => tokio::time::sleep(poll).await,
            }
        }
    }
}
