//! Typed command surface
//!
//! One closed enum of operations the bot can run on demand, dispatched by
//! [`CommandExecutor`]. Each variant maps to exactly one domain call and
//! returns a typed output, so callers never pattern-match on strings.

use std::str::FromStr;
use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;

use crate::domain::pool::manager::PoolManager;
use crate::domain::token::enricher::TokenEnricher;
use crate::domain::token::risk::{RiskEvaluator, RiskFlag};
use crate::domain::trade::executor::{TradeExecutor, TradeOutcome};
use crate::infrastructure::rpc::ChainRpc;
use crate::infrastructure::store::TokenStore;
use crate::infrastructure::wallet::WalletManager;
use crate::shared::errors::{AppError, ParseError};
use crate::shared::types::{LiquidityPoolKeys, TokenAccountInfo, TokenRecord};
use crate::shared::utils::now_epoch_secs;

#[derive(Debug, Clone)]
pub enum ChainCommand {
    /// Full re-enrichment, metadata included, no authority gate
    RefreshToken { address: String },
    /// Evaluate the risk heuristics against the stored record
    RedFlags { address: String },
    Trade {
        address: String,
        to_token: bool,
        amount_ui: f64,
        check_risk_flags: bool,
        execute_swap: bool,
    },
    PoolKeysByPair { base: String, quote: String },
    /// Spot price in SOL from live vault balances
    TokenPrice { pool_id: String },
    WalletBalance,
    TokenAccounts,
}

#[derive(Debug)]
pub enum CommandOutput {
    Token(Option<TokenRecord>),
    RedFlags(Vec<RiskFlag>),
    Trade(TradeOutcome),
    PoolKeys(LiquidityPoolKeys),
    Price(f64),
    SolBalance(f64),
    TokenAccounts(Vec<TokenAccountInfo>),
}

pub struct CommandExecutor {
    rpc: Arc<dyn ChainRpc>,
    tokens: Arc<dyn TokenStore>,
    pools: Arc<PoolManager>,
    enricher: Arc<TokenEnricher>,
    trader: Arc<TradeExecutor>,
    wallet: Arc<WalletManager>,
}

impl CommandExecutor {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        tokens: Arc<dyn TokenStore>,
        pools: Arc<PoolManager>,
        enricher: Arc<TokenEnricher>,
        trader: Arc<TradeExecutor>,
        wallet: Arc<WalletManager>,
    ) -> Self {
        Self {
            rpc,
            tokens,
            pools,
            enricher,
            trader,
            wallet,
        }
    }

    pub async fn execute(&self, command: ChainCommand) -> Result<CommandOutput, AppError> {
        match command {
            ChainCommand::RefreshToken { address } => {
                let record = self.enricher.enrich(&address, true, false).await?;
                Ok(CommandOutput::Token(record))
            }
            ChainCommand::RedFlags { address } => {
                let record = self
                    .tokens
                    .get(&address)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("token {address}")))?;
                Ok(CommandOutput::RedFlags(RiskEvaluator::evaluate(
                    &record,
                    now_epoch_secs(),
                )))
            }
            ChainCommand::Trade {
                address,
                to_token,
                amount_ui,
                check_risk_flags,
                execute_swap,
            } => {
                let outcome = self
                    .trader
                    .trade(&address, to_token, amount_ui, check_risk_flags, execute_swap)
                    .await?;
                Ok(CommandOutput::Trade(outcome))
            }
            ChainCommand::PoolKeysByPair { base, quote } => {
                let base = parse_pubkey(&base)?;
                let quote = parse_pubkey(&quote)?;
                let keys = self.pools.pool_keys_by_pair(&base, &quote).await?;
                Ok(CommandOutput::PoolKeys(keys))
            }
            ChainCommand::TokenPrice { pool_id } => {
                let pool_id = parse_pubkey(&pool_id)?;
                Ok(CommandOutput::Price(
                    self.pools.token_price_in_sol(&pool_id).await,
                ))
            }
            ChainCommand::WalletBalance => Ok(CommandOutput::SolBalance(
                self.wallet.sol_balance(&self.rpc).await?,
            )),
            ChainCommand::TokenAccounts => Ok(CommandOutput::TokenAccounts(
                self.wallet.token_accounts(&self.rpc).await?,
            )),
        }
    }
}

fn parse_pubkey(value: &str) -> Result<Pubkey, AppError> {
    Pubkey::from_str(value).map_err(|_| AppError::Parse(ParseError::InvalidField("pubkey")))
}
