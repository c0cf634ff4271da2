//! Common types used across the application

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Fully-qualified Raydium V4 pool keys, assembled from the
/// pool-initialization transaction plus the OpenBook market account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityPoolKeys {
    pub id: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub lp_mint: Pubkey,
    pub base_decimals: u8,
    pub quote_decimals: u8,
    pub lp_decimals: u8,
    pub version: u8,
    pub program_id: Pubkey,
    pub authority: Pubkey,
    pub open_orders: Pubkey,
    pub target_orders: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub withdraw_queue: Pubkey,
    pub lp_vault: Pubkey,
    pub market_version: u8,
    pub market_program_id: Pubkey,
    pub market_id: Pubkey,
    pub market_authority: Pubkey,
    pub market_base_vault: Pubkey,
    pub market_quote_vault: Pubkey,
    pub market_bids: Pubkey,
    pub market_asks: Pubkey,
    pub market_event_queue: Pubkey,
}

/// One entry of the top-holder distribution, descending by raw amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderBalance {
    pub address: String,
    /// Raw token units
    pub amount: u64,
    /// Amount adjusted for mint decimals
    pub ui_amount: f64,
}

/// Pool economics derived from live vault balances and USD prices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedPoolInfo {
    pub base_token_amount: f64,
    pub quote_token_amount: f64,
    pub base_price_usd: f64,
    pub quote_price_usd: f64,
    pub base_liquidity: f64,
    pub quote_liquidity: f64,
}

/// Descriptive token metadata from the on-chain registry or the fallback list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub image: Option<String>,
    pub is_mutable: bool,
    pub description: Option<String>,
    pub extensions: Option<serde_json::Value>,
}

/// Token record keyed by token address.
///
/// Partial enrichment is valid: every derived field is independently
/// optional and stays unset when its sub-fetch failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token_address: String,
    pub init_tx: Option<String>,
    pub pool_id: Option<String>,
    pub pool_keys: Option<LiquidityPoolKeys>,
    pub mint_authority: Option<String>,
    pub freeze_authority: Option<String>,
    pub supply: Option<u64>,
    pub decimals: Option<u8>,
    pub holders_distribution: Vec<HolderBalance>,
    pub burned_lp_percentage: Option<f64>,
    pub pool_info: Option<ParsedPoolInfo>,
    pub metadata: Option<TokenMetadata>,
    pub lp_reserve: Option<u64>,
    /// Pool open time, epoch seconds
    pub pool_created_at: Option<i64>,
    pub first_seen_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn new(token_address: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            token_address: token_address.into(),
            init_tx: None,
            pool_id: None,
            pool_keys: None,
            mint_authority: None,
            freeze_authority: None,
            supply: None,
            decimals: None,
            holders_distribution: Vec::new(),
            burned_lp_percentage: None,
            pool_info: None,
            metadata: None,
            lp_reserve: None,
            pool_created_at: None,
            first_seen_at: now,
            last_updated_at: now,
        }
    }
}

/// Trade lifecycle status. Terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Pending,
    Success,
    Failed,
}

impl TradeStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TradeStatus::Pending)
    }
}

/// Trade record keyed by transaction id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub tx_id: String,
    pub token_address: String,
    pub input_token: String,
    pub output_token: String,
    pub input_amount: Option<f64>,
    pub output_amount: Option<f64>,
    pub status: TradeStatus,
    pub time_taken_secs: Option<f64>,
    pub is_simulated: bool,
    pub created_at: DateTime<Utc>,
}

/// Confirmation status of a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Success,
    Failed,
}

/// Parsed SPL mint account fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintInfo {
    pub mint_authority: Option<String>,
    pub freeze_authority: Option<String>,
    pub supply: u64,
    pub decimals: u8,
}

/// One token account owned by the wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenAccountInfo {
    pub pubkey: Pubkey,
    pub mint: String,
    pub ui_amount: f64,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub ws_url: String,
    pub commitment: String,
}

/// Trade configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeSettings {
    /// Slippage tolerance in percent
    pub slippage_pct: f64,
    /// Prioritization fee in micro-lamports per compute unit
    pub priority_fee_microlamports: u64,
    /// Confirmation poll interval in milliseconds
    pub confirm_poll_ms: u64,
    /// Optional cap on the confirmation wait. None = wait forever.
    pub confirm_timeout_secs: Option<u64>,
}

/// Bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub network: NetworkConfig,
    pub trade: TradeSettings,
    /// Env var holding the bs58 wallet secret
    pub wallet_secret_env: String,
    pub price_api_url: String,
    /// Fixed delay between consecutive RPC calls, milliseconds
    pub rpc_pacing_ms: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig {
                rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
                ws_url: "wss://api.mainnet-beta.solana.com".to_string(),
                commitment: "finalized".to_string(),
            },
            trade: TradeSettings {
                slippage_pct: 5.0,
                priority_fee_microlamports: 500_000,
                confirm_poll_ms: 5_000,
                confirm_timeout_secs: None,
            },
            wallet_secret_env: "WALLET_PRIVATE_KEY".to_string(),
            price_api_url: "https://price.jup.ag/v4".to_string(),
            rpc_pacing_ms: 500,
        }
    }
}
