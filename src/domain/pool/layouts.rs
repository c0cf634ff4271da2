//! Raw on-chain account layouts for Raydium V4 and OpenBook
//!
//! Fixed little-endian layouts decoded with borsh. Field order is the
//! contract; offsets used for memcmp filters are derived from it and pinned
//! as consts next to the structs.

use borsh::BorshDeserialize;
use solana_sdk::pubkey::Pubkey;

use crate::shared::errors::ParseError;

/// Raydium V4 liquidity pool state account (752 bytes)
#[derive(Debug, Clone, BorshDeserialize)]
pub struct RaydiumV4PoolState {
    pub status: u64,
    pub nonce: u64,
    pub max_order: u64,
    pub depth: u64,
    pub base_decimal: u64,
    pub quote_decimal: u64,
    pub state: u64,
    pub reset_flag: u64,
    pub min_size: u64,
    pub vol_max_cut_ratio: u64,
    pub amount_wave_ratio: u64,
    pub base_lot_size: u64,
    pub quote_lot_size: u64,
    pub min_price_multiplier: u64,
    pub max_price_multiplier: u64,
    pub system_decimal_value: u64,
    pub min_separate_numerator: u64,
    pub min_separate_denominator: u64,
    pub trade_fee_numerator: u64,
    pub trade_fee_denominator: u64,
    pub pnl_numerator: u64,
    pub pnl_denominator: u64,
    pub swap_fee_numerator: u64,
    pub swap_fee_denominator: u64,
    pub base_need_take_pnl: u64,
    pub quote_need_take_pnl: u64,
    pub quote_total_pnl: u64,
    pub base_total_pnl: u64,
    pub pool_open_time: u64,
    pub punish_pc_amount: u64,
    pub punish_coin_amount: u64,
    pub orderbook_to_init_time: u64,
    pub swap_base_in_amount: u128,
    pub swap_quote_out_amount: u128,
    pub swap_base2_quote_fee: u64,
    pub swap_quote_in_amount: u128,
    pub swap_base_out_amount: u128,
    pub swap_quote2_base_fee: u64,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub lp_mint: Pubkey,
    pub open_orders: Pubkey,
    pub market_id: Pubkey,
    pub market_program_id: Pubkey,
    pub target_orders: Pubkey,
    pub withdraw_queue: Pubkey,
    pub lp_vault: Pubkey,
    pub owner: Pubkey,
    pub lp_reserve: u64,
    pub padding: [u64; 3],
}

impl RaydiumV4PoolState {
    pub const LEN: usize = 752;
    /// memcmp offsets, pinned to the V4 layout
    pub const BASE_MINT_OFFSET: usize = 400;
    pub const QUOTE_MINT_OFFSET: usize = 432;

    pub fn decode(data: &[u8]) -> Result<Self, ParseError> {
        if data.len() < Self::LEN {
            return Err(ParseError::AccountDataTooShort {
                have: data.len(),
                need: Self::LEN,
            });
        }
        Self::deserialize(&mut &data[..])
            .map_err(|_| ParseError::InvalidField("raydium v4 pool state"))
    }
}

/// OpenBook market state v3. Only the prefix through `asks` is decoded;
/// the 5-byte account padding and trailing lot sizes ride along untyped.
#[derive(Debug, Clone, BorshDeserialize)]
pub struct MarketStateV3 {
    pub head_padding: [u8; 5],
    pub account_flags: u64,
    pub own_address: Pubkey,
    pub vault_signer_nonce: u64,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub base_vault: Pubkey,
    pub base_deposits_total: u64,
    pub base_fees_accrued: u64,
    pub quote_vault: Pubkey,
    pub quote_deposits_total: u64,
    pub quote_fees_accrued: u64,
    pub quote_dust_threshold: u64,
    pub request_queue: Pubkey,
    pub event_queue: Pubkey,
    pub bids: Pubkey,
    pub asks: Pubkey,
}

impl MarketStateV3 {
    /// Decoded prefix length
    pub const MIN_LEN: usize = 349;

    pub fn decode(data: &[u8]) -> Result<Self, ParseError> {
        if data.len() < Self::MIN_LEN {
            return Err(ParseError::AccountDataTooShort {
                have: data.len(),
                need: Self::MIN_LEN,
            });
        }
        Self::deserialize(&mut &data[..]).map_err(|_| ParseError::InvalidField("market state v3"))
    }
}

/// OpenBook open-orders account, decoded prefix only
#[derive(Debug, Clone, BorshDeserialize)]
pub struct OpenOrdersState {
    pub head_padding: [u8; 5],
    pub account_flags: u64,
    pub market: Pubkey,
    pub owner: Pubkey,
    pub base_token_free: u64,
    pub base_token_total: u64,
    pub quote_token_free: u64,
    pub quote_token_total: u64,
}

impl OpenOrdersState {
    pub const MIN_LEN: usize = 109;

    pub fn decode(data: &[u8]) -> Result<Self, ParseError> {
        if data.len() < Self::MIN_LEN {
            return Err(ParseError::AccountDataTooShort {
                have: data.len(),
                need: Self::MIN_LEN,
            });
        }
        Self::deserialize(&mut &data[..]).map_err(|_| ParseError::InvalidField("open orders"))
    }
}

/// Raydium AMM authority PDA, seed "amm authority"
pub fn amm_associated_authority(program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[b"amm authority"], program_id).0
}

/// OpenBook vault-signer authority: first nonce under 100 yielding a valid
/// program address for seeds [market_id, nonce as u64 le].
pub fn market_associated_authority(program_id: &Pubkey, market_id: &Pubkey) -> Option<Pubkey> {
    for nonce in 0u64..100 {
        let seeds: &[&[u8]] = &[market_id.as_ref(), &nonce.to_le_bytes()];
        if let Ok(authority) = Pubkey::create_program_address(seeds, program_id) {
            return Some(authority);
        }
    }
    None
}
