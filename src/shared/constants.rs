//! Well-known program and mint addresses

use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;

/// Raydium liquidity pool V4 program
pub const RAYDIUM_POOL_V4_PROGRAM_ID: Pubkey =
    pubkey!("675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8");

/// Metaplex token metadata program
pub const TOKEN_METADATA_PROGRAM_ID: Pubkey =
    pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

/// Wrapped SOL mint
pub const WSOL_MINT: Pubkey = pubkey!("So11111111111111111111111111111111111111112");

pub const SOL_DECIMALS: u8 = 9;

/// Log line marker emitted by the pool-initialization instruction
pub const POOL_INIT_LOG_MARKER: &str = "initialize2";

/// Log line carrying the pool open-time payload
pub const POOL_OPEN_TIME_LOG_NEEDLE: &str = "init_pc_amount";
