//! Pool-initialization transaction parser
//!
//! Extracts pool identity and economics from the Raydium V4 `initialize2`
//! transaction. Account positions inside the init instruction are an ABI
//! contract of one on-chain program version, so they live in a versioned
//! lookup table rather than inline literals.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;

use crate::shared::constants::{POOL_OPEN_TIME_LOG_NEEDLE, SOL_DECIMALS, WSOL_MINT};
use crate::shared::errors::ParseError;
use crate::shared::tx::{ParsedConfirmedTx, ParsedInstruction, TxInstruction};

/// Account positions inside the pool-init instruction, per program version
#[derive(Debug, Clone, Copy)]
pub struct InitAccountIndexes {
    pub pool_id: usize,
    pub authority: usize,
    pub open_orders: usize,
    pub lp_mint: usize,
    pub base_mint: usize,
    pub quote_mint: usize,
    pub base_vault: usize,
    pub quote_vault: usize,
    pub target_orders: usize,
    pub market_program_id: usize,
    pub market_id: usize,
}

const INIT_ACCOUNTS_V4: InitAccountIndexes = InitAccountIndexes {
    pool_id: 4,
    authority: 5,
    open_orders: 6,
    lp_mint: 7,
    base_mint: 8,
    quote_mint: 9,
    base_vault: 10,
    quote_vault: 11,
    target_orders: 13,
    market_program_id: 15,
    market_id: 16,
};

/// Lookup the account table for an AMM program version
pub fn init_account_indexes(version: u8) -> Result<&'static InitAccountIndexes, ParseError> {
    match version {
        4 => Ok(&INIT_ACCOUNTS_V4),
        other => Err(ParseError::UnsupportedVersion(other)),
    }
}

/// Everything derivable from the init transaction alone. The OpenBook
/// market account is fetched separately to complete the pool keys.
#[derive(Debug, Clone)]
pub struct PoolInitEvent {
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
    pub market_program_id: Pubkey,
    pub market_id: Pubkey,
    pub base_reserve: u64,
    pub quote_reserve: u64,
    pub lp_reserve: u64,
    /// Pool open time, epoch seconds
    pub open_time: i64,
}

/// The ray_log line uses relaxed object-literal syntax; the payload decoded
/// out of it after repair.
#[derive(Debug, Deserialize)]
struct InitLogEntry {
    open_time: i64,
}

static BARE_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([{,])\s*([a-zA-Z_][a-zA-Z0-9_]*)\s*:").expect("static regex"));

/// Quote bare identifier keys so the relaxed object literal becomes strict JSON
pub fn fix_relaxed_json(relaxed: &str) -> String {
    BARE_KEY_RE.replace_all(relaxed, "$1\"$2\":").into_owned()
}

/// Parses pool-initialization transactions of one target AMM program
pub struct PoolEventParser {
    program_id: Pubkey,
    version: u8,
}

impl PoolEventParser {
    pub fn new(program_id: Pubkey, version: u8) -> Self {
        Self {
            program_id,
            version,
        }
    }

    /// Extract the pool init event from a parsed transaction.
    ///
    /// Any missing piece is fatal for this discovery event.
    pub fn parse(&self, tx: &ParsedConfirmedTx) -> Result<PoolInitEvent, ParseError> {
        let indexes = init_account_indexes(self.version)?;

        let init_ix = tx
            .find_instruction_by_program_id(&self.program_id)
            .ok_or_else(|| ParseError::InitInstructionNotFound(self.program_id.to_string()))?;
        let accounts = match init_ix {
            TxInstruction::PartiallyDecoded { accounts, .. } => accounts,
            TxInstruction::Parsed(_) => {
                return Err(ParseError::InvalidField("init instruction account list"))
            }
        };
        let need = indexes.market_id + 1;
        if accounts.len() < need {
            return Err(ParseError::AccountListTooShort {
                have: accounts.len(),
                need,
            });
        }

        let base_mint = accounts[indexes.base_mint];
        let quote_mint = accounts[indexes.quote_mint];
        let base_vault = accounts[indexes.base_vault];
        let quote_vault = accounts[indexes.quote_vault];
        let lp_mint = accounts[indexes.lp_mint];

        let lp_mint_init = self
            .find_initialize_mint(tx, &lp_mint)
            .ok_or(ParseError::InnerInstructionNotFound("lp mint initializeMint"))?;
        let lp_decimals = lp_mint_init
            .info_u64("decimals")
            .ok_or(ParseError::InvalidField("lp mint decimals"))? as u8;

        let lp_mint_to = self
            .find_mint_to(tx, &lp_mint)
            .ok_or(ParseError::InnerInstructionNotFound("lp mint mintTo"))?;
        let lp_reserve = lp_mint_to
            .info_u64("amount")
            .ok_or(ParseError::InvalidField("lp mint amount"))?;
        let lp_vault = lp_mint_to
            .info_str("account")
            .and_then(|s| s.parse().ok())
            .ok_or(ParseError::InvalidField("lp mint destination account"))?;

        let base_transfer = self
            .find_transfer_to(tx, &base_vault)
            .ok_or(ParseError::InnerInstructionNotFound("base vault transfer"))?;
        let base_reserve = base_transfer
            .info_u64("amount")
            .ok_or(ParseError::InvalidField("base transfer amount"))?;
        let quote_transfer = self
            .find_transfer_to(tx, &quote_vault)
            .ok_or(ParseError::InnerInstructionNotFound("quote vault transfer"))?;
        let quote_reserve = quote_transfer
            .info_u64("amount")
            .ok_or(ParseError::InvalidField("quote transfer amount"))?;

        let open_time = parse_open_time_log(tx)?;

        let base_pre_balance = tx
            .pre_token_balances
            .iter()
            .find(|b| b.mint == base_mint.to_string())
            .ok_or_else(|| ParseError::TokenBalanceNotFound(base_mint.to_string()))?;
        let base_decimals = base_pre_balance.decimals;

        // When the pool was created SOL-first, decimals are reassigned so
        // the native asset's fixed count lands on whichever side holds it.
        let base_and_quote_swapped = base_mint == WSOL_MINT;
        let (base_decimals, quote_decimals) = if base_and_quote_swapped {
            (SOL_DECIMALS, base_decimals)
        } else {
            (base_decimals, SOL_DECIMALS)
        };

        Ok(PoolInitEvent {
            id: accounts[indexes.pool_id],
            base_mint,
            quote_mint,
            lp_mint,
            base_decimals,
            quote_decimals,
            lp_decimals,
            version: self.version,
            program_id: self.program_id,
            authority: accounts[indexes.authority],
            open_orders: accounts[indexes.open_orders],
            target_orders: accounts[indexes.target_orders],
            base_vault,
            quote_vault,
            withdraw_queue: system_program::id(),
            lp_vault,
            market_program_id: accounts[indexes.market_program_id],
            market_id: accounts[indexes.market_id],
            base_reserve,
            quote_reserve,
            lp_reserve,
            open_time,
        })
    }

    fn find_initialize_mint<'a>(
        &self,
        tx: &'a ParsedConfirmedTx,
        mint: &Pubkey,
    ) -> Option<&'a ParsedInstruction> {
        let mint = mint.to_string();
        tx.find_inner_parsed(|p| {
            p.instruction_type == "initializeMint" && p.info_str("mint") == Some(mint.as_str())
        })
    }

    fn find_mint_to<'a>(
        &self,
        tx: &'a ParsedConfirmedTx,
        mint: &Pubkey,
    ) -> Option<&'a ParsedInstruction> {
        let mint = mint.to_string();
        tx.find_inner_parsed(|p| {
            p.instruction_type == "mintTo" && p.info_str("mint") == Some(mint.as_str())
        })
    }

    fn find_transfer_to<'a>(
        &self,
        tx: &'a ParsedConfirmedTx,
        destination: &Pubkey,
    ) -> Option<&'a ParsedInstruction> {
        let destination = destination.to_string();
        tx.find_inner_parsed(|p| {
            p.instruction_type == "transfer"
                && p.program_id == spl_token::id()
                && p.info_str("destination") == Some(destination.as_str())
        })
    }
}

/// Locate the open-time log line and decode its payload
fn parse_open_time_log(tx: &ParsedConfirmedTx) -> Result<i64, ParseError> {
    let entry = tx
        .find_log_entry(POOL_OPEN_TIME_LOG_NEEDLE)
        .ok_or(ParseError::LogEntryNotFound(POOL_OPEN_TIME_LOG_NEEDLE))?;
    let start = entry
        .find('{')
        .ok_or_else(|| ParseError::MalformedLogEntry(entry.to_string()))?;
    let payload = fix_relaxed_json(&entry[start..]);
    let parsed: InitLogEntry = serde_json::from_str(&payload)
        .map_err(|_| ParseError::MalformedLogEntry(entry.to_string()))?;
    Ok(parsed.open_time)
}
