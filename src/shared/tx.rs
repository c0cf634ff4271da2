//! Runtime-neutral model of a parsed transaction.
//!
//! Mirrors the shape of the `jsonParsed` RPC encoding so the pool event
//! parser can run against synthetic transactions in tests without touching
//! solana-client types. The RPC layer converts into this model.

use serde_json::Value;
use solana_sdk::pubkey::Pubkey;

/// One instruction as returned by a jsonParsed transaction query
#[derive(Debug, Clone)]
pub enum TxInstruction {
    /// The node decoded the instruction into a typed payload
    Parsed(ParsedInstruction),
    /// Unknown program: only the raw account list survives
    PartiallyDecoded {
        program_id: Pubkey,
        accounts: Vec<Pubkey>,
    },
}

impl TxInstruction {
    pub fn program_id(&self) -> Pubkey {
        match self {
            TxInstruction::Parsed(p) => p.program_id,
            TxInstruction::PartiallyDecoded { program_id, .. } => *program_id,
        }
    }
}

/// A node-decoded instruction: `type` discriminator plus `info` payload
#[derive(Debug, Clone)]
pub struct ParsedInstruction {
    pub program_id: Pubkey,
    pub instruction_type: String,
    pub info: Value,
}

impl ParsedInstruction {
    /// String field of the `info` payload
    pub fn info_str(&self, key: &str) -> Option<&str> {
        self.info.get(key).and_then(Value::as_str)
    }

    /// Numeric field of the `info` payload. The RPC encodes token amounts
    /// as strings, so both encodings are accepted.
    pub fn info_u64(&self, key: &str) -> Option<u64> {
        match self.info.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Inner instructions attached to one top-level instruction
#[derive(Debug, Clone)]
pub struct InnerInstructions {
    pub index: u8,
    pub instructions: Vec<TxInstruction>,
}

/// Pre-execution token balance entry (mint decimals source)
#[derive(Debug, Clone)]
pub struct TxTokenBalance {
    pub mint: String,
    pub decimals: u8,
}

/// A parsed, confirmed transaction with the metadata slices the pool
/// discovery path needs.
#[derive(Debug, Clone, Default)]
pub struct ParsedConfirmedTx {
    pub instructions: Vec<TxInstruction>,
    pub inner_instructions: Vec<InnerInstructions>,
    pub log_messages: Vec<String>,
    pub pre_token_balances: Vec<TxTokenBalance>,
}

impl ParsedConfirmedTx {
    /// First top-level instruction addressed to `program_id`
    pub fn find_instruction_by_program_id(&self, program_id: &Pubkey) -> Option<&TxInstruction> {
        self.instructions
            .iter()
            .find(|ix| ix.program_id() == *program_id)
    }

    /// First inner parsed instruction matching the predicate
    pub fn find_inner_parsed<F>(&self, predicate: F) -> Option<&ParsedInstruction>
    where
        F: Fn(&ParsedInstruction) -> bool,
    {
        self.inner_instructions
            .iter()
            .flat_map(|inner| inner.instructions.iter())
            .filter_map(|ix| match ix {
                TxInstruction::Parsed(p) => Some(p),
                TxInstruction::PartiallyDecoded { .. } => None,
            })
            .find(|p| predicate(p))
    }

    /// First log entry containing `needle`
    pub fn find_log_entry(&self, needle: &str) -> Option<&str> {
        self.log_messages
            .iter()
            .find(|l| l.contains(needle))
            .map(String::as_str)
    }
}
