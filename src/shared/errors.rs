//! Error handling for the application

use thiserror::Error;

/// Errors raised while parsing a pool-initialization transaction.
///
/// All of these are permanent: the discovery event is dropped, never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("no instruction addressed to program {0} in transaction")]
    InitInstructionNotFound(String),

    #[error("instruction account list too short: {have} accounts, need {need}")]
    AccountListTooShort { have: usize, need: usize },

    #[error("missing inner instruction: {0}")]
    InnerInstructionNotFound(&'static str),

    #[error("missing '{0}' log entry")]
    LogEntryNotFound(&'static str),

    #[error("malformed pool init log entry: {0}")]
    MalformedLogEntry(String),

    #[error("missing pre-token balance for mint {0}")]
    TokenBalanceNotFound(String),

    #[error("unsupported AMM program version: {0}")]
    UnsupportedVersion(u8),

    #[error("account data too short: {have} bytes, need {need}")]
    AccountDataTooShort { have: usize, need: usize },

    #[error("invalid account field: {0}")]
    InvalidField(&'static str),
}

/// Swap submission and confirmation errors
#[derive(Error, Debug, Clone)]
pub enum SwapError {
    #[error("failed to build swap transaction: {0}")]
    Build(String),

    #[error("swap submission failed: {0}")]
    Submission(String),

    #[error("swap simulation failed: {0}")]
    Simulation(String),

    #[error("confirmation timed out after {0}s")]
    ConfirmationTimeout(u64),
}

/// General application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("swap error: {0}")]
    Swap(#[from] SwapError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("wallet error: {0}")]
    Wallet(String),
}

impl AppError {
    /// True for errors that stand for an absent value rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}
