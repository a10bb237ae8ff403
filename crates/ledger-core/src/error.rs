//! Error types for the ledger core.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// A submitted payload could not be turned into a transaction.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Reading or writing the mempool snapshot failed.
    #[error("persistence error: {0:#}")]
    Persistence(#[from] anyhow::Error),

    #[error("chain has no blocks")]
    EmptyChain,

    /// `previous_hash` does not point at the block it claims to follow.
    #[error("broken link: expected previous hash {expected}, found {found}")]
    BrokenLink { expected: String, found: String },

    #[error("invalid block at index {index}: {reason}")]
    InvalidBlock { index: u64, reason: String },

    #[error("no proof found within {attempts} attempts")]
    ProofNotFound { attempts: u64 },

    #[error("mining cancelled")]
    MiningCancelled,
}

impl LedgerError {
    /// True for errors that mean the chain itself is inconsistent, as opposed
    /// to bad input, I/O trouble or an abandoned search.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            LedgerError::EmptyChain
                | LedgerError::BrokenLink { .. }
                | LedgerError::InvalidBlock { .. }
        )
    }
}
