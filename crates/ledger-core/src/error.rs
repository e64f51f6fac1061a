use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("difficulty must be between 1 and {max} hex characters, got {got}")]
    InvalidDifficulty { got: usize, max: usize },

    #[error("no valid proof for previous proof {previous_proof} within {attempts} attempts")]
    SearchExhausted { previous_proof: u64, attempts: u64 },
}

/// The first broken invariant found while walking a chain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("chain is empty")]
    Empty,

    #[error("genesis block has index {0}, expected 1")]
    BadGenesis(u64),

    #[error("block at position {position} has index {found}, expected {expected}")]
    IndexGap {
        position: usize,
        expected: u64,
        found: u64,
    },

    #[error("block {index} does not link to the hash of its predecessor")]
    BrokenLink { index: u64 },

    #[error("block {index} carries proof {proof} which fails the difficulty check")]
    InvalidProof { index: u64, proof: u64 },
}
