use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod constants;
pub mod error;
pub mod mine;

pub use chain::{validate_chain, Ledger};
pub use error::{ChainError, LedgerError, Result};
pub use mine::{ChainSnapshot, SharedLedger};
pub use pow::PowConfig;

pub type Hash = [u8; 32];

/// One ledger entry. Field order here is the order used in JSON responses;
/// hashing uses [`Block::canonical_bytes`] instead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Unix time in milliseconds.
    pub timestamp: u64,
    pub proof: u64,
    pub previous_hash: String,
}

impl Block {
    /// Compact JSON with keys in the fixed order `index, previous_hash, proof, timestamp`.
    ///
    /// This is part of the wire contract: every stored `previous_hash` depends on it.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        // Keys are listed alphabetically so the output is the same whether the
        // map backing `Value` is sorted or insertion-ordered.
        serde_json::json!({
            "index": self.index,
            "previous_hash": self.previous_hash,
            "proof": self.proof,
            "timestamp": self.timestamp,
        })
        .to_string()
        .into_bytes()
    }

    pub fn digest(&self) -> Hash {
        sha256(&self.canonical_bytes())
    }

    /// Lowercase hex SHA-256 of the canonical form.
    pub fn hash(&self) -> String {
        hex::encode(self.digest())
    }
}

pub fn sha256(bytes: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

pub mod pow {
    use super::{sha256, Hash};
    use crate::constants::{HASH_HEX_SIZE, POW_TARGET_DIFFICULTY};
    use crate::error::{LedgerError, Result};
    use rayon::prelude::*;
    use tracing::debug;

    /// Search parameters for [`search`].
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct PowConfig {
        /// Number of leading `'0'` hex characters a proof digest must have.
        pub difficulty: usize,
        /// Upper bound on candidates tried; `None` searches until a proof is found.
        pub max_attempts: Option<u64>,
        /// Split the search across the rayon pool. The result is the same as the
        /// sequential search.
        pub parallel: bool,
    }

    impl Default for PowConfig {
        fn default() -> Self {
            Self {
                difficulty: POW_TARGET_DIFFICULTY,
                max_attempts: None,
                parallel: false,
            }
        }
    }

    impl PowConfig {
        pub fn with_difficulty(difficulty: usize) -> Self {
            Self {
                difficulty,
                ..Self::default()
            }
        }

        pub fn validate(&self) -> Result<()> {
            if self.difficulty == 0 || self.difficulty > HASH_HEX_SIZE {
                return Err(LedgerError::InvalidDifficulty {
                    got: self.difficulty,
                    max: HASH_HEX_SIZE,
                });
            }
            Ok(())
        }
    }

    /// Renders `new_proof^2 - previous_proof^2` in base 10. Exact for every pair of `u64`s.
    pub fn combine(new_proof: u64, previous_proof: u64) -> String {
        let new_sq = u128::from(new_proof) * u128::from(new_proof);
        let prev_sq = u128::from(previous_proof) * u128::from(previous_proof);
        if new_sq >= prev_sq {
            (new_sq - prev_sq).to_string()
        } else {
            format!("-{}", prev_sq - new_sq)
        }
    }

    pub fn proof_digest(new_proof: u64, previous_proof: u64) -> Hash {
        sha256(combine(new_proof, previous_proof).as_bytes())
    }

    /// Number of leading `'0'` characters in the hex form of `hash`.
    pub fn leading_zero_nibbles(hash: &Hash) -> usize {
        let mut total = 0usize;
        for b in hash {
            if *b == 0 {
                total += 2;
            } else {
                if *b >> 4 == 0 {
                    total += 1;
                }
                break;
            }
        }
        total
    }

    pub fn meets_difficulty(hash: &Hash, difficulty: usize) -> bool {
        leading_zero_nibbles(hash) >= difficulty
    }

    pub fn is_valid_proof(new_proof: u64, previous_proof: u64, difficulty: usize) -> bool {
        meets_difficulty(&proof_digest(new_proof, previous_proof), difficulty)
    }

    /// Finds the smallest proof that satisfies the difficulty against `previous_proof`.
    pub fn search(previous_proof: u64, config: &PowConfig) -> Result<u64> {
        config.validate()?;
        let limit = config.max_attempts.unwrap_or(u64::MAX);
        let difficulty = config.difficulty;

        let found = if config.parallel {
            // find_first keeps the answer identical to the sequential scan.
            (0..limit)
                .into_par_iter()
                .find_first(|candidate| is_valid_proof(*candidate, previous_proof, difficulty))
        } else {
            (0..limit).find(|candidate| is_valid_proof(*candidate, previous_proof, difficulty))
        };

        match found {
            Some(proof) => {
                debug!(previous_proof, proof, difficulty, "proof found");
                Ok(proof)
            }
            None => Err(LedgerError::SearchExhausted {
                previous_proof,
                attempts: limit,
            }),
        }
    }
}

pub mod chain {
    use super::*;
    use crate::constants::{GENESIS_INDEX, GENESIS_PREVIOUS_HASH, GENESIS_PROOF};
    use crate::error::ChainError;
    use crate::pow::{self, PowConfig};
    use tracing::{info, warn};

    /// Append-only chain of blocks, created with its genesis block in place.
    #[derive(Clone, Debug)]
    pub struct Ledger {
        chain: Vec<Block>,
        pow: PowConfig,
    }

    impl Default for Ledger {
        fn default() -> Self {
            Self::from_valid_config(PowConfig::default())
        }
    }

    impl Ledger {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_config(pow: PowConfig) -> Result<Self> {
            pow.validate()?;
            Ok(Self::from_valid_config(pow))
        }

        fn from_valid_config(pow: PowConfig) -> Self {
            Self {
                chain: vec![genesis_block(now_millis())],
                pow,
            }
        }

        pub fn config(&self) -> &PowConfig {
            &self.pow
        }

        pub fn chain(&self) -> &[Block] {
            &self.chain
        }

        #[cfg(test)]
        pub(crate) fn blocks_mut(&mut self) -> &mut [Block] {
            &mut self.chain
        }

        pub fn len(&self) -> usize {
            self.chain.len()
        }

        pub fn is_empty(&self) -> bool {
            self.chain.is_empty()
        }

        pub fn get_previous_block(&self) -> &Block {
            // Never empty: the genesis block is pushed in the constructor.
            &self.chain[self.chain.len() - 1]
        }

        pub fn proof_of_work(&self, previous_proof: u64) -> Result<u64> {
            pow::search(previous_proof, &self.pow)
        }

        pub fn hash(block: &Block) -> String {
            block.hash()
        }

        /// Appends a block after the current tip. The timestamp never goes below the
        /// previous block's, even if the wall clock steps back.
        pub fn create_block(&mut self, proof: u64, previous_hash: String) -> &Block {
            let previous = self.get_previous_block();
            let block = Block {
                index: previous.index + 1,
                timestamp: now_millis().max(previous.timestamp),
                proof,
                previous_hash,
            };
            self.chain.push(block);
            self.get_previous_block()
        }

        /// Read the tip, search for its successor's proof, link and append.
        pub fn mine_block(&mut self) -> Result<&Block> {
            let previous = self.get_previous_block();
            let proof = self.proof_of_work(previous.proof)?;
            let previous_hash = Self::hash(previous);
            let block = self.create_block(proof, previous_hash);
            info!(index = block.index, proof = block.proof, "mined block");
            Ok(block)
        }

        pub fn validate(&self) -> std::result::Result<(), ChainError> {
            validate_chain(&self.chain, self.pow.difficulty)
        }

        pub fn is_chain_valid(&self) -> bool {
            match self.validate() {
                Ok(()) => true,
                Err(err) => {
                    warn!(%err, "chain failed validation");
                    false
                }
            }
        }
    }

    pub fn genesis_block(timestamp: u64) -> Block {
        Block {
            index: GENESIS_INDEX,
            timestamp,
            proof: GENESIS_PROOF,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
        }
    }

    /// Checks index continuity, hash links and proofs for every adjacent pair.
    /// The genesis block is exempt from the proof check.
    pub fn validate_chain(
        blocks: &[Block],
        difficulty: usize,
    ) -> std::result::Result<(), ChainError> {
        let genesis = blocks.first().ok_or(ChainError::Empty)?;
        if genesis.index != GENESIS_INDEX {
            return Err(ChainError::BadGenesis(genesis.index));
        }

        for (position, pair) in blocks.windows(2).enumerate() {
            let (previous, block) = (&pair[0], &pair[1]);
            if block.index != previous.index + 1 {
                return Err(ChainError::IndexGap {
                    position: position + 1,
                    expected: previous.index + 1,
                    found: block.index,
                });
            }
            if block.previous_hash != previous.hash() {
                return Err(ChainError::BrokenLink { index: block.index });
            }
            if !pow::is_valid_proof(block.proof, previous.proof, difficulty) {
                return Err(ChainError::InvalidProof {
                    index: block.index,
                    proof: block.proof,
                });
            }
        }
        Ok(())
    }
}
