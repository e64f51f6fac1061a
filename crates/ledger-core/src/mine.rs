use crate::{chain::Ledger, error::Result, Block, ChainError, PowConfig};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

/// The whole chain plus its length, as returned by `get_chain`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,
    pub length: usize,
}

/// Cloneable handle to one ledger shared between request handlers.
///
/// Miners are serialized by a dedicated mutex held across the whole
/// read-tip, search, hash, append sequence. The chain lock itself is only
/// taken for writing during the append, so readers keep going while a proof
/// is being searched for and only ever see fully built blocks.
#[derive(Clone, Debug)]
pub struct SharedLedger {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    ledger: RwLock<Ledger>,
    mining: Mutex<()>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(Inner {
                ledger: RwLock::new(ledger),
                mining: Mutex::new(()),
            }),
        }
    }

    pub fn with_config(pow: PowConfig) -> Result<Self> {
        Ok(Self::new(Ledger::with_config(pow)?))
    }

    // A poisoned lock still holds a consistent chain: blocks are pushed whole.
    fn read(&self) -> RwLockReadGuard<'_, Ledger> {
        self.inner.ledger.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Ledger> {
        self.inner.ledger.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mine one block on top of the current tip and append it.
    pub fn mine(&self) -> Result<Block> {
        let _miner = self
            .inner
            .mining
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let (previous, pow) = {
            let ledger = self.read();
            (ledger.get_previous_block().clone(), ledger.config().clone())
        };

        let proof = crate::pow::search(previous.proof, &pow)?;
        let previous_hash = Ledger::hash(&previous);

        let block = self.write().create_block(proof, previous_hash).clone();
        info!(
            index = block.index,
            proof = block.proof,
            previous_hash = %block.previous_hash,
            "mined block"
        );
        Ok(block)
    }

    pub fn previous_block(&self) -> Block {
        self.read().get_previous_block().clone()
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        let ledger = self.read();
        ChainSnapshot {
            chain: ledger.chain().to_vec(),
            length: ledger.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn difficulty(&self) -> usize {
        self.read().config().difficulty
    }

    pub fn validate(&self) -> std::result::Result<(), ChainError> {
        self.read().validate()
    }

    pub fn is_chain_valid(&self) -> bool {
        self.read().is_chain_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LedgerError;

    fn shared(difficulty: usize) -> SharedLedger {
        SharedLedger::with_config(PowConfig::with_difficulty(difficulty)).unwrap()
    }

    #[test]
    fn mine_appends_linked_block() {
        let ledger = shared(1);
        let genesis = ledger.previous_block();
        let block = ledger.mine().unwrap();
        assert_eq!(block.index, 2);
        assert_eq!(block.previous_hash, genesis.hash());
        assert_eq!(ledger.previous_block(), block);
        assert_eq!(ledger.len(), 2);
        assert!(ledger.is_chain_valid());
    }

    #[test]
    fn snapshot_length_matches_chain() {
        let ledger = shared(1);
        ledger.mine().unwrap();
        ledger.mine().unwrap();
        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.length, 3);
        assert_eq!(snapshot.chain.len(), snapshot.length);
    }

    #[test]
    fn exhausted_search_leaves_chain_untouched() {
        let ledger = SharedLedger::with_config(PowConfig {
            difficulty: 2,
            max_attempts: Some(1),
            parallel: false,
        })
        .unwrap();
        // Genesis proof is 1; proof 0 gives sha256("-1") which has no leading zero.
        assert!(matches!(
            ledger.mine(),
            Err(LedgerError::SearchExhausted { attempts: 1, .. })
        ));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn clones_share_one_chain() {
        let a = shared(1);
        let b = a.clone();
        a.mine().unwrap();
        assert_eq!(b.len(), 2);
        assert_eq!(b.difficulty(), 1);
    }
}
