//! The in-memory block ledger.

use crate::constants::{GENESIS_PREVIOUS_HASH, GENESIS_PROOF};
use crate::error::{LedgerError, Result};
use crate::{now_unix, pow, Block, Transaction};
use tracing::{info, warn};

/// Unmined root block: no transactions, fixed proof seed and sentinel parent.
pub fn genesis_block(timestamp: i64) -> Block {
    Block::new(0, timestamp, vec![], GENESIS_PREVIOUS_HASH, GENESIS_PROOF)
}

/// Append-only sequence of blocks, always starting with a genesis block.
#[derive(Clone, Debug)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain {
    /// A fresh chain whose genesis block is stamped with the current time.
    pub fn new() -> Self {
        Self::with_genesis_timestamp(now_unix())
    }

    pub fn with_genesis_timestamp(timestamp: i64) -> Self {
        let genesis = genesis_block(timestamp);
        info!(hash = %genesis.hash(), timestamp, "genesis block created");
        Self {
            blocks: vec![genesis],
        }
    }

    /// Rebuild a chain from blocks received elsewhere (e.g. over HTTP).
    /// The sequence must pass [`Chain::validate`].
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self> {
        let chain = Self { blocks };
        chain.validate()?;
        Ok(chain)
    }

    /// Seal a new block at the next index. `previous_hash` must equal the
    /// current tip's hash; on mismatch the chain is left untouched.
    pub fn append_block(
        &mut self,
        proof: u64,
        timestamp: i64,
        previous_hash: &str,
        transactions: Vec<Transaction>,
    ) -> Result<&Block> {
        let tip = self.last()?;
        if tip.hash() != previous_hash {
            warn!(expected = %tip.hash(), found = %previous_hash, "rejecting block with broken link");
            return Err(LedgerError::BrokenLink {
                expected: tip.hash().to_string(),
                found: previous_hash.to_string(),
            });
        }
        let block = Block::new(
            self.blocks.len() as u64,
            timestamp,
            transactions,
            previous_hash,
            proof,
        );
        info!(
            index = block.index(),
            proof,
            txs = block.transactions().len(),
            hash = %block.hash(),
            "block appended"
        );
        self.blocks.push(block);
        self.last()
    }

    pub fn last(&self) -> Result<&Block> {
        self.blocks.last().ok_or(LedgerError::EmptyChain)
    }

    pub fn get(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.blocks.get(i))
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Index of the tip block.
    pub fn height(&self) -> u64 {
        self.blocks.len().saturating_sub(1) as u64
    }

    /// Walk the whole chain: every stored hash must recompute, every index
    /// must match its position, every link must point at its predecessor and
    /// every mined block must carry a proof that passes against its parent.
    pub fn validate(&self) -> Result<()> {
        let genesis = self.blocks.first().ok_or(LedgerError::EmptyChain)?;
        check_genesis(genesis)?;

        for (position, pair) in self.blocks.windows(2).enumerate() {
            let (parent, block) = (&pair[0], &pair[1]);
            let expected_index = position as u64 + 1;
            if block.index() != expected_index {
                return Err(invalid(
                    block.index(),
                    format!("stored at position {expected_index}"),
                ));
            }
            if block.previous_hash() != parent.hash() {
                return Err(LedgerError::BrokenLink {
                    expected: parent.hash().to_string(),
                    found: block.previous_hash().to_string(),
                });
            }
            if block.compute_hash() != block.hash() {
                return Err(invalid(block.index(), "hash does not match contents"));
            }
            if !pow::verify_proof(parent, block.transactions(), block.proof()) {
                return Err(invalid(block.index(), "proof does not meet difficulty"));
            }
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

fn check_genesis(genesis: &Block) -> Result<()> {
    if genesis.index() != 0 {
        return Err(invalid(genesis.index(), "genesis block must have index 0"));
    }
    if genesis.previous_hash() != GENESIS_PREVIOUS_HASH {
        return Err(LedgerError::BrokenLink {
            expected: GENESIS_PREVIOUS_HASH.to_string(),
            found: genesis.previous_hash().to_string(),
        });
    }
    if genesis.proof() != GENESIS_PROOF || !genesis.transactions().is_empty() {
        return Err(invalid(0, "genesis block does not match the fixed seed"));
    }
    if genesis.compute_hash() != genesis.hash() {
        return Err(invalid(0, "hash does not match contents"));
    }
    Ok(())
}

fn invalid(index: u64, reason: impl Into<String>) -> LedgerError {
    LedgerError::InvalidBlock {
        index,
        reason: reason.into(),
    }
}
