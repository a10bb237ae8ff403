use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod chain;
pub mod constants;
pub mod error;
pub mod mempool;
pub mod mine;

pub use chain::Chain;
pub use error::{LedgerError, Result};
pub use mempool::{Mempool, PoolStore};
pub use mine::{mine_pending, MinedBlock, MiningJob};

use constants::AMOUNT_DECIMALS;

/// Seconds since the unix epoch. Clamps to 0 if the clock is before 1970.
pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Renders an amount the way it enters every digest: fixed-point with six
/// fractional digits (`50` -> `50.000000`). Changing this changes every hash.
pub fn format_amount(amount: f64) -> String {
    if amount.is_nan() {
        "NaN".to_string()
    } else if amount.is_infinite() {
        let sign = if amount.is_sign_positive() { '+' } else { '-' };
        format!("{sign}Inf")
    } else {
        format!("{:.*}", AMOUNT_DECIMALS, amount)
    }
}

/// Content address of a transfer: sha256 over sender, recipient and amount.
pub fn transaction_id(sender: &str, recipient: &str, amount: f64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sender.as_bytes());
    hasher.update(recipient.as_bytes());
    hasher.update(format_amount(amount).as_bytes());
    hex::encode(hasher.finalize())
}

/// Digest of a block's fields, in this order: index, timestamp, previous hash,
/// proof, transaction count, then sender/recipient/amount for each transaction.
pub fn hash_block(
    index: u64,
    timestamp: i64,
    previous_hash: &str,
    proof: u64,
    transactions: &[Transaction],
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{index}{timestamp}{previous_hash}{proof}{}", transactions.len()).as_bytes());
    for tx in transactions {
        hasher.update(tx.sender.as_bytes());
        hasher.update(tx.recipient.as_bytes());
        hasher.update(format_amount(tx.amount).as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// A transfer between two parties. The id is derived from the contents and
/// recomputed on deserialization, so a `Transaction` can never carry a stale id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TransactionRecord")]
pub struct Transaction {
    sender: String,
    #[serde(rename = "hash_id")]
    id: String,
    recipient: String,
    amount: f64,
}

impl Transaction {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: f64) -> Self {
        let sender = sender.into();
        let recipient = recipient.into();
        let id = transaction_id(&sender, &recipient, amount);
        Self {
            sender,
            id,
            recipient,
            amount,
        }
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Wire form of a transaction; `hash_id` is optional on the way in.
#[derive(Deserialize)]
struct TransactionRecord {
    sender: String,
    #[serde(default)]
    hash_id: Option<String>,
    recipient: String,
    amount: f64,
}

impl TryFrom<TransactionRecord> for Transaction {
    type Error = LedgerError;

    fn try_from(record: TransactionRecord) -> Result<Self> {
        let tx = Transaction::new(record.sender, record.recipient, record.amount);
        match record.hash_id {
            Some(claimed) if claimed != tx.id => Err(LedgerError::MalformedInput(format!(
                "hash_id {claimed} does not match transaction contents ({})",
                tx.id
            ))),
            _ => Ok(tx),
        }
    }
}

/// A sealed block. Fields are read-only; the hash is computed once in
/// [`Block::new`] from the other fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    index: u64,
    timestamp: i64,
    #[serde(rename = "transaction")]
    transactions: Vec<Transaction>,
    #[serde(rename = "prevHash")]
    previous_hash: String,
    proof: u64,
    hash: String,
}

impl Block {
    pub fn new(
        index: u64,
        timestamp: i64,
        transactions: Vec<Transaction>,
        previous_hash: impl Into<String>,
        proof: u64,
    ) -> Self {
        let previous_hash = previous_hash.into();
        let hash = hash_block(index, timestamp, &previous_hash, proof, &transactions);
        Self {
            index,
            timestamp,
            transactions,
            previous_hash,
            proof,
            hash,
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn proof(&self) -> u64 {
        self.proof
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Recompute the digest from the stored fields.
    pub fn compute_hash(&self) -> String {
        hash_block(
            self.index,
            self.timestamp,
            &self.previous_hash,
            self.proof,
            &self.transactions,
        )
    }
}

pub mod pow {
    use super::{hash_block, Block, Transaction};
    use crate::constants::POW_TARGET_PREFIX;
    use crate::error::{LedgerError, Result};
    use rayon::prelude::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tracing::debug;

    /// Bounds on a proof search. The default is unbounded: the search only
    /// returns once a proof is found.
    #[derive(Clone, Debug, Default)]
    pub struct ProofLimits {
        pub max_attempts: Option<u64>,
        pub cancel: Option<Arc<AtomicBool>>,
    }

    impl ProofLimits {
        pub fn unbounded() -> Self {
            Self::default()
        }

        pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
            self.max_attempts = Some(max_attempts);
            self
        }

        pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
            self.cancel = Some(cancel);
            self
        }

        fn is_cancelled(&self) -> bool {
            self.cancel
                .as_ref()
                .is_some_and(|flag| flag.load(Ordering::Relaxed))
        }
    }

    pub fn meets_difficulty(hash: &str) -> bool {
        hash.starts_with(POW_TARGET_PREFIX)
    }

    /// Hash tested during the search. It keeps the parent's index, timestamp
    /// and previous hash and swaps in the candidate transactions and proof;
    /// existing chains depend on this exact shape.
    pub fn trial_hash(last_block: &Block, transactions: &[Transaction], proof: u64) -> String {
        hash_block(
            last_block.index(),
            last_block.timestamp(),
            last_block.previous_hash(),
            proof,
            transactions,
        )
    }

    pub fn verify_proof(last_block: &Block, transactions: &[Transaction], proof: u64) -> bool {
        meets_difficulty(&trial_hash(last_block, transactions, proof))
    }

    /// Search proofs from 0 upwards until [`verify_proof`] passes. Returns the
    /// proof together with `candidate_timestamp`, which is never re-sampled.
    pub fn find_proof(
        last_block: &Block,
        transactions: &[Transaction],
        candidate_timestamp: i64,
        limits: &ProofLimits,
    ) -> Result<(u64, i64)> {
        let mut proof = 0u64;
        loop {
            if limits.max_attempts.is_some_and(|max| proof >= max) {
                return Err(LedgerError::ProofNotFound { attempts: proof });
            }
            if limits.is_cancelled() {
                return Err(LedgerError::MiningCancelled);
            }
            if verify_proof(last_block, transactions, proof) {
                debug!(proof, parent = last_block.index(), "proof found");
                return Ok((proof, candidate_timestamp));
            }
            proof = proof
                .checked_add(1)
                .ok_or(LedgerError::ProofNotFound { attempts: u64::MAX })?;
        }
    }

    /// Same contract as [`find_proof`], split across the rayon pool. Returns
    /// the lowest passing proof, so both searches agree.
    pub fn find_proof_parallel(
        last_block: &Block,
        transactions: &[Transaction],
        candidate_timestamp: i64,
        limits: &ProofLimits,
    ) -> Result<(u64, i64)> {
        let end = limits.max_attempts.unwrap_or(u64::MAX);
        let found = (0..end).into_par_iter().find_map_first(|proof| {
            if limits.is_cancelled() {
                Some(Err(LedgerError::MiningCancelled))
            } else if verify_proof(last_block, transactions, proof) {
                Some(Ok(proof))
            } else {
                None
            }
        });
        match found {
            Some(Ok(proof)) => {
                debug!(proof, parent = last_block.index(), "proof found (parallel)");
                Ok((proof, candidate_timestamp))
            }
            Some(Err(err)) => Err(err),
            None => Err(LedgerError::ProofNotFound { attempts: end }),
        }
    }
}
