//! Pending transactions waiting to be sealed into a block.

use crate::error::{LedgerError, Result};
use crate::Transaction;
use tracing::{debug, info};

/// Durable home for the mempool snapshot. This lives in `ledger-core` so the
/// storage crate can implement it without a circular dependency.
pub trait PoolStore: Send + Sync {
    fn save(&self, transactions: &[Transaction]) -> anyhow::Result<()>;
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> anyhow::Result<Option<Vec<Transaction>>>;
}

#[derive(Clone, Debug, Default)]
pub struct Mempool {
    pending: Vec<Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a transfer and return its content id. Identical transfers get
    /// identical ids and are queued twice; there is no dedup and no balance check.
    pub fn submit(
        &mut self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: f64,
    ) -> Result<String> {
        if !amount.is_finite() {
            return Err(LedgerError::MalformedInput(format!(
                "amount must be a finite number, got {amount}"
            )));
        }
        let tx = Transaction::new(sender, recipient, amount);
        let id = tx.id().to_string();
        debug!(%id, sender = tx.sender(), recipient = tx.recipient(), amount, "transaction queued");
        self.pending.push(tx);
        Ok(id)
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Copy of the current contents, used as the frozen transaction list of a
    /// block about to be mined.
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.pending.clone()
    }

    /// Take everything, leaving the pool empty.
    pub fn drain_all(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.pending)
    }

    /// Drop transactions that were just sealed into a block and keep anything
    /// submitted after the snapshot was taken. Returns how many were removed.
    pub fn remove_sealed(&mut self, sealed: &[Transaction]) -> usize {
        if self.pending.starts_with(sealed) {
            self.pending.drain(..sealed.len());
            return sealed.len();
        }
        let mut removed = 0;
        for tx in sealed {
            if let Some(pos) = self.pending.iter().position(|p| p == tx) {
                self.pending.remove(pos);
                removed += 1;
            }
        }
        removed
    }

    pub fn snapshot_to<S: PoolStore + ?Sized>(&self, store: &S) -> Result<()> {
        store.save(&self.pending)?;
        debug!(count = self.pending.len(), "mempool snapshot written");
        Ok(())
    }

    /// Replace the contents with what the store holds. A store that has never
    /// been written leaves the pool empty. Returns the number restored.
    pub fn restore_from<S: PoolStore + ?Sized>(&mut self, store: &S) -> Result<usize> {
        self.pending = store.load()?.unwrap_or_default();
        info!(count = self.pending.len(), "mempool restored");
        Ok(self.pending.len())
    }
}
