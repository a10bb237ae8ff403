use crate::chain::Chain;
use crate::error::Result;
use crate::mempool::Mempool;
use crate::pow::{find_proof, find_proof_parallel, ProofLimits};
use crate::{now_unix, Block, Transaction};
use tracing::info;

/// Summary of a freshly sealed block.
#[derive(Clone, Debug, PartialEq)]
pub struct MinedBlock {
    pub index: u64,
    pub proof: u64,
    pub timestamp: i64,
    pub previous_hash: String,
    pub hash: String,
    pub tx_count: usize,
}

impl From<&Block> for MinedBlock {
    fn from(block: &Block) -> Self {
        Self {
            index: block.index(),
            proof: block.proof(),
            timestamp: block.timestamp(),
            previous_hash: block.previous_hash().to_string(),
            hash: block.hash().to_string(),
            tx_count: block.transactions().len(),
        }
    }
}

/// Everything a proof search needs, captured up front so the search can run
/// without holding the chain or the mempool.
#[derive(Clone, Debug)]
pub struct MiningJob {
    parent: Block,
    transactions: Vec<Transaction>,
    timestamp: i64,
}

impl MiningJob {
    /// Freeze the tip and a copy of the mempool. Transactions submitted after
    /// this point are left for the next block.
    pub fn prepare(chain: &Chain, mempool: &Mempool, timestamp: i64) -> Result<Self> {
        Ok(Self {
            parent: chain.last()?.clone(),
            transactions: mempool.snapshot(),
            timestamp,
        })
    }

    pub fn parent(&self) -> &Block {
        &self.parent
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn solve(self, limits: &ProofLimits) -> Result<SolvedJob> {
        let (proof, _) = find_proof(&self.parent, &self.transactions, self.timestamp, limits)?;
        Ok(SolvedJob { job: self, proof })
    }

    /// Like [`MiningJob::solve`] but searches on the rayon thread pool.
    pub fn solve_parallel(self, limits: &ProofLimits) -> Result<SolvedJob> {
        let (proof, _) =
            find_proof_parallel(&self.parent, &self.transactions, self.timestamp, limits)?;
        Ok(SolvedJob { job: self, proof })
    }
}

/// A job with a winning proof, ready to be appended.
#[derive(Clone, Debug)]
pub struct SolvedJob {
    job: MiningJob,
    proof: u64,
}

impl SolvedJob {
    pub fn proof(&self) -> u64 {
        self.proof
    }

    fn append_to(self, chain: &mut Chain) -> Result<&Block> {
        let MiningJob {
            parent,
            transactions,
            timestamp,
        } = self.job;
        chain.append_block(self.proof, timestamp, parent.hash(), transactions)
    }

    /// Append to the chain and drop the sealed transactions from the mempool.
    /// Fails with `BrokenLink` if the chain moved on since [`MiningJob::prepare`].
    pub fn seal(self, chain: &mut Chain, mempool: &mut Mempool) -> Result<MinedBlock> {
        let block = self.append_to(chain)?;
        let removed = mempool.remove_sealed(block.transactions());
        info!(
            index = block.index(),
            removed,
            left = mempool.len(),
            "mined block sealed"
        );
        Ok(MinedBlock::from(block))
    }
}

/// Synchronous mine-and-append over the whole mempool: capture a timestamp,
/// search, append on top of the tip, then clear the mempool.
pub fn mine_pending(
    chain: &mut Chain,
    mempool: &mut Mempool,
    limits: &ProofLimits,
) -> Result<MinedBlock> {
    let job = MiningJob::prepare(chain, mempool, now_unix())?;
    let solved = job.solve(limits)?;
    let mined = MinedBlock::from(solved.append_to(chain)?);
    mempool.drain_all();
    info!(index = mined.index, proof = mined.proof, hash = %mined.hash, "mined block");
    Ok(mined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::pow::verify_proof;

    const GENESIS_TS: i64 = 1_700_000_000;

    #[test]
    fn mine_pending_scenario() {
        let mut chain = Chain::with_genesis_timestamp(GENESIS_TS);
        let mut pool = Mempool::new();
        pool.submit("Alice", "Bob", 50.0).unwrap();
        pool.submit("Bob", "Charlie", 25.0).unwrap();

        let mined = mine_pending(&mut chain, &mut pool, &ProofLimits::unbounded()).unwrap();
        let genesis = chain.blocks()[0].clone();
        let block = chain.last().unwrap();

        assert_eq!(mined.index, 1);
        assert_eq!(mined.tx_count, 2);
        assert_eq!(mined.proof, 109_599);
        assert_eq!(mined.previous_hash, genesis.hash());
        assert_eq!(block.transactions()[0].sender(), "Alice");
        assert_eq!(block.transactions()[1].sender(), "Bob");
        assert_eq!(block.hash(), block.compute_hash());
        assert!(pool.is_empty());
        assert!(chain.is_valid());
    }

    #[test]
    fn mining_an_empty_pool_appends_an_empty_block() {
        let mut chain = Chain::with_genesis_timestamp(GENESIS_TS);
        let mut pool = Mempool::new();
        let mined = mine_pending(&mut chain, &mut pool, &ProofLimits::unbounded()).unwrap();
        assert_eq!(mined.index, 1);
        assert_eq!(mined.tx_count, 0);
        assert_eq!(mined.proof, 45_854);
        assert!(chain.last().unwrap().transactions().is_empty());
    }

    #[test]
    fn failed_search_leaves_chain_and_pool_untouched() {
        let mut chain = Chain::with_genesis_timestamp(GENESIS_TS);
        let mut pool = Mempool::new();
        pool.submit("Alice", "Bob", 50.0).unwrap();
        let limits = ProofLimits::unbounded().with_max_attempts(10);
        let err = mine_pending(&mut chain, &mut pool, &limits).unwrap_err();
        assert!(matches!(err, LedgerError::ProofNotFound { attempts: 10 }));
        assert_eq!(chain.len(), 1);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn split_flow_defers_late_arrivals() {
        let mut chain = Chain::with_genesis_timestamp(GENESIS_TS);
        let mut pool = Mempool::new();
        pool.submit("Alice", "Bob", 50.0).unwrap();
        pool.submit("Bob", "Charlie", 25.0).unwrap();

        let job = MiningJob::prepare(&chain, &pool, GENESIS_TS + 60).unwrap();
        assert_eq!(job.transactions().len(), 2);
        let late = pool.submit("Charlie", "Dave", 5.0).unwrap();

        let solved = job.solve(&ProofLimits::unbounded()).unwrap();
        assert_eq!(solved.proof(), 109_599);
        let mined = solved.seal(&mut chain, &mut pool).unwrap();

        assert_eq!(mined.tx_count, 2);
        assert_eq!(mined.timestamp, GENESIS_TS + 60);
        assert_eq!(
            mined.hash,
            "058c3bb6a730fc700c9e281e3383893f1ebc7bb75bea3999814dbef23c656006"
        );
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.transactions()[0].id(), late);
    }

    #[test]
    fn stale_job_is_rejected_with_broken_link() {
        let mut chain = Chain::with_genesis_timestamp(GENESIS_TS);
        let mut pool = Mempool::new();
        let stale = MiningJob::prepare(&chain, &pool, GENESIS_TS + 1).unwrap();
        let limits = ProofLimits::unbounded();

        MiningJob::prepare(&chain, &pool, GENESIS_TS + 2)
            .unwrap()
            .solve(&limits)
            .unwrap()
            .seal(&mut chain, &mut pool)
            .unwrap();

        let err = stale
            .solve(&limits)
            .unwrap()
            .seal(&mut chain, &mut pool)
            .unwrap_err();
        assert!(matches!(err, LedgerError::BrokenLink { .. }));
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn parallel_solve_produces_a_valid_block() {
        let mut chain = Chain::with_genesis_timestamp(GENESIS_TS);
        let mut pool = Mempool::new();
        pool.submit("Alice", "Bob", 50.0).unwrap();
        let job = MiningJob::prepare(&chain, &pool, GENESIS_TS + 5).unwrap();
        let parent = job.parent().clone();
        let solved = job.solve_parallel(&ProofLimits::unbounded()).unwrap();
        assert!(verify_proof(&parent, pool.transactions(), solved.proof()));
        solved.seal(&mut chain, &mut pool).unwrap();
        assert!(pool.is_empty());
        chain.validate().unwrap();
    }
}
