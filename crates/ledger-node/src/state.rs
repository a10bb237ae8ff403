use crate::config::Args;
use crate::error::ApiError;
use anyhow::Context;
use ledger_core::{
    now_unix, pow::ProofLimits, Chain, LedgerError, Mempool, MinedBlock, MiningJob, PoolStore,
};
use ledger_storage::JsonFileStore;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MiningOptions {
    pub max_attempts: Option<u64>,
    pub parallel: bool,
}

/// Chain, mempool and snapshot store shared by every handler.
///
/// Lock order is chain, then mempool. Mining requests are serialised by
/// `mining` and the proof search itself runs on the blocking pool with no
/// lock held, so reads and submissions stay responsive while a block is mined.
#[derive(Clone)]
pub struct AppState {
    pub chain: Arc<RwLock<Chain>>,
    pub mempool: Arc<Mutex<Mempool>>,
    store: Arc<dyn PoolStore>,
    mining: Arc<Mutex<()>>,
    cancel: Arc<AtomicBool>,
    options: MiningOptions,
}

impl AppState {
    pub fn new(
        chain: Chain,
        mempool: Mempool,
        store: Arc<dyn PoolStore>,
        options: MiningOptions,
    ) -> Self {
        Self {
            chain: Arc::new(RwLock::new(chain)),
            mempool: Arc::new(Mutex::new(mempool)),
            store,
            mining: Arc::new(Mutex::new(())),
            cancel: Arc::new(AtomicBool::new(false)),
            options,
        }
    }

    /// Fresh chain plus whatever mempool snapshot `args.mempool_path` holds.
    pub fn bootstrap(args: &Args) -> anyhow::Result<Self> {
        let store = Arc::new(JsonFileStore::new(&args.mempool_path));
        let mut mempool = Mempool::new();
        mempool
            .restore_from(store.as_ref())
            .with_context(|| format!("restore mempool from {}", args.mempool_path.display()))?;
        Ok(Self::new(Chain::new(), mempool, store, args.mining_options()))
    }

    pub fn limits(&self) -> ProofLimits {
        let limits = ProofLimits::unbounded().with_cancel(self.cancel.clone());
        match self.options.max_attempts {
            Some(max) => limits.with_max_attempts(max),
            None => limits,
        }
    }

    pub async fn submit(
        &self,
        sender: String,
        recipient: String,
        amount: f64,
    ) -> Result<String, LedgerError> {
        self.mempool.lock().await.submit(sender, recipient, amount)
    }

    /// Mine the mempool as it is right now into the next block.
    pub async fn mine(&self) -> Result<MinedBlock, ApiError> {
        let _mining = self.mining.lock().await;

        let job = {
            let chain = self.chain.read().await;
            let mempool = self.mempool.lock().await;
            MiningJob::prepare(&chain, &mempool, now_unix())?
        };
        info!(
            parent = job.parent().index(),
            txs = job.transactions().len(),
            "mining started"
        );

        let limits = self.limits();
        let parallel = self.options.parallel;
        let solved = tokio::task::spawn_blocking(move || {
            if parallel {
                job.solve_parallel(&limits)
            } else {
                job.solve(&limits)
            }
        })
        .await
        .map_err(|e| ApiError::Internal(format!("mining task failed: {e}")))??;

        let mut chain = self.chain.write().await;
        let mut mempool = self.mempool.lock().await;
        let mined = solved.seal(&mut chain, &mut mempool)?;
        if let Err(e) = mempool.snapshot_to(self.store.as_ref()) {
            error!(error = %e, index = mined.index, "block appended but mempool snapshot failed");
            return Err(e.into());
        }
        Ok(mined)
    }

    /// Write the current mempool to the snapshot store.
    pub async fn flush(&self) -> Result<(), LedgerError> {
        self.mempool.lock().await.snapshot_to(self.store.as_ref())
    }

    /// Abort any in-flight proof search; later searches fail immediately.
    pub fn cancel_mining(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}
