use crate::constants::{DEFAULT_LISTEN, DEFAULT_LOG_FILTER};
use crate::state::MiningOptions;
use clap::Parser;
use ledger_storage::DEFAULT_MEMPOOL_FILE;
use std::{net::SocketAddr, path::PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[command(name = "ledger-node", about = "Proof-of-work transfer ledger node")]
pub struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, default_value = DEFAULT_LISTEN)]
    pub listen: SocketAddr,

    /// Where the pending-transaction snapshot is kept between runs
    #[arg(long, default_value = DEFAULT_MEMPOOL_FILE)]
    pub mempool_path: PathBuf,

    /// Give up a mining request after this many proofs (unbounded if unset)
    #[arg(long)]
    pub max_attempts: Option<u64>,

    /// Search proofs on all cores instead of one
    #[arg(long)]
    pub parallel: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = DEFAULT_LOG_FILTER)]
    pub log: String,
}

impl Args {
    pub fn mining_options(&self) -> MiningOptions {
        MiningOptions {
            max_attempts: self.max_attempts,
            parallel: self.parallel,
        }
    }

    /// RUST_LOG wins over `--log`.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log))
    }
}
