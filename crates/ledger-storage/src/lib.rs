pub mod json_store;

pub use json_store::JsonFileStore;

/// File the node reads and writes the mempool snapshot to by default.
pub const DEFAULT_MEMPOOL_FILE: &str = "mempool.json";
