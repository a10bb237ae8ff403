use ledger_core::{Mempool, Transaction};
use ledger_storage::JsonFileStore;
use tempfile::{tempdir, TempDir};

pub fn create_temp_store() -> (TempDir, JsonFileStore) {
    // The store lives inside the temp dir and disappears with it.
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let store = JsonFileStore::new(temp_dir.path().join("mempool.json"));
    (temp_dir, store)
}

pub fn sample_pool() -> Mempool {
    let mut pool = Mempool::new();
    pool.submit("Alice", "Bob", 50.0).unwrap();
    pool.submit("Bob", "Charlie", 25.0).unwrap();
    pool.submit("Charlie", "Dave", 0.1).unwrap();
    pool
}

pub fn transfers(n: usize) -> Vec<Transaction> {
    (0..n)
        .map(|i| Transaction::new(format!("addr_from_{i}"), format!("addr_to_{i}"), i as f64 * 1.5))
        .collect()
}
