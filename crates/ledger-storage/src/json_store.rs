use anyhow::{Context, Result};
use ledger_core::{PoolStore, Transaction};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Mempool snapshot kept as a pretty-printed JSON array of transactions.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
  path: PathBuf,
}

impl JsonFileStore {
  pub fn new<P: Into<PathBuf>>(path: P) -> Self {
    let path = path.into();
    info!(path = %path.display(), "mempool store configured");
    Self { path }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn dir(&self) -> &Path {
    match self.path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent,
      _ => Path::new("."),
    }
  }
}

impl PoolStore for JsonFileStore {
  /// Write to a temp file next to the target, then rename over it, so a
  /// crash mid-write never leaves a truncated snapshot behind.
  fn save(&self, transactions: &[Transaction]) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(transactions).context("serialize mempool")?;
    let dir = self.dir();
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir)
      .with_context(|| format!("create temp file in {}", dir.display()))?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp
      .persist(&self.path)
      .map_err(|e| e.error)
      .with_context(|| format!("replace {}", self.path.display()))?;

    debug!(path = %self.path.display(), count = transactions.len(), "mempool saved");
    Ok(())
  }

  fn load(&self) -> Result<Option<Vec<Transaction>>> {
    let bytes = match fs::read(&self.path) {
      Ok(bytes) => bytes,
      Err(e) if e.kind() == ErrorKind::NotFound => {
        debug!(path = %self.path.display(), "no mempool snapshot yet");
        return Ok(None);
      }
      Err(e) => return Err(e).with_context(|| format!("read {}", self.path.display())),
    };
    let txs = serde_json::from_slice(&bytes)
      .with_context(|| format!("parse {}", self.path.display()))?;
    Ok(Some(txs))
  }
}
