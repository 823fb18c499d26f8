//! Transaction sources: resolving a transaction id to its bytes.
//!
//! The core never performs I/O; the pipeline resolves referenced
//! transactions through a `TxSource` before the codec, signer, or
//! verifier run. Two implementations are provided - a per-txid file
//! cache and a block-explorer HTTP fetcher - plus a chain that consults
//! the cache first and writes fetched transactions back.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use txkit_primitives::chainhash::Hash;
use txkit_transaction::Transaction;

/// The environment variable naming the cache directory. Its absence
/// disables the cache.
pub const CACHE_DIR_ENV: &str = "TX_CACHE_DIR";

/// Base URL of the block explorer used to fetch raw transactions.
const EXPLORER_URL: &str = "https://blockstream.info/api";

/// A resolver from transaction id to transaction.
///
/// `Ok(None)` means the source definitively does not know the
/// transaction; `Err` means the lookup itself failed.
pub trait TxSource {
    /// Look up a transaction by its id.
    fn lookup(&self, txid: &Hash) -> Result<Option<Transaction>>;
}

// ---------------------------------------------------------------------------
// File cache
// ---------------------------------------------------------------------------

/// A cache of transactions stored as individual hex files under their
/// display-order id.
///
/// The directory is created on first write and read-only on lookup.
pub struct CacheSource {
    dir: PathBuf,
}

impl CacheSource {
    /// Build the cache source from the `TX_CACHE_DIR` environment
    /// variable.
    ///
    /// # Returns
    /// `Some(CacheSource)` when the variable is set, `None` otherwise.
    pub fn from_env() -> Option<Self> {
        std::env::var_os(CACHE_DIR_ENV).map(|dir| CacheSource { dir: PathBuf::from(dir) })
    }

    fn entry_path(&self, txid: &Hash) -> PathBuf {
        self.dir.join(format!("{}.hex", txid))
    }

    /// Store a transaction under its id, creating the cache directory
    /// if needed.
    ///
    /// # Arguments
    /// * `tx` - The transaction to store.
    pub fn store(&self, tx: &Transaction) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating cache directory {}", self.dir.display()))?;
        let path = self.entry_path(&tx.txid());
        fs::write(&path, tx.to_hex())
            .with_context(|| format!("writing cache entry {}", path.display()))?;
        Ok(())
    }
}

impl TxSource for CacheSource {
    fn lookup(&self, txid: &Hash) -> Result<Option<Transaction>> {
        let path = self.entry_path(txid);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("reading cache entry {}", path.display()))?;
        let tx = Transaction::from_hex(contents.trim())
            .with_context(|| format!("parsing cache entry {}", path.display()))?;
        Ok(Some(tx))
    }
}

// ---------------------------------------------------------------------------
// Block explorer
// ---------------------------------------------------------------------------

/// Fetches raw transaction hex from a block explorer over HTTP.
pub struct ExplorerSource {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl ExplorerSource {
    /// Create an explorer source against the default endpoint.
    pub fn new() -> Self {
        ExplorerSource {
            base_url: EXPLORER_URL.to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for ExplorerSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TxSource for ExplorerSource {
    fn lookup(&self, txid: &Hash) -> Result<Option<Transaction>> {
        let url = format!("{}/tx/{}/hex", self.base_url, txid);
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("fetching {}", url))?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .with_context(|| format!("fetching {}", url))?;

        let body = response.text().context("reading explorer response")?;
        let tx = Transaction::from_hex(body.trim())
            .with_context(|| format!("parsing transaction {}", txid))?;
        Ok(Some(tx))
    }
}

// ---------------------------------------------------------------------------
// Cache-then-explorer chain
// ---------------------------------------------------------------------------

/// Consults the cache first, falls back to the explorer, and writes
/// fetched transactions back to the cache.
pub struct ChainedSource {
    cache: Option<CacheSource>,
    explorer: ExplorerSource,
}

impl ChainedSource {
    /// Build the standard source: the environment-configured cache (if
    /// any) in front of the default explorer.
    pub fn from_env() -> Self {
        ChainedSource {
            cache: CacheSource::from_env(),
            explorer: ExplorerSource::new(),
        }
    }
}

impl TxSource for ChainedSource {
    fn lookup(&self, txid: &Hash) -> Result<Option<Transaction>> {
        if let Some(cache) = &self.cache {
            if let Some(tx) = cache.lookup(txid)? {
                return Ok(Some(tx));
            }
        }
        let fetched = self.explorer.lookup(txid)?;
        if let (Some(cache), Some(tx)) = (&self.cache, &fetched) {
            // Cache write failures don't fail the lookup.
            let _ = cache.store(tx);
        }
        Ok(fetched)
    }
}

/// An in-memory source for tests and pre-loaded transactions.
#[derive(Default)]
pub struct MemorySource {
    transactions: std::collections::HashMap<Hash, Transaction>,
}

impl MemorySource {
    /// Create an empty in-memory source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transaction, indexed by its id.
    pub fn add(&mut self, tx: Transaction) {
        self.transactions.insert(tx.txid(), tx);
    }
}

impl TxSource for MemorySource {
    fn lookup(&self, txid: &Hash) -> Result<Option<Transaction>> {
        Ok(self.transactions.get(txid).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK1_COINBASE_HEX: &str =
        "01000000010000000000000000000000000000000000000000000000000000000000000000\
         ffffffff0704ffff001d0104ffffffff0100f2052a0100000043410496b538e853519c726a\
         2c91e61ec11600ae1390813a627c66fb8be7947be63c52da7589379515d4e0a604f8141781\
         e62294721166bf621e73a82cbf2342c858eeac00000000";

    #[test]
    fn test_memory_source() {
        let tx = Transaction::from_hex(BLOCK1_COINBASE_HEX).unwrap();
        let txid = tx.txid();
        let mut source = MemorySource::new();
        source.add(tx);

        assert!(source.lookup(&txid).unwrap().is_some());
        assert!(source.lookup(&Hash::default()).unwrap().is_none());
    }

    #[test]
    fn test_cache_store_and_lookup() {
        let dir = std::env::temp_dir().join("txkit-cache-test");
        let _ = fs::remove_dir_all(&dir);
        let cache = CacheSource { dir: dir.clone() };

        let tx = Transaction::from_hex(BLOCK1_COINBASE_HEX).unwrap();
        let txid = tx.txid();

        // Miss before the entry exists.
        assert!(cache.lookup(&txid).unwrap().is_none());

        cache.store(&tx).expect("store creates the directory");
        let found = cache.lookup(&txid).unwrap().expect("hit after store");
        assert_eq!(found.to_hex(), tx.to_hex());

        let _ = fs::remove_dir_all(&dir);
    }
}
