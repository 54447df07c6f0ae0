//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `wallets` - Wallet records (key: owner uuid)
//! - `transactions` - Append-only ledger entries (key: owner uuid || seq)
//!
//! The transaction key embeds a big-endian sequence number so a prefix scan
//! over one owner yields the ledger in append order.

use crate::{
    error::{Error, Result},
    types::{Transaction, WalletRecord},
    Config,
};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, IteratorMode, Options, WriteBatch, DB,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_WALLETS: &str = "wallets";
const CF_TRANSACTIONS: &str = "transactions";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        // Database options
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_target_file_size_base(config.rocksdb.target_file_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        // Universal compaction for write-heavy workload
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        // Column family descriptors
        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_WALLETS, Self::cf_options_wallets()),
            ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Self::cf_options_transactions()),
        ];

        // Open database
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self { db: Arc::new(db) })
    }

    // Column family options

    fn cf_options_wallets() -> Options {
        let mut opts = Options::default();
        // Wallets are frequently read, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_transactions() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Key helpers

    fn txn_key(owner: &Uuid, seq: u64) -> [u8; 24] {
        let mut key = [0u8; 24];
        key[..16].copy_from_slice(owner.as_bytes());
        key[16..].copy_from_slice(&seq.to_be_bytes());
        key
    }

    // Wallet operations

    /// Load wallet record, `None` if the user has no wallet yet
    pub fn load_wallet(&self, owner: Uuid) -> Result<Option<WalletRecord>> {
        let cf = self.cf_handle(CF_WALLETS)?;

        match self.db.get_cf(cf, owner.as_bytes())? {
            Some(value) => {
                let record: WalletRecord = bincode::deserialize(&value)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Put wallet record without a ledger entry (lazy creation on read)
    pub fn put_wallet(&self, record: &WalletRecord) -> Result<()> {
        let cf = self.cf_handle(CF_WALLETS)?;
        let value = bincode::serialize(record)?;

        self.db.put_cf(cf, record.owner.as_bytes(), &value)?;

        Ok(())
    }

    /// Persist one wallet mutation and its ledger entry atomically.
    ///
    /// `record` must already reflect the applied transaction; the entry is
    /// written at sequence `record.tx_count - 1`.
    pub fn apply_entry(&self, record: &WalletRecord, txn: &Transaction) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.stage_entry(&mut batch, record, txn)?;
        self.db.write(batch)?;

        tracing::debug!(
            owner = %record.owner,
            kind = %txn.kind,
            amount = %txn.amount,
            balance = %record.balance,
            "Ledger entry appended"
        );

        Ok(())
    }

    /// Persist a two-wallet transfer atomically.
    ///
    /// Both wallet records and both ledger entries land in a single batch:
    /// either the debit and the credit are durable together, or neither is.
    pub fn apply_pair(
        &self,
        payer: &WalletRecord,
        payer_txn: &Transaction,
        payee: &WalletRecord,
        payee_txn: &Transaction,
    ) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.stage_entry(&mut batch, payer, payer_txn)?;
        self.stage_entry(&mut batch, payee, payee_txn)?;
        self.db.write(batch)?;

        tracing::debug!(
            payer = %payer.owner,
            payee = %payee.owner,
            amount = %payee_txn.amount,
            "Transfer committed"
        );

        Ok(())
    }

    fn stage_entry(
        &self,
        batch: &mut WriteBatch,
        record: &WalletRecord,
        txn: &Transaction,
    ) -> Result<()> {
        if record.tx_count == 0 {
            return Err(Error::Storage(
                "Wallet record has no appended entry to stage".to_string(),
            ));
        }

        let cf_wallets = self.cf_handle(CF_WALLETS)?;
        let wallet_value = bincode::serialize(record)?;
        batch.put_cf(cf_wallets, record.owner.as_bytes(), &wallet_value);

        let cf_txns = self.cf_handle(CF_TRANSACTIONS)?;
        let seq = record.tx_count - 1;
        let txn_value = bincode::serialize(txn)?;
        batch.put_cf(cf_txns, Self::txn_key(&record.owner, seq), &txn_value);

        Ok(())
    }

    // Ledger reads

    /// All ledger entries for one owner, in append order
    pub fn list_transactions(&self, owner: Uuid) -> Result<Vec<Transaction>> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        let prefix = owner.as_bytes();

        let iter = self.db.iterator_cf(
            cf,
            IteratorMode::From(prefix, rocksdb::Direction::Forward),
        );

        let mut transactions = Vec::new();
        for item in iter {
            let (key, value) = item?;

            // Stop once the scan leaves this owner's key range
            if key.len() < 16 || &key[..16] != prefix.as_slice() {
                break;
            }

            let txn: Transaction = bincode::deserialize(&value)?;
            transactions.push(txn);
        }

        Ok(transactions)
    }

    /// Recompute the ledger sum and compare it to the stored balance.
    ///
    /// The wallet invariant: `balance == Σ(transactions.amount)`.
    pub fn verify_ledger(&self, owner: Uuid) -> Result<bool> {
        let balance = match self.load_wallet(owner)? {
            Some(record) => record.balance,
            None => return Ok(true), // no wallet, nothing to violate
        };

        let sum: Decimal = self
            .list_transactions(owner)?
            .iter()
            .map(|t| t.amount)
            .sum();

        Ok(sum == balance)
    }

    // Statistics

    /// Get storage statistics
    pub fn get_stats(&self) -> Result<StorageStats> {
        let cf_wallets = self.cf_handle(CF_WALLETS)?;
        let cf_txns = self.cf_handle(CF_TRANSACTIONS)?;

        Ok(StorageStats {
            total_wallets: self.approximate_count(cf_wallets)?,
            total_transactions: self.approximate_count(cf_txns)?,
        })
    }

    fn approximate_count(&self, cf: &ColumnFamily) -> Result<u64> {
        // RocksDB property for approximate count
        let prop = self
            .db
            .property_int_value_cf(cf, "rocksdb.estimate-num-keys")?
            .unwrap_or(0);

        Ok(prop)
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Approximate wallet count
    pub total_wallets: u64,
    /// Approximate ledger entry count
    pub total_transactions: u64,
}
