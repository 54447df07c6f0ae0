//! Milestone store using RocksDB
//!
//! # Column Families
//!
//! - `milestones` - Milestone records (key: milestone_id)
//! - `project_index` - Secondary index (key: project_id || milestone_id)
//!
//! Milestone IDs are UUIDv7, so iterating the project index yields milestones
//! in creation order.

use crate::{
    error::{Error, Result},
    types::Milestone,
    Config,
};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB,
};
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_MILESTONES: &str = "milestones";
const CF_PROJECT_INDEX: &str = "project_index";

/// Storage wrapper for milestone records
pub struct MilestoneStore {
    db: Arc<DB>,
}

impl std::fmt::Debug for MilestoneStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MilestoneStore").finish_non_exhaustive()
    }
}

impl MilestoneStore {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.milestone_data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_MILESTONES, Self::cf_options_milestones()),
            ColumnFamilyDescriptor::new(CF_PROJECT_INDEX, Self::cf_options_index()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened milestone store at {:?}", path);

        Ok(Self { db: Arc::new(db) })
    }

    fn cf_options_milestones() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_index() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    fn index_key(project_id: &Uuid, milestone_id: &Uuid) -> [u8; 32] {
        let mut key = [0u8; 32];
        key[..16].copy_from_slice(project_id.as_bytes());
        key[16..].copy_from_slice(milestone_id.as_bytes());
        key
    }

    /// Insert a new milestone and its project index entry atomically
    pub fn insert(&self, milestone: &Milestone) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_milestones = self.cf_handle(CF_MILESTONES)?;
        let value = bincode::serialize(milestone)?;
        batch.put_cf(cf_milestones, milestone.milestone_id.as_bytes(), &value);

        let cf_index = self.cf_handle(CF_PROJECT_INDEX)?;
        let idx = Self::index_key(&milestone.project_id, &milestone.milestone_id);
        batch.put_cf(cf_index, idx, []);

        self.db.write(batch)?;

        tracing::debug!(
            milestone_id = %milestone.milestone_id,
            project_id = %milestone.project_id,
            "Milestone created"
        );

        Ok(())
    }

    /// Get milestone by ID
    pub fn get(&self, milestone_id: Uuid) -> Result<Option<Milestone>> {
        let cf = self.cf_handle(CF_MILESTONES)?;

        match self.db.get_cf(cf, milestone_id.as_bytes())? {
            Some(value) => {
                let milestone: Milestone = bincode::deserialize(&value)?;
                Ok(Some(milestone))
            }
            None => Ok(None),
        }
    }

    /// Persist an updated milestone (index entry is immutable)
    pub fn put(&self, milestone: &Milestone) -> Result<()> {
        let cf = self.cf_handle(CF_MILESTONES)?;
        let value = bincode::serialize(milestone)?;

        self.db.put_cf(cf, milestone.milestone_id.as_bytes(), &value)?;

        tracing::debug!(
            milestone_id = %milestone.milestone_id,
            status = %milestone.status,
            "Milestone updated"
        );

        Ok(())
    }

    /// All milestones for a project, ordered by creation time ascending
    pub fn list_for_project(&self, project_id: Uuid) -> Result<Vec<Milestone>> {
        let cf_index = self.cf_handle(CF_PROJECT_INDEX)?;
        let prefix = project_id.as_bytes();

        let iter = self.db.iterator_cf(
            cf_index,
            IteratorMode::From(prefix, rocksdb::Direction::Forward),
        );

        let mut milestones = Vec::new();
        for item in iter {
            let (key, _) = item?;

            // Stop once the scan leaves this project's key range
            if key.len() < 32 || &key[..16] != prefix.as_slice() {
                break;
            }

            let milestone_id_bytes: [u8; 16] = key[16..32]
                .try_into()
                .map_err(|_| Error::Storage("Malformed project index key".to_string()))?;
            let milestone_id = Uuid::from_bytes(milestone_id_bytes);

            let milestone = self.get(milestone_id)?.ok_or_else(|| {
                Error::Storage(format!(
                    "Index references missing milestone {}",
                    milestone_id
                ))
            })?;
            milestones.push(milestone);
        }

        Ok(milestones)
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("Milestone store closed gracefully");
        Ok(())
    }
}
