use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::{anyhow, Result};
use legacy_kernel_core::WillRecord;

/// Keyed record storage, the one external collaborator the kernel needs.
/// `put` is insert-or-overwrite keyed by the record's address; `get`
/// returns the record or not-found. No deletion or update operation.
pub trait WillStore {
    /// Persist one minted record under its address.
    ///
    /// # Errors
    /// Returns an error when the backing storage is unavailable.
    fn put(&self, record: WillRecord) -> Result<()>;

    /// Look up one record by address.
    ///
    /// # Errors
    /// Returns an error when the backing storage is unavailable.
    fn get(&self, address: &str) -> Result<Option<WillRecord>>;

    /// List every stored record, ordered by address for stable output.
    ///
    /// # Errors
    /// Returns an error when the backing storage is unavailable.
    fn list(&self) -> Result<Vec<WillRecord>>;
}

/// Volatile in-process store. Durability is a non-goal; records live only
/// as long as the process. Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<String, WillRecord>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    ///
    /// # Errors
    /// Returns an error when the store lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        let records = self.records.read().map_err(|_| anyhow!("will store lock poisoned"))?;
        Ok(records.len())
    }

    /// Whether the store holds no records.
    ///
    /// # Errors
    /// Returns an error when the store lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl WillStore for MemoryStore {
    fn put(&self, record: WillRecord) -> Result<()> {
        let mut records = self.records.write().map_err(|_| anyhow!("will store lock poisoned"))?;
        records.insert(record.address.clone(), record);
        Ok(())
    }

    fn get(&self, address: &str) -> Result<Option<WillRecord>> {
        let records = self.records.read().map_err(|_| anyhow!("will store lock poisoned"))?;
        Ok(records.get(address).cloned())
    }

    fn list(&self) -> Result<Vec<WillRecord>> {
        let records = self.records.read().map_err(|_| anyhow!("will store lock poisoned"))?;
        let mut listed = records.values().cloned().collect::<Vec<_>>();
        listed.sort_by(|lhs, rhs| lhs.address.cmp(&rhs.address));
        Ok(listed)
    }
}
