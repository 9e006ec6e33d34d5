//! An in-process `BlockBackend`, the default so a fresh checkout runs with
//! no filesystem footprint (mirrors `InMemoryMetadataBackend`).

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::RwLock;

use crate::backends::block_backend::BlockBackend;
use crate::error::{Error, Result};
use crate::model::vault::VaultStorageStats;

#[derive(Debug, Default)]
pub struct InMemoryBlockBackend {
    vaults: RwLock<BTreeMap<String, BTreeMap<String, Bytes>>>,
}

impl InMemoryBlockBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(vault: &str) -> Error {
    Error::NotFound(format!("vault {vault:?} does not exist"))
}

#[async_trait]
impl BlockBackend for InMemoryBlockBackend {
    async fn health(&self) -> Result<String> {
        Ok("in-memory block backend: ok".to_string())
    }

    async fn create_vault(&self, vault: &str) -> Result<()> {
        self.vaults.write().entry(vault.to_string()).or_default();
        Ok(())
    }

    async fn delete_vault(&self, vault: &str) -> Result<()> {
        self.vaults.write().remove(vault);
        Ok(())
    }

    async fn vault_exists(&self, vault: &str) -> Result<bool> {
        Ok(self.vaults.read().contains_key(vault))
    }

    async fn list_vault_blocks(&self, vault: &str, marker: Option<&str>, limit: usize) -> Result<Vec<String>> {
        let vaults = self.vaults.read();
        let data = vaults.get(vault).ok_or_else(|| not_found(vault))?;
        let mut ids: Vec<String> = match marker {
            Some(marker) => data.keys().filter(|id| id.as_str() > marker).cloned().collect(),
            None => data.keys().cloned().collect(),
        };
        ids.truncate(limit + 1);
        Ok(ids)
    }

    async fn vault_stats(&self, vault: &str) -> Result<VaultStorageStats> {
        let vaults = self.vaults.read();
        let data = vaults.get(vault).ok_or_else(|| not_found(vault))?;
        let total_size = data.values().map(|b| b.len() as u64).sum();
        Ok(VaultStorageStats {
            total_size,
            block_count: data.len() as u64,
            last_modification_time: (!data.is_empty()).then(|| Utc::now().timestamp()),
        })
    }

    async fn store_block(&self, vault: &str, storage_id: &str, data: Bytes) -> Result<()> {
        let mut vaults = self.vaults.write();
        let vault_data = vaults.entry(vault.to_string()).or_default();
        vault_data.insert(storage_id.to_string(), data);
        Ok(())
    }

    async fn store_blocks(&self, vault: &str, blocks: Vec<(String, Bytes)>) -> Result<()> {
        let mut vaults = self.vaults.write();
        let vault_data = vaults.entry(vault.to_string()).or_default();
        for (storage_id, data) in blocks {
            vault_data.insert(storage_id, data);
        }
        Ok(())
    }

    async fn block_exists(&self, vault: &str, storage_id: &str) -> Result<bool> {
        let vaults = self.vaults.read();
        let data = vaults.get(vault).ok_or_else(|| not_found(vault))?;
        Ok(data.contains_key(storage_id))
    }

    async fn delete_block(&self, vault: &str, storage_id: &str) -> Result<()> {
        let mut vaults = self.vaults.write();
        if let Some(data) = vaults.get_mut(vault) {
            data.remove(storage_id);
        }
        Ok(())
    }

    async fn get_block(&self, vault: &str, storage_id: &str) -> Result<Bytes> {
        let vaults = self.vaults.read();
        let data = vaults.get(vault).ok_or_else(|| not_found(vault))?;
        data.get(storage_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("storage object {storage_id:?} does not exist")))
    }

    async fn get_block_length(&self, vault: &str, storage_id: &str) -> Result<u64> {
        self.get_block(vault, storage_id).await.map(|b| b.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_block() {
        let backend = InMemoryBlockBackend::new();
        backend.create_vault("v1").await.unwrap();
        backend.store_block("v1", "abc_1", Bytes::from_static(b"hi")).await.unwrap();
        assert_eq!(backend.get_block("v1", "abc_1").await.unwrap(), Bytes::from_static(b"hi"));
        backend.delete_block("v1", "abc_1").await.unwrap();
        assert!(!backend.block_exists("v1", "abc_1").await.unwrap());
    }
}
