//! Vault lifecycle (spec §4.6): composes both backends, storage first.

use std::sync::Arc;

use crate::backends::{BlockBackend, MetadataBackend};
use crate::error::{Error, Result};
use crate::model::vault::{VaultStats, VaultStorageStats};

pub struct VaultService {
    metadata: Arc<dyn MetadataBackend>,
    storage: Arc<dyn BlockBackend>,
}

impl VaultService {
    pub fn new(metadata: Arc<dyn MetadataBackend>, storage: Arc<dyn BlockBackend>) -> Self {
        Self { metadata, storage }
    }

    /// Creates on both backends, storage first. If the metadata side then
    /// fails, the storage vault is left behind — the next `PUT` is
    /// idempotent on both sides, so this self-heals (spec §4.6).
    pub async fn create(&self, vault: &str) -> Result<()> {
        self.storage.create_vault(vault).await?;
        self.metadata.create_vault(vault).await?;
        Ok(())
    }

    /// Existence is authoritative from the storage backend: "is there
    /// anything to serve" (spec §4.6).
    pub async fn exists(&self, vault: &str) -> Result<bool> {
        self.storage.vault_exists(vault).await
    }

    pub async fn delete(&self, vault: &str) -> Result<()> {
        let storage_stats = self.storage.vault_stats(vault).await?;
        if storage_stats.block_count > 0 {
            return Err(Error::Conflict(format!(
                "vault {vault:?} still holds {} block(s)",
                storage_stats.block_count
            )));
        }
        self.metadata.delete_vault(vault).await?;
        self.storage.delete_vault(vault).await?;
        Ok(())
    }

    pub async fn stats(&self, vault: &str) -> Result<(VaultStats, VaultStorageStats)> {
        if !self.storage.vault_exists(vault).await? {
            return Err(Error::NotFound(format!("vault {vault:?} does not exist")));
        }
        let metadata_stats = self.metadata.vault_stats(vault).await.unwrap_or_default();
        let storage_stats = self.storage.vault_stats(vault).await?;
        Ok((metadata_stats, storage_stats))
    }

    pub async fn list(&self, project_id: &str, marker: Option<&str>, limit: usize) -> Result<Vec<String>> {
        self.metadata.list_vaults(project_id, marker, limit).await
    }
}
