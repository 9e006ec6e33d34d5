//! The `BlockBackend` capability contract (spec §4.2).

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::model::vault::VaultStorageStats;

#[async_trait]
pub trait BlockBackend: Send + Sync {
    async fn health(&self) -> Result<String>;

    async fn create_vault(&self, vault: &str) -> Result<()>;
    async fn delete_vault(&self, vault: &str) -> Result<()>;
    async fn vault_exists(&self, vault: &str) -> Result<bool>;
    async fn list_vault_blocks(&self, vault: &str, marker: Option<&str>, limit: usize) -> Result<Vec<String>>;
    async fn vault_stats(&self, vault: &str) -> Result<VaultStorageStats>;

    async fn store_block(&self, vault: &str, storage_id: &str, data: Bytes) -> Result<()>;

    /// Stores a batch of `(storage_id, data)` pairs. Non-atomic across the
    /// batch: a failure partway through leaves earlier entries stored
    /// (spec §6 batch-upload semantics note this is acceptable because
    /// `storage_id` writes are idempotent and unregistered objects are
    /// swept by orphan reclamation).
    async fn store_blocks(&self, vault: &str, blocks: Vec<(String, Bytes)>) -> Result<()>;

    async fn block_exists(&self, vault: &str, storage_id: &str) -> Result<bool>;
    async fn delete_block(&self, vault: &str, storage_id: &str) -> Result<()>;
    async fn get_block(&self, vault: &str, storage_id: &str) -> Result<Bytes>;
    async fn get_block_length(&self, vault: &str, storage_id: &str) -> Result<u64>;
}
