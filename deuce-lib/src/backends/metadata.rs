//! The `MetadataBackend` capability contract (spec §4.1).
//!
//! Unlike the teacher's `Storage` trait, this trait carries no associated
//! `Error` type: every backend speaks the crate's own `Error` taxonomy
//! directly, which keeps it naturally object-safe — `Arc<dyn
//! MetadataBackend>` needs no extra `Boxed*` erasure wrapper the way the
//! teacher's `Storage`/`BoxedStorage` pair does, since there is no
//! per-backend error type to type-erase in the first place.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::file::{FileBlockRecord, FileRecord};
use crate::model::vault::VaultStats;

#[async_trait]
pub trait MetadataBackend: Send + Sync {
    /// A short diagnostic string for `/v1.0/health`.
    async fn health(&self) -> Result<String>;

    // ---- Vaults --------------------------------------------------------
    async fn create_vault(&self, vault: &str) -> Result<()>;
    async fn delete_vault(&self, vault: &str) -> Result<()>;
    async fn vault_exists(&self, vault: &str) -> Result<bool>;

    /// Unlike the other operations, which take an already project-scoped
    /// `vault` key, listing needs to filter by project on its own —
    /// `project_id` is passed separately and `marker`/the returned IDs are
    /// bare `vault_id`s, not project-scoped keys.
    async fn list_vaults(&self, project_id: &str, marker: Option<&str>, limit: usize) -> Result<Vec<String>>;
    async fn vault_stats(&self, vault: &str) -> Result<VaultStats>;

    // ---- Blocks ----------------------------------------------------------
    /// Idempotent: if `block_id` already has a live binding in `vault`,
    /// this is a no-op. Sets `ref_time = now` on the binding it creates.
    async fn register_block(
        &self,
        vault: &str,
        block_id: &str,
        storage_id: &str,
        size: u64,
    ) -> Result<()>;

    /// Precondition: `refcount(block_id) == 0`, else `Error::Conflict`.
    async fn unregister_block(&self, vault: &str, block_id: &str) -> Result<()>;

    async fn has_block(&self, vault: &str, block_id: &str) -> Result<bool>;

    /// Returns the subset of `block_ids` that have no live binding.
    async fn missing_blocks(&self, vault: &str, block_ids: &[String]) -> Result<Vec<String>>;

    async fn storage_id(&self, vault: &str, block_id: &str) -> Result<Option<String>>;

    /// Reverse lookup: the live `block_id` bound to `storage_id`, if any.
    async fn metadata_id(&self, vault: &str, storage_id: &str) -> Result<Option<String>>;

    async fn block_size(&self, vault: &str, block_id: &str) -> Result<Option<u64>>;

    async fn block_ref_count(&self, vault: &str, block_id: &str) -> Result<u64>;

    /// Unix-seconds timestamp of the block's last refcount/registration
    /// change, if the block exists.
    async fn block_ref_modified(&self, vault: &str, block_id: &str) -> Result<Option<i64>>;

    async fn block_invalid(&self, vault: &str, block_id: &str) -> Result<bool>;

    async fn mark_block_invalid(&self, vault: &str, block_id: &str) -> Result<()>;

    async fn list_blocks(&self, vault: &str, marker: Option<&str>, limit: usize) -> Result<Vec<String>>;

    /// Bulk refcount delta; updates `ref_time` on every block that still
    /// exists. Blocks that don't exist are silently skipped — the caller
    /// (FileService) is responsible for surfacing the consequence (a gap
    /// at finalization time).
    async fn inc_refs(&self, vault: &str, block_ids: &[String], delta: i64) -> Result<()>;

    // ---- Files -----------------------------------------------------------
    async fn create_file(&self, vault: &str, file_id: &str) -> Result<()>;
    async fn has_file(&self, vault: &str, file_id: &str) -> Result<bool>;
    async fn is_finalized(&self, vault: &str, file_id: &str) -> Result<bool>;
    async fn file_size(&self, vault: &str, file_id: &str) -> Result<Option<u64>>;

    /// Removes the file row and decrements refcounts for every block it
    /// referenced (spec §3 lifecycle summary).
    async fn delete_file(&self, vault: &str, file_id: &str) -> Result<()>;

    /// Bulk-assigns `(block_id, offset)` pairs to `file_id`, incrementing
    /// each block's refcount by one as part of the same operation.
    /// Returns the subset of `block_ids` that were not yet registered at
    /// assignment time (their size is recorded as unknown until the next
    /// finalize attempt looks it up again).
    async fn assign_blocks(
        &self,
        vault: &str,
        file_id: &str,
        assignments: &[(String, u64)],
    ) -> Result<Vec<String>>;

    async fn list_file_blocks(
        &self,
        vault: &str,
        file_id: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> Result<Vec<FileBlockRecord>>;

    /// Runs the gap/overlap walk of spec §4.4 and, only on a clean walk,
    /// flips `finalized = true, size = declared_size`. Fails with
    /// `Error::Conflict` describing the gap or overlap; never partial.
    async fn finalize_file(&self, vault: &str, file_id: &str, declared_size: u64) -> Result<()>;

    async fn list_files(
        &self,
        vault: &str,
        finalized: Option<bool>,
        marker: Option<&str>,
        limit: usize,
    ) -> Result<Vec<FileRecord>>;
}
