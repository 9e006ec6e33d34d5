//! Block upload, read, head, and delete (spec §4.3), including the
//! metadata-vs-storage divergence table that is this component's reason
//! to exist.

use std::sync::Arc;

use bytes::Bytes;

use crate::backends::{BlockBackend, MetadataBackend};
use crate::error::{Error, Result};
use crate::model::block::{mint_storage_id, sha1_hex, validate_block_id};

/// Headers common to every block response (spec §6 "Required headers").
#[derive(Debug, Clone)]
pub struct BlockHeaders {
    pub block_id: String,
    pub storage_id: String,
    pub ref_count: u64,
    pub ref_modified: Option<i64>,
}

/// The outcome of a content-addressed read (spec §4.3 divergence table).
/// `Gone` still carries the reference headers metadata knows about, since
/// the spec requires them populated on that response too — this can't be
/// expressed as a plain `Err(Error::Gone(..))` without losing them.
pub enum BlockRead {
    Found { headers: BlockHeaders, data: Bytes },
    Gone { headers: BlockHeaders, reason: String },
}

/// The outcome of a delete attempt. `Referenced` still carries the
/// reference headers the spec requires populated on the `409` response
/// (spec §8 scenario 5), which a plain `Err(Error::Conflict(..))` can't
/// express without losing them — same rationale as `BlockRead::Gone`.
pub enum BlockDelete {
    Deleted,
    Referenced { headers: BlockHeaders },
}

pub struct BlockService {
    metadata: Arc<dyn MetadataBackend>,
    storage: Arc<dyn BlockBackend>,
}

impl BlockService {
    pub fn new(metadata: Arc<dyn MetadataBackend>, storage: Arc<dyn BlockBackend>) -> Self {
        Self { metadata, storage }
    }

    async fn require_vault(&self, vault: &str) -> Result<()> {
        if self.storage.vault_exists(vault).await? {
            Ok(())
        } else {
            Err(Error::NotFound(format!("vault {vault:?} does not exist")))
        }
    }

    fn check_integrity(block_id: &str, data: &Bytes, declared_length: Option<u64>) -> Result<()> {
        validate_block_id(block_id)?;

        if let Some(declared) = declared_length {
            if declared != data.len() as u64 {
                return Err(Error::LengthMismatch(format!(
                    "content-length {declared} does not match body length {}",
                    data.len()
                )));
            }
        }

        let digest = sha1_hex(data);
        if digest != block_id {
            return Err(Error::HashMismatch(format!(
                "block_id {block_id:?} does not match SHA-1 digest {digest:?} of the uploaded bytes"
            )));
        }

        Ok(())
    }

    /// Stores and registers one block. Dedup policy from spec §4.3 step 4:
    /// registration is idempotent, so a repeat upload of the same
    /// `block_id` mints a new, immediately-orphaned storage object while
    /// the existing binding keeps winning.
    pub async fn put(&self, vault: &str, block_id: &str, data: Bytes, declared_length: Option<u64>) -> Result<BlockHeaders> {
        self.require_vault(vault).await?;
        Self::check_integrity(block_id, &data, declared_length)?;

        let storage_id = mint_storage_id(block_id);
        let size = data.len() as u64;
        self.storage.store_block(vault, &storage_id, data).await?;
        self.metadata.register_block(vault, block_id, &storage_id, size).await?;

        self.headers_for(vault, block_id).await
    }

    /// Batched upload (spec §4.3 "POST blocks"): whole-batch failure, per
    /// the Open Question resolution in §9 — the first sub-block failure
    /// aborts and surfaces as `InternalError`; blocks already stored are
    /// left for out-of-band orphan reclamation.
    pub async fn put_batch(&self, vault: &str, blocks: Vec<(String, Bytes)>) -> Result<Vec<BlockHeaders>> {
        self.require_vault(vault).await?;

        let mut headers = Vec::with_capacity(blocks.len());
        for (block_id, data) in blocks {
            let failed_id = block_id.clone();
            let result = async move {
                Self::check_integrity(&block_id, &data, None)?;
                let storage_id = mint_storage_id(&block_id);
                let size = data.len() as u64;
                self.storage.store_block(vault, &storage_id, data).await?;
                self.metadata.register_block(vault, &block_id, &storage_id, size).await?;
                self.headers_for(vault, &block_id).await
            }
            .await;

            match result {
                Ok(h) => headers.push(h),
                Err(e) => {
                    return Err(Error::Internal(format!(
                        "batch upload failed at block {failed_id:?}: {e}"
                    )))
                }
            }
        }

        Ok(headers)
    }

    async fn headers_for(&self, vault: &str, block_id: &str) -> Result<BlockHeaders> {
        let storage_id = self
            .metadata
            .storage_id(vault, block_id)
            .await?
            .ok_or_else(|| Error::Internal(format!("block {block_id:?} vanished immediately after registration")))?;
        let ref_count = self.metadata.block_ref_count(vault, block_id).await?;
        let ref_modified = self.metadata.block_ref_modified(vault, block_id).await?;
        Ok(BlockHeaders { block_id: block_id.to_string(), storage_id, ref_count, ref_modified })
    }

    /// Implements the divergence table of spec §4.3.
    pub async fn get(&self, vault: &str, block_id: &str) -> Result<BlockRead> {
        validate_block_id(block_id)?;
        self.require_vault(vault).await?;

        if !self.metadata.has_block(vault, block_id).await? {
            return Err(Error::NotFound(format!("block {block_id:?} does not exist")));
        }

        let headers = self.headers_for(vault, block_id).await?;

        match self.storage.get_block(vault, &headers.storage_id).await {
            Ok(data) => Ok(BlockRead::Found { headers, data }),
            Err(Error::NotFound(_)) => {
                self.metadata.mark_block_invalid(vault, block_id).await?;
                Ok(BlockRead::Gone {
                    reason: format!("block {block_id:?} is registered in metadata but missing from storage"),
                    headers,
                })
            }
            Err(e) => Err(e),
        }
    }

    pub async fn delete(&self, vault: &str, block_id: &str) -> Result<BlockDelete> {
        validate_block_id(block_id)?;
        self.require_vault(vault).await?;

        if !self.metadata.has_block(vault, block_id).await? {
            return Err(Error::NotFound(format!("block {block_id:?} does not exist")));
        }

        let ref_count = self.metadata.block_ref_count(vault, block_id).await?;
        if ref_count > 0 {
            return Ok(BlockDelete::Referenced { headers: self.headers_for(vault, block_id).await? });
        }

        let storage_id = self
            .metadata
            .storage_id(vault, block_id)
            .await?
            .ok_or_else(|| Error::Internal(format!("block {block_id:?} has no storage_id binding")))?;

        self.metadata.unregister_block(vault, block_id).await?;
        self.storage.delete_block(vault, &storage_id).await?;
        Ok(BlockDelete::Deleted)
    }

    pub async fn list(&self, vault: &str, marker: Option<&str>, limit: usize) -> Result<Vec<String>> {
        self.require_vault(vault).await?;
        self.metadata.list_blocks(vault, marker, limit).await
    }
}
