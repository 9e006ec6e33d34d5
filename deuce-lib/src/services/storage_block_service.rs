//! Storage-ID-addressed reads and orphan detection/reclamation (spec §4.5).

use std::sync::Arc;

use bytes::Bytes;

use crate::backends::{BlockBackend, MetadataBackend};
use crate::error::{Error, Result};
use crate::model::block::StorageBlockInfo;

pub struct StorageBlockService {
    metadata: Arc<dyn MetadataBackend>,
    storage: Arc<dyn BlockBackend>,
}

impl StorageBlockService {
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

    async fn info(&self, vault: &str, storage_id: &str) -> Result<StorageBlockInfo> {
        let size = self.storage.get_block_length(vault, storage_id).await?;
        let metadata_id = self.metadata.metadata_id(vault, storage_id).await?;

        let (ref_count, ref_modified) = match &metadata_id {
            Some(block_id) => (
                self.metadata.block_ref_count(vault, block_id).await?,
                self.metadata.block_ref_modified(vault, block_id).await?,
            ),
            None => (0, None),
        };

        Ok(StorageBlockInfo {
            storage_id: storage_id.to_string(),
            orphan: metadata_id.is_none(),
            metadata_id,
            ref_count,
            ref_modified,
            size,
        })
    }

    pub async fn head(&self, vault: &str, storage_id: &str) -> Result<StorageBlockInfo> {
        self.require_vault(vault).await?;
        self.info(vault, storage_id).await
    }

    pub async fn get(&self, vault: &str, storage_id: &str) -> Result<(StorageBlockInfo, Bytes)> {
        self.require_vault(vault).await?;
        let info = self.info(vault, storage_id).await?;
        let data = self.storage.get_block(vault, storage_id).await?;
        Ok((info, data))
    }

    /// Deletes only if the object is orphaned; a live binding is refused
    /// with the current reference count (spec §4.5).
    pub async fn delete(&self, vault: &str, storage_id: &str) -> Result<()> {
        self.require_vault(vault).await?;
        let info = self.info(vault, storage_id).await?;

        if !info.orphan {
            return Err(Error::Conflict(format!(
                "storage object {storage_id:?} is bound to block {:?} with {} reference(s)",
                info.metadata_id.unwrap_or_default(),
                info.ref_count
            )));
        }

        self.storage.delete_block(vault, storage_id).await
    }

    pub async fn list(&self, vault: &str, marker: Option<&str>, limit: usize) -> Result<Vec<String>> {
        self.require_vault(vault).await?;
        self.storage.list_vault_blocks(vault, marker, limit).await
    }
}
