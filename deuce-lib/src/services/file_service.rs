//! File assignment, finalization, streaming, and deletion (spec §4.4).

use std::io;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::backends::{BlockBackend, MetadataBackend};
use crate::constants::download::QUEUE_BUFFER_SIZE;
use crate::constants::pagination::MAX_PAGE_LIMIT;
use crate::error::{Error, Result};
use crate::model::block::validate_block_id;
use crate::model::file::{FileBlockRecord, FileRecord};

/// One chunk of a streamed file download, or the I/O-shaped error a
/// consuming `axum::body::Body::from_stream` expects.
pub type FileChunk = io::Result<Bytes>;

pub struct FileService {
    metadata: Arc<dyn MetadataBackend>,
    storage: Arc<dyn BlockBackend>,
}

impl FileService {
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

    pub async fn create(&self, vault: &str) -> Result<String> {
        self.require_vault(vault).await?;
        let file_id = Uuid::new_v4().hyphenated().to_string();
        self.metadata.create_file(vault, &file_id).await?;
        Ok(file_id)
    }

    /// Bulk-assigns `(block_id, offset)` pairs. Rejected outright if the
    /// file is already finalized (spec §3 invariant 3); unregistered
    /// block IDs are accepted here and only surface as a gap at
    /// finalization time (spec §4.4).
    pub async fn assign_blocks(&self, vault: &str, file_id: &str, assignments: Vec<(String, u64)>) -> Result<()> {
        self.require_vault(vault).await?;
        if !self.metadata.has_file(vault, file_id).await? {
            return Err(Error::NotFound(format!("file {file_id:?} does not exist")));
        }

        for (block_id, _offset) in &assignments {
            validate_block_id(block_id)?;
        }

        self.metadata.assign_blocks(vault, file_id, &assignments).await?;
        Ok(())
    }

    pub async fn finalize(&self, vault: &str, file_id: &str, declared_size: u64) -> Result<()> {
        self.require_vault(vault).await?;
        if !self.metadata.has_file(vault, file_id).await? {
            return Err(Error::NotFound(format!("file {file_id:?} does not exist")));
        }
        self.metadata.finalize_file(vault, file_id, declared_size).await
    }

    pub async fn is_finalized(&self, vault: &str, file_id: &str) -> Result<bool> {
        self.require_vault(vault).await?;
        if !self.metadata.has_file(vault, file_id).await? {
            return Err(Error::NotFound(format!("file {file_id:?} does not exist")));
        }
        self.metadata.is_finalized(vault, file_id).await
    }

    pub async fn list_blocks(&self, vault: &str, file_id: &str, marker: Option<&str>, limit: usize) -> Result<Vec<FileBlockRecord>> {
        self.require_vault(vault).await?;
        if !self.metadata.has_file(vault, file_id).await? {
            return Err(Error::NotFound(format!("file {file_id:?} does not exist")));
        }
        self.metadata.list_file_blocks(vault, file_id, marker, limit).await
    }

    pub async fn list(&self, vault: &str, finalized: Option<bool>, marker: Option<&str>, limit: usize) -> Result<Vec<FileRecord>> {
        self.require_vault(vault).await?;
        self.metadata.list_files(vault, finalized, marker, limit).await
    }

    /// Streams every assigned block in offset order (spec §4.4 "Streaming
    /// a finalized file"). The file must already be finalized.
    ///
    /// Grounded in the teacher's `download_by_key`/`internal_upload_by_key`
    /// handler pair (`api/handlers/files.rs`): a background task walks the
    /// work and forwards chunks over a bounded `tokio::sync::mpsc` channel,
    /// wrapped as a `tokio_stream::wrappers::ReceiverStream`, so the caller
    /// can hand the stream straight to `axum::body::Body::from_stream`
    /// without buffering the whole file in memory. Channel capacity
    /// (`QUEUE_BUFFER_SIZE`) bounds how far the producer can run ahead of a
    /// slow client.
    pub async fn stream(&self, vault: &str, file_id: &str) -> Result<(u64, ReceiverStream<FileChunk>)> {
        self.require_vault(vault).await?;
        let size = self
            .metadata
            .file_size(vault, file_id)
            .await?
            .ok_or_else(|| Error::Conflict(format!("file {file_id:?} is not finalized")))?;

        let (tx, rx) = mpsc::channel::<FileChunk>(QUEUE_BUFFER_SIZE);
        let metadata = self.metadata.clone();
        let storage = self.storage.clone();
        let vault = vault.to_string();
        let file_id = file_id.to_string();

        tokio::spawn(async move {
            if let Err(e) = Self::pump_blocks(&metadata, &storage, &vault, &file_id, &tx).await {
                let _ = tx.send(Err(io::Error::new(io::ErrorKind::Other, e.to_string()))).await;
            }
        });

        Ok((size, ReceiverStream::new(rx)))
    }

    /// The producer side of `stream`: walks `file_id`'s assigned blocks
    /// page by page, fetching each from storage and forwarding it on
    /// `tx`. Stops early (without error) if the receiver has gone away.
    async fn pump_blocks(
        metadata: &Arc<dyn MetadataBackend>,
        storage: &Arc<dyn BlockBackend>,
        vault: &str,
        file_id: &str,
        tx: &mpsc::Sender<FileChunk>,
    ) -> Result<()> {
        let mut marker: Option<String> = None;
        loop {
            let page = metadata.list_file_blocks(vault, file_id, marker.as_deref(), MAX_PAGE_LIMIT).await?;

            let truncated = page.len() > MAX_PAGE_LIMIT;
            let mut records = page;
            if truncated {
                records.truncate(MAX_PAGE_LIMIT);
            }

            for record in &records {
                let storage_id = metadata.storage_id(vault, &record.block_id).await?.ok_or_else(|| {
                    Error::Internal(format!(
                        "file {file_id:?} references block {:?} which has no storage binding",
                        record.block_id
                    ))
                })?;
                let data = storage.get_block(vault, &storage_id).await?;
                if tx.send(Ok(data)).await.is_err() {
                    return Ok(());
                }
            }

            match (truncated, records.last()) {
                (true, Some(last)) => marker = Some(last.offset.to_string()),
                _ => return Ok(()),
            }
        }
    }

    pub async fn delete(&self, vault: &str, file_id: &str) -> Result<()> {
        self.require_vault(vault).await?;
        if !self.metadata.has_file(vault, file_id).await? {
            return Err(Error::NotFound(format!("file {file_id:?} does not exist")));
        }
        self.metadata.delete_file(vault, file_id).await
    }
}
