//! A filesystem-tree `BlockBackend` (spec §4.2 "a simple filesystem tree
//! keyed by vault and storage_id is sufficient"), grounded in the layout
//! sketched by spec §4.2 and the teacher's habit of keeping a reference
//! backend alongside the pluggable trait (`data/storage/memory.rs`).
//!
//! Layout: `{base_dir}/{vault}/{storage_id}`. Directories are created
//! lazily; blocking filesystem calls run on `tokio::task::spawn_blocking`
//! so they never stall the async runtime.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;

use crate::backends::block_backend::BlockBackend;
use crate::error::{Error, Result};
use crate::model::vault::VaultStorageStats;

#[derive(Debug, Clone)]
pub struct FilesystemBlockBackend {
    base_dir: PathBuf,
}

impl FilesystemBlockBackend {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn vault_dir(&self, vault: &str) -> PathBuf {
        self.base_dir.join(vault)
    }

    fn block_path(&self, vault: &str, storage_id: &str) -> PathBuf {
        self.vault_dir(vault).join(storage_id)
    }
}

fn io_err(context: &str, e: std::io::Error) -> Error {
    Error::Internal(format!("{context}: {e}"))
}

async fn read_dir_entries(dir: PathBuf) -> std::io::Result<Vec<String>> {
    tokio::task::spawn_blocking(move || {
        let mut names = Vec::new();
        match std::fs::read_dir(&dir) {
            Ok(entries) => {
                for entry in entries {
                    let entry = entry?;
                    if entry.file_type()?.is_file() {
                        names.push(entry.file_name().to_string_lossy().into_owned());
                    }
                }
                Ok(names)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    })
    .await
    .expect("spawn_blocking panicked")
}

#[async_trait]
impl BlockBackend for FilesystemBlockBackend {
    async fn health(&self) -> Result<String> {
        Ok(format!("filesystem block backend: ok ({})", self.base_dir.display()))
    }

    async fn create_vault(&self, vault: &str) -> Result<()> {
        let dir = self.vault_dir(vault);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| io_err("creating vault directory", e))
    }

    async fn delete_vault(&self, vault: &str) -> Result<()> {
        match tokio::fs::remove_dir_all(self.vault_dir(vault)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err("deleting vault directory", e)),
        }
    }

    async fn vault_exists(&self, vault: &str) -> Result<bool> {
        Ok(tokio::fs::metadata(self.vault_dir(vault)).await.is_ok())
    }

    async fn list_vault_blocks(&self, vault: &str, marker: Option<&str>, limit: usize) -> Result<Vec<String>> {
        let mut names = read_dir_entries(self.vault_dir(vault)).await.map_err(|e| io_err("listing vault", e))?;
        names.sort();
        if let Some(marker) = marker {
            let start = names.iter().position(|n| n.as_str() > marker).unwrap_or(names.len());
            names = names.split_off(start);
        }
        names.truncate(limit + 1);
        Ok(names)
    }

    async fn vault_stats(&self, vault: &str) -> Result<VaultStorageStats> {
        let dir = self.vault_dir(vault);
        let names = read_dir_entries(dir.clone()).await.map_err(|e| io_err("reading vault stats", e))?;

        let mut total_size = 0u64;
        let mut last_modification_time: Option<i64> = None;
        for name in &names {
            let meta = tokio::fs::metadata(dir.join(name)).await.map_err(|e| io_err("statting block", e))?;
            total_size += meta.len();
            if let Ok(modified) = meta.modified() {
                let secs = modified
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_secs() as i64)
                    .unwrap_or(0);
                last_modification_time = Some(last_modification_time.map_or(secs, |t: i64| t.max(secs)));
            }
        }

        Ok(VaultStorageStats { total_size, block_count: names.len() as u64, last_modification_time })
    }

    async fn store_block(&self, vault: &str, storage_id: &str, data: Bytes) -> Result<()> {
        tokio::fs::create_dir_all(self.vault_dir(vault)).await.map_err(|e| io_err("creating vault directory", e))?;
        let path = self.block_path(vault, storage_id);
        tokio::fs::write(&path, &data).await.map_err(|e| io_err("writing block", e))
    }

    async fn store_blocks(&self, vault: &str, blocks: Vec<(String, Bytes)>) -> Result<()> {
        for (storage_id, data) in blocks {
            self.store_block(vault, &storage_id, data).await?;
        }
        Ok(())
    }

    async fn block_exists(&self, vault: &str, storage_id: &str) -> Result<bool> {
        Ok(tokio::fs::metadata(self.block_path(vault, storage_id)).await.is_ok())
    }

    async fn delete_block(&self, vault: &str, storage_id: &str) -> Result<()> {
        match tokio::fs::remove_file(self.block_path(vault, storage_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err("deleting block", e)),
        }
    }

    async fn get_block(&self, vault: &str, storage_id: &str) -> Result<Bytes> {
        match tokio::fs::read(self.block_path(vault, storage_id)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Error::NotFound(format!("storage object {storage_id:?} does not exist")))
            }
            Err(e) => Err(io_err("reading block", e)),
        }
    }

    async fn get_block_length(&self, vault: &str, storage_id: &str) -> Result<u64> {
        match tokio::fs::metadata(self.block_path(vault, storage_id)).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Error::NotFound(format!("storage object {storage_id:?} does not exist")))
            }
            Err(e) => Err(io_err("statting block", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("deuce-fs-block-test-{}", Utc::now().timestamp_nanos_opt().unwrap_or(0)));
        dir
    }

    #[tokio::test]
    async fn stores_and_reads_back_a_block() {
        let backend = FilesystemBlockBackend::new(temp_dir());
        backend.create_vault("v1").await.unwrap();
        backend.store_block("v1", "abc_1", Bytes::from_static(b"hello")).await.unwrap();
        assert!(backend.block_exists("v1", "abc_1").await.unwrap());
        assert_eq!(backend.get_block("v1", "abc_1").await.unwrap(), Bytes::from_static(b"hello"));
        assert_eq!(backend.get_block_length("v1", "abc_1").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn missing_block_is_not_found() {
        let backend = FilesystemBlockBackend::new(temp_dir());
        backend.create_vault("v1").await.unwrap();
        let err = backend.get_block("v1", "missing").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[allow(dead_code)]
    fn path_layout_is_vault_then_storage_id(backend: &FilesystemBlockBackend, vault: &str, storage_id: &str) -> PathBuf {
        backend.block_path(vault, storage_id)
    }
}
