//! An in-process `MetadataBackend`, grounded in the teacher's
//! `data/storage/memory.rs` `InMemoryStorage` (a `parking_lot`-guarded
//! `HashMap` standing in for a real datastore, used as the default when no
//! external backend is configured).

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::backends::metadata::MetadataBackend;
use crate::error::{Error, Result};
use crate::model::file::{FileBlockRecord, FileRecord};
use crate::model::vault::VaultStats;

#[derive(Debug, Clone)]
struct BlockEntry {
    storage_id: String,
    size: u64,
    invalid: bool,
    ref_time: i64,
    ref_count: u64,
}

#[derive(Debug, Clone)]
struct FileEntry {
    finalized: bool,
    size: u64,
    // Ordered by offset; a given offset may appear more than once until
    // finalize_file rejects the overlap.
    blocks: Vec<FileBlockAssignment>,
}

#[derive(Debug, Clone)]
struct FileBlockAssignment {
    block_id: String,
    offset: u64,
}

#[derive(Debug, Default)]
struct VaultData {
    blocks: BTreeMap<String, BlockEntry>,
    files: BTreeMap<String, FileEntry>,
}

#[derive(Debug, Default)]
pub struct InMemoryMetadataBackend {
    vaults: RwLock<BTreeMap<String, VaultData>>,
}

impl InMemoryMetadataBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(kind: &str, id: &str) -> Error {
    Error::NotFound(format!("{kind} {id:?} does not exist"))
}

fn page_of<'a, T, I>(iter: I, marker: Option<&str>, limit: usize, key_of: impl Fn(&T) -> &str) -> Vec<T>
where
    T: Clone,
    I: Iterator<Item = &'a T>,
    T: 'a,
{
    let mut items: Vec<T> = if let Some(marker) = marker {
        iter.skip_while(|item| key_of(item) <= marker).cloned().collect()
    } else {
        iter.cloned().collect()
    };
    items.truncate(limit + 1);
    items
}

#[async_trait]
impl MetadataBackend for InMemoryMetadataBackend {
    async fn health(&self) -> Result<String> {
        Ok("in-memory metadata backend: ok".to_string())
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

    async fn list_vaults(&self, project_id: &str, marker: Option<&str>, limit: usize) -> Result<Vec<String>> {
        let vaults = self.vaults.read();
        let prefix = format!("{project_id}:");
        // BTreeMap keys are sorted lexicographically; since the prefix is
        // constant for this call, the stripped suffixes stay sorted too.
        let mut ids: Vec<String> = vaults
            .keys()
            .filter_map(|key| key.strip_prefix(prefix.as_str()))
            .map(|id| id.to_string())
            .collect();

        if let Some(marker) = marker {
            let start = ids.iter().position(|id| id.as_str() > marker).unwrap_or(ids.len());
            ids = ids.split_off(start);
        }
        ids.truncate(limit + 1);
        Ok(ids)
    }

    async fn vault_stats(&self, vault: &str) -> Result<VaultStats> {
        let vaults = self.vaults.read();
        let data = vaults.get(vault).ok_or_else(|| not_found("vault", vault))?;
        Ok(VaultStats {
            files: data.files.len() as u64,
            blocks: data.blocks.len() as u64,
        })
    }

    async fn register_block(&self, vault: &str, block_id: &str, storage_id: &str, size: u64) -> Result<()> {
        let mut vaults = self.vaults.write();
        let data = vaults.get_mut(vault).ok_or_else(|| not_found("vault", vault))?;
        data.blocks.entry(block_id.to_string()).or_insert_with(|| BlockEntry {
            storage_id: storage_id.to_string(),
            size,
            invalid: false,
            ref_time: Utc::now().timestamp(),
            ref_count: 0,
        });
        Ok(())
    }

    async fn unregister_block(&self, vault: &str, block_id: &str) -> Result<()> {
        let mut vaults = self.vaults.write();
        let data = vaults.get_mut(vault).ok_or_else(|| not_found("vault", vault))?;
        match data.blocks.get(block_id) {
            Some(entry) if entry.ref_count > 0 => Err(Error::Conflict(format!(
                "block {block_id:?} is still referenced by {} file(s)",
                entry.ref_count
            ))),
            Some(_) => {
                data.blocks.remove(block_id);
                Ok(())
            }
            None => Err(not_found("block", block_id)),
        }
    }

    async fn has_block(&self, vault: &str, block_id: &str) -> Result<bool> {
        let vaults = self.vaults.read();
        let data = vaults.get(vault).ok_or_else(|| not_found("vault", vault))?;
        Ok(data.blocks.contains_key(block_id))
    }

    async fn missing_blocks(&self, vault: &str, block_ids: &[String]) -> Result<Vec<String>> {
        let vaults = self.vaults.read();
        let data = vaults.get(vault).ok_or_else(|| not_found("vault", vault))?;
        Ok(block_ids
            .iter()
            .filter(|id| !data.blocks.contains_key(id.as_str()))
            .cloned()
            .collect())
    }

    async fn storage_id(&self, vault: &str, block_id: &str) -> Result<Option<String>> {
        let vaults = self.vaults.read();
        let data = vaults.get(vault).ok_or_else(|| not_found("vault", vault))?;
        Ok(data.blocks.get(block_id).map(|b| b.storage_id.clone()))
    }

    async fn metadata_id(&self, vault: &str, storage_id: &str) -> Result<Option<String>> {
        let vaults = self.vaults.read();
        let data = vaults.get(vault).ok_or_else(|| not_found("vault", vault))?;
        Ok(data
            .blocks
            .iter()
            .find(|(_, entry)| entry.storage_id == storage_id)
            .map(|(block_id, _)| block_id.clone()))
    }

    async fn block_size(&self, vault: &str, block_id: &str) -> Result<Option<u64>> {
        let vaults = self.vaults.read();
        let data = vaults.get(vault).ok_or_else(|| not_found("vault", vault))?;
        Ok(data.blocks.get(block_id).map(|b| b.size))
    }

    async fn block_ref_count(&self, vault: &str, block_id: &str) -> Result<u64> {
        let vaults = self.vaults.read();
        let data = vaults.get(vault).ok_or_else(|| not_found("vault", vault))?;
        data.blocks
            .get(block_id)
            .map(|b| b.ref_count)
            .ok_or_else(|| not_found("block", block_id))
    }

    async fn block_ref_modified(&self, vault: &str, block_id: &str) -> Result<Option<i64>> {
        let vaults = self.vaults.read();
        let data = vaults.get(vault).ok_or_else(|| not_found("vault", vault))?;
        Ok(data.blocks.get(block_id).map(|b| b.ref_time))
    }

    async fn block_invalid(&self, vault: &str, block_id: &str) -> Result<bool> {
        let vaults = self.vaults.read();
        let data = vaults.get(vault).ok_or_else(|| not_found("vault", vault))?;
        data.blocks
            .get(block_id)
            .map(|b| b.invalid)
            .ok_or_else(|| not_found("block", block_id))
    }

    async fn mark_block_invalid(&self, vault: &str, block_id: &str) -> Result<()> {
        let mut vaults = self.vaults.write();
        let data = vaults.get_mut(vault).ok_or_else(|| not_found("vault", vault))?;
        let entry = data.blocks.get_mut(block_id).ok_or_else(|| not_found("block", block_id))?;
        entry.invalid = true;
        Ok(())
    }

    async fn list_blocks(&self, vault: &str, marker: Option<&str>, limit: usize) -> Result<Vec<String>> {
        let vaults = self.vaults.read();
        let data = vaults.get(vault).ok_or_else(|| not_found("vault", vault))?;
        Ok(page_of(data.blocks.keys(), marker, limit, |k: &String| k.as_str()))
    }

    async fn inc_refs(&self, vault: &str, block_ids: &[String], delta: i64) -> Result<()> {
        let mut vaults = self.vaults.write();
        let data = vaults.get_mut(vault).ok_or_else(|| not_found("vault", vault))?;
        let now = Utc::now().timestamp();
        for block_id in block_ids {
            if let Some(entry) = data.blocks.get_mut(block_id) {
                entry.ref_count = entry.ref_count.saturating_add_signed(delta as i128 as i64);
                entry.ref_time = now;
            }
        }
        Ok(())
    }

    async fn create_file(&self, vault: &str, file_id: &str) -> Result<()> {
        let mut vaults = self.vaults.write();
        let data = vaults.get_mut(vault).ok_or_else(|| not_found("vault", vault))?;
        data.files.insert(
            file_id.to_string(),
            FileEntry { finalized: false, size: 0, blocks: Vec::new() },
        );
        Ok(())
    }

    async fn has_file(&self, vault: &str, file_id: &str) -> Result<bool> {
        let vaults = self.vaults.read();
        let data = vaults.get(vault).ok_or_else(|| not_found("vault", vault))?;
        Ok(data.files.contains_key(file_id))
    }

    async fn is_finalized(&self, vault: &str, file_id: &str) -> Result<bool> {
        let vaults = self.vaults.read();
        let data = vaults.get(vault).ok_or_else(|| not_found("vault", vault))?;
        data.files
            .get(file_id)
            .map(|f| f.finalized)
            .ok_or_else(|| not_found("file", file_id))
    }

    async fn file_size(&self, vault: &str, file_id: &str) -> Result<Option<u64>> {
        let vaults = self.vaults.read();
        let data = vaults.get(vault).ok_or_else(|| not_found("vault", vault))?;
        let file = data.files.get(file_id).ok_or_else(|| not_found("file", file_id))?;
        Ok(file.finalized.then_some(file.size))
    }

    async fn delete_file(&self, vault: &str, file_id: &str) -> Result<()> {
        let mut vaults = self.vaults.write();
        let data = vaults.get_mut(vault).ok_or_else(|| not_found("vault", vault))?;
        let file = data.files.remove(file_id).ok_or_else(|| not_found("file", file_id))?;
        let now = Utc::now().timestamp();
        for assignment in &file.blocks {
            if let Some(entry) = data.blocks.get_mut(&assignment.block_id) {
                entry.ref_count = entry.ref_count.saturating_sub(1);
                entry.ref_time = now;
            }
        }
        Ok(())
    }

    async fn assign_blocks(
        &self,
        vault: &str,
        file_id: &str,
        assignments: &[(String, u64)],
    ) -> Result<Vec<String>> {
        let mut vaults = self.vaults.write();
        let data = vaults.get_mut(vault).ok_or_else(|| not_found("vault", vault))?;

        if data.files.get(file_id).map(|f| f.finalized) == Some(true) {
            return Err(Error::Conflict(format!(
                "file {file_id:?} is already finalized"
            )));
        }
        if !data.files.contains_key(file_id) {
            return Err(not_found("file", file_id));
        }

        let missing: Vec<String> = assignments
            .iter()
            .filter(|(block_id, _)| !data.blocks.contains_key(block_id))
            .map(|(block_id, _)| block_id.clone())
            .collect();

        let now = Utc::now().timestamp();
        for (block_id, offset) in assignments {
            if let Some(entry) = data.blocks.get_mut(block_id) {
                entry.ref_count += 1;
                entry.ref_time = now;
            }
            data.files
                .get_mut(file_id)
                .expect("checked above")
                .blocks
                .push(FileBlockAssignment { block_id: block_id.clone(), offset: *offset });
        }

        Ok(missing)
    }

    async fn list_file_blocks(
        &self,
        vault: &str,
        file_id: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> Result<Vec<FileBlockRecord>> {
        let vaults = self.vaults.read();
        let data = vaults.get(vault).ok_or_else(|| not_found("vault", vault))?;
        let file = data.files.get(file_id).ok_or_else(|| not_found("file", file_id))?;

        let mut ordered = file.blocks.clone();
        ordered.sort_by_key(|a| a.offset);

        let records: Vec<FileBlockRecord> = ordered
            .into_iter()
            .map(|a| FileBlockRecord {
                size: data.blocks.get(&a.block_id).map(|b| b.size),
                block_id: a.block_id,
                offset: a.offset,
            })
            .collect();

        let start = match marker {
            Some(marker) => {
                let marker_offset: u64 = marker.parse().unwrap_or(0);
                records.iter().position(|r| r.offset > marker_offset).unwrap_or(records.len())
            }
            None => 0,
        };

        let mut page: Vec<FileBlockRecord> = records[start..].to_vec();
        page.truncate(limit + 1);
        Ok(page)
    }

    async fn finalize_file(&self, vault: &str, file_id: &str, declared_size: u64) -> Result<()> {
        let mut vaults = self.vaults.write();
        let data = vaults.get_mut(vault).ok_or_else(|| not_found("vault", vault))?;

        let sizes: BTreeMap<String, u64> = data
            .blocks
            .iter()
            .map(|(id, entry)| (id.clone(), entry.size))
            .collect();

        let file = data.files.get_mut(file_id).ok_or_else(|| not_found("file", file_id))?;
        if file.finalized {
            return Err(Error::Conflict(format!(
                "file {file_id:?} is already finalized"
            )));
        }

        let mut ordered = file.blocks.clone();
        ordered.sort_by_key(|a| a.offset);

        let mut expected: u64 = 0;
        let mut last_block_id: Option<&str> = None;
        for assignment in &ordered {
            // An assignment whose block was never (or no longer) registered
            // is skipped outright rather than rejected here — the gap it
            // leaves behind surfaces through the ordinary gap checks below.
            let size = match sizes.get(&assignment.block_id).copied() {
                Some(size) => size,
                None => continue,
            };

            if assignment.offset > expected {
                return Err(Error::Conflict(format!(
                    "gap in file {file_id:?}: expected next block at offset {expected}, found one at offset {}",
                    assignment.offset
                )));
            }
            if assignment.offset < expected {
                return Err(Error::Conflict(format!(
                    "overlap in file {file_id:?}: block {:?} at offset {} overlaps the preceding block ending at {expected}",
                    assignment.block_id, assignment.offset
                )));
            }

            expected += size;
            last_block_id = Some(&assignment.block_id);
        }

        // A clean walk still has to match the declared size exactly: short
        // is a trailing gap, long is the last block overlapping past the
        // declared end (spec §4.4 "After the walk...").
        if expected < declared_size {
            return Err(Error::Conflict(format!(
                "gap in file {file_id:?}: expected next block at offset {expected}, found none before declared length {declared_size}"
            )));
        }
        if expected > declared_size {
            return Err(Error::Conflict(format!(
                "overlap in file {file_id:?}: block {:?} extends to {expected}, past declared length {declared_size}",
                last_block_id.unwrap_or("<unknown>")
            )));
        }

        file.finalized = true;
        file.size = declared_size;
        Ok(())
    }

    async fn list_files(
        &self,
        vault: &str,
        finalized: Option<bool>,
        marker: Option<&str>,
        limit: usize,
    ) -> Result<Vec<FileRecord>> {
        let vaults = self.vaults.read();
        let data = vaults.get(vault).ok_or_else(|| not_found("vault", vault))?;

        let filtered: Vec<(&String, &FileEntry)> = data
            .files
            .iter()
            .filter(|(_, f)| finalized.map(|want| want == f.finalized).unwrap_or(true))
            .collect();

        let mut records: Vec<FileRecord> = filtered
            .into_iter()
            .map(|(id, f)| FileRecord { file_id: id.clone(), finalized: f.finalized, size: f.size })
            .collect();

        if let Some(marker) = marker {
            let start = records.iter().position(|r| r.file_id.as_str() > marker).unwrap_or(records.len());
            records = records.split_off(start);
        }
        records.truncate(limit + 1);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn vault_with_blocks(backend: &InMemoryMetadataBackend, sizes: &[u64]) -> Vec<String> {
        backend.create_vault("v1").await.unwrap();
        let mut ids = Vec::new();
        for (i, size) in sizes.iter().enumerate() {
            let block_id = format!("{:040x}", i);
            backend.register_block("v1", &block_id, &format!("{block_id}_nonce"), *size).await.unwrap();
            ids.push(block_id);
        }
        ids
    }

    #[tokio::test]
    async fn finalize_with_zero_length_and_no_assignments_succeeds() {
        let backend = InMemoryMetadataBackend::default();
        backend.create_vault("v1").await.unwrap();
        backend.create_file("v1", "f1").await.unwrap();
        backend.finalize_file("v1", "f1", 0).await.unwrap();
        assert!(backend.is_finalized("v1", "f1").await.unwrap());
        assert_eq!(backend.file_size("v1", "f1").await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn finalize_detects_a_one_byte_gap() {
        let backend = InMemoryMetadataBackend::default();
        let ids = vault_with_blocks(&backend, &[100, 100]).await;
        backend.create_file("v1", "f1").await.unwrap();
        backend
            .assign_blocks("v1", "f1", &[(ids[0].clone(), 0), (ids[1].clone(), 101)])
            .await
            .unwrap();
        let err = backend.finalize_file("v1", "f1", 201).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(ref msg) if msg.contains("gap")));
    }

    #[tokio::test]
    async fn finalize_detects_an_overlap_mid_file() {
        let backend = InMemoryMetadataBackend::default();
        let ids = vault_with_blocks(&backend, &[100, 100]).await;
        backend.create_file("v1", "f1").await.unwrap();
        backend
            .assign_blocks("v1", "f1", &[(ids[0].clone(), 0), (ids[1].clone(), 50)])
            .await
            .unwrap();
        let err = backend.finalize_file("v1", "f1", 150).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(ref msg) if msg.contains("overlap")));
    }

    #[tokio::test]
    async fn finalize_detects_last_block_extending_past_declared_length() {
        let backend = InMemoryMetadataBackend::default();
        let ids = vault_with_blocks(&backend, &[100]).await;
        backend.create_file("v1", "f1").await.unwrap();
        backend.assign_blocks("v1", "f1", &[(ids[0].clone(), 0)]).await.unwrap();
        let err = backend.finalize_file("v1", "f1", 50).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(ref msg) if msg.contains("overlap")));
    }

    #[tokio::test]
    async fn finalize_detects_trailing_gap_before_declared_length() {
        let backend = InMemoryMetadataBackend::default();
        let ids = vault_with_blocks(&backend, &[100]).await;
        backend.create_file("v1", "f1").await.unwrap();
        backend.assign_blocks("v1", "f1", &[(ids[0].clone(), 0)]).await.unwrap();
        let err = backend.finalize_file("v1", "f1", 150).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(ref msg) if msg.contains("gap")));
    }

    #[tokio::test]
    async fn finalize_skips_an_unregistered_assignment_and_reports_the_resulting_gap() {
        let backend = InMemoryMetadataBackend::default();
        let ids = vault_with_blocks(&backend, &[100]).await;
        backend.create_file("v1", "f1").await.unwrap();
        backend
            .assign_blocks("v1", "f1", &[(ids[0].clone(), 0), ("f".repeat(40), 100)])
            .await
            .unwrap();
        let err = backend.finalize_file("v1", "f1", 200).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(ref msg) if msg.contains("gap")));
    }

    #[tokio::test]
    async fn unregister_refuses_while_referenced() {
        let backend = InMemoryMetadataBackend::default();
        let ids = vault_with_blocks(&backend, &[10]).await;
        backend.create_file("v1", "f1").await.unwrap();
        backend.assign_blocks("v1", "f1", &[(ids[0].clone(), 0)]).await.unwrap();

        let err = backend.unregister_block("v1", &ids[0]).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        backend.delete_file("v1", "f1").await.unwrap();
        assert_eq!(backend.block_ref_count("v1", &ids[0]).await.unwrap(), 0);
        backend.unregister_block("v1", &ids[0]).await.unwrap();
        assert!(!backend.has_block("v1", &ids[0]).await.unwrap());
    }

    #[tokio::test]
    async fn listing_with_limit_equal_to_population_has_no_remainder() {
        let backend = InMemoryMetadataBackend::default();
        vault_with_blocks(&backend, &[1, 1, 1]).await;
        let ids = backend.list_blocks("v1", None, 3).await.unwrap();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn listing_resumes_strictly_after_a_valid_marker() {
        let backend = InMemoryMetadataBackend::default();
        let ids = vault_with_blocks(&backend, &[1, 1, 1, 1]).await;
        let first_page = backend.list_blocks("v1", None, 2).await.unwrap();
        assert_eq!(first_page.len(), 3);
        let marker = &first_page[2];
        assert_eq!(marker, &ids[2]);

        let second_page = backend.list_blocks("v1", Some(marker), 10).await.unwrap();
        assert_eq!(second_page, vec![ids[3].clone()]);
    }

    #[tokio::test]
    async fn repeated_assignment_in_any_order_finalizes_and_tiles_cleanly() {
        let backend = InMemoryMetadataBackend::default();
        let ids = vault_with_blocks(&backend, &[10, 20, 30]).await;
        backend.create_file("v1", "f1").await.unwrap();
        // Assign out of offset order; the backend sorts before walking.
        backend
            .assign_blocks(
                "v1",
                "f1",
                &[(ids[2].clone(), 30), (ids[0].clone(), 0), (ids[1].clone(), 10)],
            )
            .await
            .unwrap();
        backend.finalize_file("v1", "f1", 60).await.unwrap();

        let blocks = backend.list_file_blocks("v1", "f1", None, 10).await.unwrap();
        let offsets: Vec<u64> = blocks.iter().map(|b| b.offset).collect();
        assert_eq!(offsets, vec![0, 10, 30]);
    }
}
