//! Pluggable metadata/block backends, selected by a configuration tag.
//!
//! Grounded in the teacher's `data/storage` module: a trait describing a
//! capability (`MetadataBackend`/`BlockBackend`), one or more concrete
//! implementations, and a constructor keyed off `Config` rather than a
//! compile-time feature flag, so new backends can be added without
//! touching call sites.

pub mod block_backend;
pub mod fs_block;
pub mod memory_block;
pub mod memory_metadata;
pub mod metadata;

use std::sync::Arc;

use crate::config::{BlockBackendConfig, MetadataBackendConfig};
use crate::error::{Error, Result};

pub use block_backend::BlockBackend;
pub use metadata::MetadataBackend;

pub fn build_metadata_backend(config: &MetadataBackendConfig) -> Result<Arc<dyn MetadataBackend>> {
    match config.kind.as_str() {
        "memory" => Ok(Arc::new(memory_metadata::InMemoryMetadataBackend::new())),
        other => Err(Error::Internal(format!("unknown metadata_backend.kind {other:?}"))),
    }
}

pub fn build_block_backend(config: &BlockBackendConfig) -> Result<Arc<dyn BlockBackend>> {
    match config.kind.as_str() {
        "memory" => Ok(Arc::new(memory_block::InMemoryBlockBackend::new())),
        "filesystem" => Ok(Arc::new(fs_block::FilesystemBlockBackend::new(config.base_dir.clone()))),
        other => Err(Error::Internal(format!("unknown block_backend.kind {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_known_backend_kinds() {
        assert!(build_metadata_backend(&MetadataBackendConfig { kind: "memory".to_string() }).is_ok());
        assert!(build_block_backend(&BlockBackendConfig {
            kind: "memory".to_string(),
            base_dir: "./unused".to_string(),
        })
        .is_ok());
        assert!(build_block_backend(&BlockBackendConfig {
            kind: "filesystem".to_string(),
            base_dir: "./unused".to_string(),
        })
        .is_ok());
    }

    #[test]
    fn rejects_unknown_kind() {
        assert!(build_metadata_backend(&MetadataBackendConfig { kind: "bogus".to_string() }).is_err());
    }
}
