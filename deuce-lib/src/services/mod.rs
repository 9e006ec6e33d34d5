//! Services module: the business logic that sits between the HTTP layer
//! and the pluggable backends.

pub mod block_service;
pub mod file_service;
pub mod health;
pub mod storage_block_service;
pub mod vault_service;

use std::sync::Arc;

use crate::backends::{self, BlockBackend, MetadataBackend};
use crate::config::Config;
use crate::error::Result;

#[derive(Clone)]
pub struct Services {
    pub vaults: Arc<vault_service::VaultService>,
    pub blocks: Arc<block_service::BlockService>,
    pub files: Arc<file_service::FileService>,
    pub storage_blocks: Arc<storage_block_service::StorageBlockService>,
    pub health: Arc<health::HealthService>,
    pub default_page_limit: usize,
    pub max_page_limit: usize,
    /// Per-request deadline budget for `RequestContext::with_timeout`
    /// (spec §5 "Cancellation and timeouts").
    pub request_timeout_secs: u64,
}

impl Services {
    pub fn new(metadata: Arc<dyn MetadataBackend>, storage: Arc<dyn BlockBackend>, config: &Config) -> Self {
        let vaults = Arc::new(vault_service::VaultService::new(metadata.clone(), storage.clone()));
        let blocks = Arc::new(block_service::BlockService::new(metadata.clone(), storage.clone()));
        let files = Arc::new(file_service::FileService::new(metadata.clone(), storage.clone()));
        let storage_blocks = Arc::new(storage_block_service::StorageBlockService::new(metadata.clone(), storage.clone()));
        let health = Arc::new(health::HealthService::new(metadata, storage));

        Self {
            vaults,
            blocks,
            files,
            storage_blocks,
            health,
            default_page_limit: config.default_page_limit,
            max_page_limit: config.max_page_limit,
            request_timeout_secs: config.request_timeout_secs,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let metadata = backends::build_metadata_backend(&config.metadata_backend)?;
        let storage = backends::build_block_backend(&config.block_backend)?;
        Ok(Self::new(metadata, storage, config))
    }

    #[cfg(feature = "mocks")]
    pub fn mocks() -> Self {
        Self::from_config(&Config::default()).expect("in-memory backends always build")
    }
}
