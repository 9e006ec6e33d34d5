//! Backend diagnostics for `GET /v1.0/health` (spec §6): a JSON array of
//! the health strings both backends report.

use std::sync::Arc;

use tracing::debug;

use crate::backends::{BlockBackend, MetadataBackend};

pub struct HealthService {
    metadata: Arc<dyn MetadataBackend>,
    storage: Arc<dyn BlockBackend>,
}

impl HealthService {
    pub fn new(metadata: Arc<dyn MetadataBackend>, storage: Arc<dyn BlockBackend>) -> Self {
        Self { metadata, storage }
    }

    pub async fn check(&self) -> Vec<String> {
        debug!("running backend health checks");

        let metadata = match self.metadata.health().await {
            Ok(status) => status,
            Err(e) => format!("metadata backend error: {e}"),
        };
        let storage = match self.storage.health().await {
            Ok(status) => status,
            Err(e) => format!("block backend error: {e}"),
        };

        vec![metadata, storage]
    }
}
