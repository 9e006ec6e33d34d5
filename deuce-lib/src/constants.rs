//! Constants shared across the backend.

/// Default HTTP server configuration.
pub mod server {
    pub const DEFAULT_HOST: &str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 8080;

    /// Cap on a request body (batched block uploads can be large).
    pub const MAX_BODY_BYTES: usize = 200 * 1024 * 1024;
}

/// Pagination defaults for listing endpoints (§6 "Pagination protocol").
pub mod pagination {
    pub const DEFAULT_PAGE_LIMIT: usize = 100;
    pub const MAX_PAGE_LIMIT: usize = 1000;
}

/// File-download streaming (spec §4.4 "Streaming a finalized file").
pub mod download {
    /// Bound on how many fetched-but-unsent blocks a file download can
    /// buffer in its channel before the producer blocks, so a slow client
    /// can't force the whole file into memory at once.
    pub const QUEUE_BUFFER_SIZE: usize = 16;
}

/// Identifier shapes (§6 "Validation rules").
pub mod ids {
    /// `block_id`: lowercase 40-hex SHA-1.
    pub const BLOCK_ID_LEN: usize = 40;

    /// `vault_id`: `[A-Za-z0-9_-]{1,128}`.
    pub const VAULT_ID_MAX_LEN: usize = 128;
}

/// Required/produced HTTP header names.
pub mod headers {
    pub const PROJECT_ID: &str = "x-project-id";
    pub const TRANSACTION_ID: &str = "transaction-id";
    pub const BLOCK_ID: &str = "x-block-id";
    pub const STORAGE_ID: &str = "x-storage-id";
    pub const BLOCK_REF_COUNT: &str = "x-block-reference-count";
    pub const REF_MODIFIED: &str = "x-ref-modified";
    pub const BLOCK_ORPHANED: &str = "x-block-orphaned";
    pub const BLOCK_SIZE: &str = "x-block-size";
    pub const BLOCK_LOCATION: &str = "x-block-location";
    pub const NEXT_BATCH: &str = "x-next-batch";
    pub const FILE_LENGTH: &str = "x-file-length";
}
