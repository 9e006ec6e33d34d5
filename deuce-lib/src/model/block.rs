//! Block identity, storage-ID minting, and the metadata record shape.

use serde::Serialize;
use uuid::Uuid;

use crate::constants::ids::BLOCK_ID_LEN;
use crate::error::{Error, Result};

/// `block_id` is `[a-f0-9]{40}`: a lowercase-hex SHA-1 of the block bytes.
pub fn validate_block_id(block_id: &str) -> Result<()> {
    let ok = block_id.len() == BLOCK_ID_LEN
        && block_id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase());

    if ok {
        Ok(())
    } else {
        Err(Error::BadRequest(format!(
            "invalid block_id {block_id:?}: expected {BLOCK_ID_LEN} lowercase hex characters"
        )))
    }
}

/// Computes the SHA-1 hex digest of a block's bytes.
pub fn sha1_hex(bytes: &[u8]) -> String {
    use sha1::{Digest, Sha1};
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Mints a fresh `storage_id` for a new registration of `block_id`.
///
/// `storage_id` has the form `{block_id}_{uuid}`: a per-registration nonce
/// appended to the content hash, so repeated uploads of identical bytes
/// produce distinct storage objects (spec §3 "Block").
pub fn mint_storage_id(block_id: &str) -> String {
    format!("{block_id}_{}", Uuid::new_v4())
}

/// The payload returned for a storage-ID-addressed lookup (spec §4.5
/// `GET/HEAD vault/storage/blocks/{storage_id}`).
#[derive(Debug, Clone, Serialize)]
pub struct StorageBlockInfo {
    pub storage_id: String,
    pub metadata_id: Option<String>,
    pub ref_count: u64,
    pub ref_modified: Option<i64>,
    pub size: u64,
    pub orphan: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha1_of_hello_matches_known_digest() {
        assert_eq!(
            sha1_hex(b"hello"),
            "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"
        );
    }

    #[test]
    fn distinct_storage_ids_share_block_id_prefix() {
        let a = mint_storage_id("aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
        let b = mint_storage_id("aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
        assert_ne!(a, b);
        assert!(a.starts_with("aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d_"));
        assert!(b.starts_with("aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d_"));
    }

    #[test]
    fn validates_lowercase_hex_40() {
        assert!(validate_block_id("aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d").is_ok());
        assert!(validate_block_id("AAF4c61ddcc5e8a2dabede0f3b482cd9aea9434d").is_err());
        assert!(validate_block_id("too-short").is_err());
    }
}
