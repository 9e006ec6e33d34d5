//! Vault identity and statistics.

use serde::Serialize;

use crate::error::{Error, Result};

/// `vault_id` must match `[A-Za-z0-9_-]{1,128}` (spec §6 "Validation rules").
pub fn validate_vault_id(vault_id: &str) -> Result<()> {
    let len_ok = !vault_id.is_empty() && vault_id.len() <= 128;
    let chars_ok = vault_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if len_ok && chars_ok {
        Ok(())
    } else {
        Err(Error::BadRequest(format!(
            "invalid vault_id {vault_id:?}: expected [A-Za-z0-9_-]{{1,128}}"
        )))
    }
}

/// Statistics held by the metadata backend for a vault (spec §4.1
/// `get_vault_stats`).
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct VaultStats {
    pub files: u64,
    pub blocks: u64,
}

/// Statistics held by the block backend for a vault (spec §4.2
/// `get_vault_stats`).
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct VaultStorageStats {
    pub total_size: u64,
    pub block_count: u64,
    pub last_modification_time: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_ids() {
        assert!(validate_vault_id("vault_A").is_ok());
        assert!(validate_vault_id("a").is_ok());
        assert!(validate_vault_id(&"a".repeat(128)).is_ok());
    }

    #[test]
    fn rejects_invalid_ids() {
        assert!(validate_vault_id("").is_err());
        assert!(validate_vault_id(&"a".repeat(129)).is_err());
        assert!(validate_vault_id("has a space").is_err());
        assert!(validate_vault_id("has/slash").is_err());
    }
}
