//! File and file-block record shapes (spec §3 "File", "FileBlock").

use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};

/// `file_id` is a lowercase RFC 4122 version-4 UUID.
pub fn validate_file_id(file_id: &str) -> Result<Uuid> {
    let uuid = Uuid::parse_str(file_id)
        .map_err(|e| Error::BadRequest(format!("invalid file_id {file_id:?}: {e}")))?;

    if uuid.get_version_num() != 4 {
        return Err(Error::BadRequest(format!(
            "invalid file_id {file_id:?}: expected a version-4 UUID"
        )));
    }

    if file_id != uuid.hyphenated().to_string() {
        return Err(Error::BadRequest(format!(
            "invalid file_id {file_id:?}: expected lowercase hyphenated form"
        )));
    }

    Ok(uuid)
}

#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub file_id: String,
    pub finalized: bool,
    pub size: u64,
}

/// An ordered block assignment within a file (spec §3 "FileBlock"). `size`
/// is the block's size as known at assignment time; it is `None` when the
/// block had not yet been registered (spec §4.1 `assign_blocks`).
#[derive(Debug, Clone, Serialize)]
pub struct FileBlockRecord {
    pub block_id: String,
    pub offset: u64,
    pub size: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_lowercase_v4_uuid() {
        let id = Uuid::new_v4().hyphenated().to_string();
        assert!(validate_file_id(&id).is_ok());
    }

    #[test]
    fn rejects_uppercase_and_non_v4() {
        let v4 = Uuid::new_v4().hyphenated().to_string();
        assert!(validate_file_id(&v4.to_uppercase()).is_err());
        // A nil UUID is version 0, not 4.
        assert!(validate_file_id(&Uuid::nil().to_string()).is_err());
    }
}
