//! HTTP handlers, one module per resource family (spec §6 "HTTP surface").

pub mod blocks;
pub mod files;
pub mod home;
pub mod pagination;
pub mod storage_blocks;
pub mod vaults;

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{Error, Result};

/// Builds a `HeaderMap` from `(name, value)` pairs, used to attach the
/// block/storage-block headers spec §6 requires on every response.
pub fn header_map(pairs: &[(&'static str, String)]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let header_name = HeaderName::from_static(name);
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| Error::Internal(format!("invalid header value for {name}: {e}")))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}
