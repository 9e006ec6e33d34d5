//! Request-body and header decoding shared across handlers.

use axum::http::HeaderMap;
use bytes::Bytes;

use crate::constants::headers::FILE_LENGTH;
use crate::error::{Error, Result};
use crate::model::block::validate_block_id;

/// Decodes a batched block upload (spec §6 "Batch upload body format"): a
/// self-describing MessagePack map from 40-hex `block_id` strings to raw
/// block bytes. Rejects anything that isn't a map at the top level.
pub fn decode_msgpack_batch(body: &[u8]) -> Result<Vec<(String, Bytes)>> {
    let value: rmpv::Value = rmpv::decode::read_value(&mut &body[..])
        .map_err(|e| Error::BadRequest(format!("invalid MessagePack batch body: {e}")))?;

    let entries = value
        .as_map()
        .ok_or_else(|| Error::BadRequest("batch upload body must be a MessagePack map".to_string()))?;

    entries
        .iter()
        .map(|(key, val)| {
            let block_id = key
                .as_str()
                .ok_or_else(|| Error::BadRequest("batch upload map keys must be strings".to_string()))?
                .to_string();
            validate_block_id(&block_id)?;

            let data = val
                .as_slice()
                .ok_or_else(|| Error::BadRequest(format!("batch upload entry {block_id:?} must be binary")))?;

            Ok((block_id, Bytes::copy_from_slice(data)))
        })
        .collect()
}

/// Parses `Content-Length` if present, for the length-mismatch check of
/// spec §4.3 step 3.
pub fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
}

/// Parses `X-File-Length`, which marks a `POST` to a file as a
/// finalization rather than an assignment (spec §6).
pub fn file_length(headers: &HeaderMap) -> Result<Option<u64>> {
    match headers.get(FILE_LENGTH) {
        None => Ok(None),
        Some(value) => {
            let text = value
                .to_str()
                .map_err(|_| Error::BadRequest(format!("{FILE_LENGTH} header is not valid UTF-8")))?;
            let size: u64 = text
                .parse()
                .map_err(|_| Error::BadRequest(format!("{FILE_LENGTH} header {text:?} is not a valid length")))?;
            Ok(Some(size))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_simple_batch() {
        let block_id = "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d";
        let mut map = Vec::new();
        map.push((rmpv::Value::from(block_id), rmpv::Value::from(b"hello".to_vec())));
        let value = rmpv::Value::Map(map);

        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &value).unwrap();

        let decoded = decode_msgpack_batch(&buf).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].0, block_id);
        assert_eq!(decoded[0].1, Bytes::from_static(b"hello"));
    }

    #[test]
    fn rejects_non_map_bodies() {
        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &rmpv::Value::from(1)).unwrap();
        assert!(decode_msgpack_batch(&buf).is_err());
    }
}
