//! Marker/limit query parameters (spec §6 "Pagination protocol").

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub marker: Option<String>,
    pub limit: Option<usize>,
}

impl PaginationQuery {
    pub fn resolve_limit(&self, default_limit: usize, max_limit: usize) -> usize {
        self.limit.unwrap_or(default_limit).clamp(1, max_limit)
    }
}

/// Builds the `X-Next-Batch` header value: the same path with `marker`
/// advanced to the last item of the page just returned.
///
/// Identifiers in this data model (`vault_id`, `block_id`, `file_id`,
/// `storage_id`) are all drawn from restricted alphabets with no
/// query-reserved characters, so no percent-encoding is needed here.
pub fn next_batch_url(path: &str, marker: &str, limit: usize) -> String {
    format!("{path}?marker={marker}&limit={limit}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_within_bounds() {
        let q = PaginationQuery { marker: None, limit: Some(5000) };
        assert_eq!(q.resolve_limit(100, 1000), 1000);

        let q = PaginationQuery { marker: None, limit: None };
        assert_eq!(q.resolve_limit(100, 1000), 100);
    }
}
