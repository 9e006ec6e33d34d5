//! Marker/limit pagination helper (spec §6 "Pagination protocol").
//!
//! Backends fetch `limit + 1` items; if that many come back, the extra one
//! is popped and its identifier becomes the marker for the next page.

/// A page of listing results plus the marker for the next page, if any.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_marker: Option<String>,
}

impl<T> Page<T> {
    /// Builds a `Page` from a fetch of up to `limit + 1` items.
    pub fn from_fetch(mut items: Vec<T>, limit: usize, marker_of: impl Fn(&T) -> String) -> Self {
        let next_marker = if items.len() > limit {
            let overflow = items.pop().expect("len > limit implies non-empty");
            Some(marker_of(&overflow))
        } else {
            None
        };

        Self { items, next_marker }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_population_has_no_next_marker() {
        let page = Page::from_fetch(vec!["a", "b"], 2, |s| s.to_string());
        assert_eq!(page.items, vec!["a", "b"]);
        assert_eq!(page.next_marker, None);
    }

    #[test]
    fn truncated_population_reports_marker() {
        let page = Page::from_fetch(vec!["a", "b", "c"], 2, |s| s.to_string());
        assert_eq!(page.items, vec!["a", "b"]);
        assert_eq!(page.next_marker, Some("c".to_string()));
    }
}
