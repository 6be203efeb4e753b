//! URL-backed list state: `page`, `limit`, `search`.
//!
//! The query string is the source of truth for the product list view. It
//! round-trips through these helpers so positions are shareable,
//! bookmarkable, and back-button safe; a hand-edited value is authoritative
//! on the next parse.

use url::form_urlencoded;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    pub search: String,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            search: String::new(),
        }
    }
}

impl ListQuery {
    /// Parse a query string (with or without a leading `?`). Missing,
    /// malformed, or out-of-range values fall back to their defaults.
    pub fn parse(query_string: &str) -> Self {
        let trimmed = query_string.trim_start_matches('?');
        let mut query = Self::default();

        for (key, value) in form_urlencoded::parse(trimmed.as_bytes()) {
            match key.as_ref() {
                "page" => {
                    if let Some(page) = parse_positive(&value) {
                        query.page = page;
                    }
                }
                "limit" => {
                    if let Some(limit) = parse_positive(&value) {
                        query.limit = limit;
                    }
                }
                "search" => query.search = value.into_owned(),
                _ => {}
            }
        }

        query
    }

    /// Serialize back to a query string. An empty search is omitted, the
    /// same way the view drops cleared parameters from the URL.
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.append_pair("page", &self.page.to_string());
        serializer.append_pair("limit", &self.limit.to_string());
        if !self.search.is_empty() {
            serializer.append_pair("search", &self.search);
        }
        serializer.finish()
    }

    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }

    /// A new page size invalidates the current position.
    pub fn with_limit(&self, limit: u32) -> Self {
        Self {
            page: 1,
            limit: limit.max(1),
            search: self.search.clone(),
        }
    }

    /// A new search invalidates the current position.
    pub fn with_search(&self, search: impl Into<String>) -> Self {
        Self {
            page: 1,
            limit: self.limit,
            search: search.into(),
        }
    }
}

fn parse_positive(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok().filter(|v| *v >= 1)
}

/// "Previous" is enabled on every page but the first.
pub fn has_prev(page: u32) -> bool {
    page > 1
}

/// "Next" is enabled while rows beyond the current window remain.
pub fn has_next(page: u32, limit: u32, total_count: i64) -> bool {
    (page as i64) * (limit as i64) < total_count
}

pub fn total_pages(total_count: i64, limit: u32) -> u32 {
    if total_count <= 0 {
        return 1;
    }
    ((total_count + limit as i64 - 1) / limit as i64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_query_string() {
        let query = ListQuery::parse("?page=3&limit=20&search=mug");
        assert_eq!(query.page, 3);
        assert_eq!(query.limit, 20);
        assert_eq!(query.search, "mug");
    }

    #[test]
    fn missing_and_malformed_values_fall_back_to_defaults() {
        assert_eq!(ListQuery::parse(""), ListQuery::default());

        let query = ListQuery::parse("page=zero&limit=-5&search=");
        assert_eq!(query.page, DEFAULT_PAGE);
        assert_eq!(query.limit, DEFAULT_LIMIT);
        assert_eq!(query.search, "");
    }

    #[test]
    fn zero_page_is_rejected() {
        assert_eq!(ListQuery::parse("page=0").page, DEFAULT_PAGE);
    }

    #[test]
    fn round_trips_through_query_string() {
        let query = ListQuery {
            page: 2,
            limit: 5,
            search: "coffee mug".into(),
        };
        assert_eq!(ListQuery::parse(&query.to_query_string()), query);
    }

    #[test]
    fn empty_search_is_omitted_from_query_string() {
        let qs = ListQuery::default().to_query_string();
        assert_eq!(qs, "page=1&limit=10");
    }

    #[test]
    fn search_change_resets_page() {
        let query = ListQuery {
            page: 4,
            limit: 20,
            search: "".into(),
        };
        let next = query.with_search("mug");
        assert_eq!(next.page, 1);
        assert_eq!(next.limit, 20);
    }

    #[test]
    fn limit_change_resets_page_but_keeps_search() {
        let query = ListQuery {
            page: 4,
            limit: 10,
            search: "mug".into(),
        };
        let next = query.with_limit(50);
        assert_eq!(next.page, 1);
        assert_eq!(next.limit, 50);
        assert_eq!(next.search, "mug");
    }

    #[test]
    fn page_change_touches_nothing_else() {
        let query = ListQuery {
            page: 1,
            limit: 20,
            search: "mug".into(),
        };
        let next = query.with_page(3);
        assert_eq!(next.limit, 20);
        assert_eq!(next.search, "mug");
    }

    #[test]
    fn boundaries_for_23_rows_at_page_size_10() {
        assert!(!has_prev(1));
        assert!(has_next(1, 10, 23));

        assert!(has_prev(3));
        assert!(!has_next(3, 10, 23));

        assert_eq!(total_pages(23, 10), 3);
    }

    #[test]
    fn boundaries_for_exact_multiple() {
        assert!(!has_next(2, 10, 20));
        assert_eq!(total_pages(20, 10), 2);
        assert_eq!(total_pages(0, 10), 1);
    }
}
