//! Query builder for the list operation.
//!
//! Input is permissive: a parameter that is empty or does not parse is
//! treated as absent, a repeated parameter keeps its first value, and unknown
//! parameters are ignored, so a list request never fails on its query string.

use bookshelf_db::{BookFilter, Window};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

/// Raw query-string parameters of `GET /api/v1/books`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pub genre: Option<String>,
    pub author: Option<String>,
    pub min_rating: Option<String>,
    pub is_read: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ListParams {
    /// Collect the known parameters from decoded query pairs; first value wins.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "genre" => &mut params.genre,
                "author" => &mut params.author,
                "minRating" => &mut params.min_rating,
                "isRead" => &mut params.is_read,
                "page" => &mut params.page,
                "limit" => &mut params.limit,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        params
    }
}

/// Predicate, window, and the resolved page number for the pagination block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookQuery {
    pub filter: BookFilter,
    pub window: Window,
    pub page: u64,
}

pub fn build(params: &ListParams) -> BookQuery {
    let page = positive(params.page.as_deref()).unwrap_or(DEFAULT_PAGE);
    let limit = positive(params.limit.as_deref()).unwrap_or(DEFAULT_LIMIT);

    let filter = BookFilter {
        genre: present(params.genre.as_deref()).map(str::to_owned),
        author: present(params.author.as_deref()).map(str::to_owned),
        min_rating: present(params.min_rating.as_deref())
            .and_then(|raw| raw.trim().parse::<i64>().ok()),
        is_read: present(params.is_read.as_deref()).and_then(flag),
    };

    BookQuery {
        filter,
        window: Window::for_page(page, limit),
        page,
    }
}

fn present(raw: Option<&str>) -> Option<&str> {
    raw.filter(|value| !value.is_empty())
}

fn positive(raw: Option<&str>) -> Option<u64> {
    present(raw)
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
}

fn flag(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> ListParams {
        ListParams::from_pairs(
            pairs
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string())),
        )
    }

    #[test]
    fn defaults_without_parameters() {
        let query = build(&ListParams::default());
        assert_eq!(query.filter, BookFilter::default());
        assert_eq!(query.window, Window { limit: 10, offset: 0 });
        assert_eq!(query.page, 1);
    }

    #[test]
    fn every_criterion_is_combined() {
        let query = build(&params(&[
            ("genre", "Classic"),
            ("author", "lee"),
            ("minRating", "4"),
            ("isRead", "true"),
            ("page", "3"),
            ("limit", "5"),
        ]));

        assert_eq!(
            query.filter,
            BookFilter {
                genre: Some("Classic".into()),
                author: Some("lee".into()),
                min_rating: Some(4),
                is_read: Some(true),
            }
        );
        assert_eq!(query.window, Window { limit: 5, offset: 10 });
        assert_eq!(query.page, 3);
    }

    #[test]
    fn malformed_numbers_fall_back_or_are_omitted() {
        let query = build(&params(&[
            ("minRating", "four"),
            ("page", "two"),
            ("limit", "-5"),
        ]));

        assert_eq!(query.filter.min_rating, None);
        assert_eq!(query.page, DEFAULT_PAGE);
        assert_eq!(query.window.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn zero_page_and_limit_use_defaults() {
        let query = build(&params(&[("page", "0"), ("limit", "0")]));
        assert_eq!(query.window, Window { limit: 10, offset: 0 });
    }

    #[test]
    fn empty_values_are_absent() {
        let query = build(&params(&[("genre", ""), ("author", ""), ("isRead", "")]));
        assert_eq!(query.filter, BookFilter::default());
    }

    #[test]
    fn is_read_accepts_only_boolean_words() {
        assert_eq!(build(&params(&[("isRead", "FALSE")])).filter.is_read, Some(false));
        assert_eq!(build(&params(&[("isRead", "True")])).filter.is_read, Some(true));
        assert_eq!(build(&params(&[("isRead", "yes")])).filter.is_read, None);
    }

    #[test]
    fn repeated_parameters_keep_the_first_value() {
        let parsed = params(&[("genre", "Classic"), ("genre", "Sci-Fi"), ("page", "2"), ("page", "x")]);
        assert_eq!(parsed.genre.as_deref(), Some("Classic"));
        assert_eq!(build(&parsed).page, 2);
    }

    #[test]
    fn unknown_parameters_are_ignored() {
        let parsed = params(&[("sort", "title"), ("minRating", "3")]);
        assert_eq!(
            parsed,
            ListParams {
                min_rating: Some("3".into()),
                ..ListParams::default()
            }
        );
    }
}
