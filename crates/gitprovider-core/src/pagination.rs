//! Exhaustive page walking for list operations.
//!
//! A list call returns only after every page has been fetched. The first
//! failing page aborts the walk and its error is returned as-is; no partial
//! result is ever handed back.

use std::collections::HashSet;
use std::future::Future;

use tracing::debug;

use crate::error::{Error, Result};

/// One page of results plus the cursor of the next page, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Opaque continuation (next URL, page number, token)
    pub next: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next: Option<String>) -> Self {
        Self { items, next }
    }

    /// A page with nothing after it.
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Fetch pages starting from `None` until one has no `next` cursor.
///
/// A cursor seen twice means the backend is looping, which is reported as
/// [`Error::InvalidServerData`].
pub async fn collect_all<T, F, Fut>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = fetch(cursor.take()).await?;
        pages += 1;
        items.extend(page.items);

        match page.next {
            Some(next) => {
                if !seen.insert(next.clone()) {
                    return Err(Error::InvalidServerData(format!(
                        "pagination cursor {} repeated",
                        next
                    )));
                }
                cursor = Some(next);
            }
            None => break,
        }
    }

    debug!(pages = pages, items = items.len(), "Pagination complete");
    Ok(items)
}

/// The `rel="next"` target of an RFC 8288 `Link` header.
pub fn next_link_from_header(link: &str) -> Option<String> {
    link.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|param| {
            let param = param.trim();
            param == "rel=\"next\"" || param == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

/// The value of an `X-Next-Page` style header; blank means no next page.
pub fn next_page_from_header(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collect_all_single_page() {
        let items = collect_all(|cursor| async move {
            assert!(cursor.is_none());
            Ok(Page::last(vec![1, 2, 3]))
        })
        .await
        .unwrap();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_collect_all_stops_on_first_error() {
        let mut calls = 0;
        let result: Result<Vec<u32>> = collect_all(|cursor| {
            calls += 1;
            async move {
                match cursor.as_deref() {
                    None => Ok(Page::new(vec![1], Some("2".to_string()))),
                    Some("2") => Err(Error::from_status(500, "boom")),
                    Some(other) => panic!("unexpected cursor {other}"),
                }
            }
        })
        .await;

        assert!(matches!(result, Err(Error::Http(_))));
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_collect_all_detects_cursor_loop() {
        let result: Result<Vec<u32>> =
            collect_all(|_| async { Ok(Page::new(vec![1], Some("same".to_string()))) }).await;
        assert!(matches!(result, Err(Error::InvalidServerData(_))));
    }

    #[test]
    fn test_next_link_from_header() {
        let header = "<https://api.github.com/user/repos?page=3&per_page=100>; rel=\"next\", \
                      <https://api.github.com/user/repos?page=50&per_page=100>; rel=\"last\"";
        assert_eq!(
            next_link_from_header(header).as_deref(),
            Some("https://api.github.com/user/repos?page=3&per_page=100")
        );

        let last_page = "<https://api.github.com/user/repos?page=1>; rel=\"first\", \
                         <https://api.github.com/user/repos?page=2>; rel=\"prev\"";
        assert!(next_link_from_header(last_page).is_none());
        assert!(next_link_from_header("").is_none());
    }

    #[test]
    fn test_next_page_from_header() {
        assert_eq!(next_page_from_header("4").as_deref(), Some("4"));
        assert!(next_page_from_header("").is_none());
        assert!(next_page_from_header("  ").is_none());
    }
}
