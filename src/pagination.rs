//! Link-header pagination for GitHub list endpoints
//!
//! [`Pages`] yields one page at a time by following `rel="next"` links. It
//! stops after a fixed number of pages or when a link points back to a page
//! already visited.

use reqwest::header::LINK;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::marker::PhantomData;
use tracing::{debug, warn};

use crate::error::Result;
use crate::session::{decode_json, ensure_success, GitHubSession};

pub const DEFAULT_MAX_PAGES: usize = 1000;

/// Bounded producer over the pages of a list endpoint
pub struct Pages<'a, T> {
    session: &'a GitHubSession,
    next: Option<String>,
    visited: HashSet<String>,
    max_pages: usize,
    _item: PhantomData<T>,
}

impl<'a, T: DeserializeOwned> Pages<'a, T> {
    pub fn new(session: &'a GitHubSession, first_url: String, max_pages: usize) -> Self {
        Self {
            session,
            next: Some(first_url),
            visited: HashSet::new(),
            max_pages,
            _item: PhantomData,
        }
    }

    /// Fetch the next page, or `None` once the listing is exhausted
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>> {
        let Some(url) = self.next.take() else {
            return Ok(None);
        };

        if self.visited.len() >= self.max_pages {
            warn!(
                url = %url,
                max_pages = self.max_pages,
                "Reached maximum pagination limit, stopping"
            );
            return Ok(None);
        }
        if !self.visited.insert(url.clone()) {
            warn!(url = %url, "Pagination link points to a page already fetched, stopping");
            return Ok(None);
        }

        debug!(url = %url, page = self.visited.len(), "Fetching page");
        let response = ensure_success("GET", self.session.get(&url).await?).await?;

        self.next = response
            .headers()
            .get_all(LINK)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(next_link);

        let items: Vec<T> = decode_json("GET", response).await?;
        Ok(Some(items))
    }

    /// Drain every remaining page into one vector
    pub async fn collect_all(mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await? {
            items.extend(page);
        }
        Ok(items)
    }
}

/// Extract the `rel="next"` target from a Link header value
pub fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut sections = part.split(';');
        let target = sections.next()?.trim();
        let url = target.strip_prefix('<')?.strip_suffix('>')?;

        let is_next = sections.any(|param| {
            let param = param.trim();
            match param.split_once('=') {
                Some((key, value)) => {
                    key.trim().eq_ignore_ascii_case("rel")
                        && value
                            .trim()
                            .trim_matches('"')
                            .split_whitespace()
                            .any(|rel| rel == "next")
                }
                None => false,
            }
        });

        is_next.then(|| url.to_string())
    })
}
