//! Deduplication index for one aggregation run
//!
//! Two flat sets built from the current item set: normalized links and
//! lowercased titles. An incoming item is rejected when either key is
//! already present. The index lives for a single run and is rebuilt from
//! the store every time so that inserts made by other processes are seen.

use std::collections::HashSet;

use crate::error::Result;
use crate::traits::ItemStore;

/// Canonical form of an item link
///
/// Surrounding whitespace, any `#fragment` and trailing slashes are removed.
pub fn normalize_link(link: &str) -> String {
    let trimmed = link.trim();
    let without_fragment = match trimmed.split_once('#') {
        Some((head, _)) => head,
        None => trimmed,
    };
    without_fragment.trim_end_matches('/').to_string()
}

/// Canonical form of an item title
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Outcome of offering an item to the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Both keys are new
    Admitted,
    /// Another item already owns the link
    DuplicateLink,
    /// Another item already owns the title
    DuplicateTitle,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeduplicationIndex {
    links: HashSet<String>,
    titles: HashSet<String>,
}

impl DeduplicationIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw link and title listings, normalizing both
    pub fn from_keys<L, T>(links: L, titles: T) -> Self
    where
        L: IntoIterator,
        L::Item: AsRef<str>,
        T: IntoIterator,
        T::Item: AsRef<str>,
    {
        Self {
            links: links.into_iter().map(|l| normalize_link(l.as_ref())).collect(),
            titles: titles
                .into_iter()
                .map(|t| normalize_title(t.as_ref()))
                .collect(),
        }
    }

    /// Build from the complete current item set
    pub async fn build(store: &dyn ItemStore) -> Result<Self> {
        let links = store.find_all_links().await?;
        let titles = store.find_all_lowercase_titles().await?;
        Ok(Self::from_keys(links, titles))
    }

    pub fn contains_link(&self, link: &str) -> bool {
        self.links.contains(&normalize_link(link))
    }

    pub fn contains_title(&self, title: &str) -> bool {
        self.titles.contains(&normalize_title(title))
    }

    /// Record an inserted item so later candidates collide with it
    pub fn record(&mut self, link: &str, title: &str) {
        self.links.insert(normalize_link(link));
        self.titles.insert(normalize_title(title));
    }

    /// Check both keys without recording anything
    ///
    /// The link is checked first, so an item colliding on both keys is
    /// reported as [`Admission::DuplicateLink`]. Callers that persist the
    /// item should `record` it only once the write succeeded.
    pub fn check(&self, link: &str, title: &str) -> Admission {
        if self.contains_link(link) {
            Admission::DuplicateLink
        } else if self.contains_title(title) {
            Admission::DuplicateTitle
        } else {
            Admission::Admitted
        }
    }

    /// Check both keys and record the item when it is novel
    pub fn admit(&mut self, link: &str, title: &str) -> Admission {
        let admission = self.check(link, title);
        if admission.is_admitted() {
            self.record(link, title);
        }
        admission
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn title_count(&self) -> usize {
        self.titles.len()
    }
}
