//! Search configuration and cache keys.
//!
//! A search is described by an optional filter plus a [`QueryConfig`]. The pair
//! forms a [`QueryKey`], which is what the query cache is keyed on. Keys compare
//! exactly: two filters that select the same entries but differ textually are
//! different keys.

pub mod filter;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default page size for paged searches.
pub const PAGE_SIZE: u32 = 1000;

/// Maximum number of values returned for one multi-valued attribute per request.
pub const MAX_NUM_MULTIVALUE_ATTRIBUTES: u32 = 1500;

/// How far below the base DN a search reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SearchScope {
    /// The base entry only.
    Base,
    /// Immediate children of the base entry.
    OneLevel,
    /// The base entry and all descendants.
    #[default]
    Subtree,
}

/// Parameters of a search other than the filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryConfig {
    pub base_dn: String,
    pub scope: SearchScope,
    /// Attributes to return; empty means all.
    pub attributes: Vec<String>,
    pub page_size: u32,
}

impl QueryConfig {
    /// Subtree search of everything under `base_dn`.
    pub fn new(base_dn: impl Into<String>) -> Self {
        Self {
            base_dn: base_dn.into(),
            scope: SearchScope::Subtree,
            attributes: Vec::new(),
            page_size: PAGE_SIZE,
        }
    }

    pub fn with_scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

/// Cache key: the exact filter text and every field of the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    filter: Option<String>,
    config: QueryConfig,
}

impl QueryKey {
    /// `None` as the filter means "every entry under the base DN".
    pub fn new(filter: Option<&str>, config: &QueryConfig) -> Self {
        Self {
            filter: filter.map(str::to_string),
            config: config.clone(),
        }
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} ({:?})",
            self.filter.as_deref().unwrap_or("<all>"),
            self.config.base_dn,
            self.config.scope
        )
    }
}
