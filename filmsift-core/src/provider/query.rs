//! Provider query shapes

use crate::cache::CacheKey;
use std::fmt;

/// One provider request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderQuery {
    /// `i=<id>`
    ById { id: String },
    /// `t=<title>[&y=<year>]`
    ByTitle { title: String, year: Option<i32> },
    /// `s=<title>` free-text search
    Search { title: String },
}

impl ProviderQuery {
    /// Query string parameters, excluding the API key
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = match self {
            ProviderQuery::ById { id } => vec![("i", id.clone()), ("plot", "short".to_string())],
            ProviderQuery::ByTitle { title, year } => {
                let mut p = vec![("t", title.clone()), ("plot", "short".to_string())];
                if let Some(year) = year {
                    p.push(("y", year.to_string()));
                }
                p
            }
            ProviderQuery::Search { title } => vec![("s", title.clone())],
        };
        params.push(("type", "movie".to_string()));
        params
    }

    pub fn cache_key(&self) -> CacheKey {
        match self {
            ProviderQuery::ById { id } => CacheKey::for_id(id),
            ProviderQuery::ByTitle { title, year } => CacheKey::for_title(title, *year),
            ProviderQuery::Search { title } => CacheKey::for_search(title),
        }
    }

    pub fn is_search(&self) -> bool {
        matches!(self, ProviderQuery::Search { .. })
    }
}

impl fmt::Display for ProviderQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderQuery::ById { id } => write!(f, "id {}", id),
            ProviderQuery::ByTitle {
                title,
                year: Some(y),
            } => write!(f, "title '{}' ({})", title, y),
            ProviderQuery::ByTitle { title, year: None } => write!(f, "title '{}'", title),
            ProviderQuery::Search { title } => write!(f, "search '{}'", title),
        }
    }
}
