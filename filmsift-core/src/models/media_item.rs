//! Catalog input: media items and the identifier shapes catalogs hand us

use serde::{Deserialize, Serialize};

/// One item from the catalog feed
///
/// Immutable input to the core; the catalog connector owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Title as recorded in the catalog
    pub title: String,

    /// Release year, if the catalog knows it
    #[serde(default)]
    pub year: Option<i32>,

    /// Library (section) name
    #[serde(default)]
    pub library: String,

    /// Path of the media file
    #[serde(default)]
    pub file_path: String,

    /// File size in bytes
    #[serde(default)]
    pub file_size: Option<u64>,

    /// Wherever the catalog keeps the provider id
    #[serde(default)]
    pub identifier: IdentifierSource,

    /// Rating recorded locally by the catalog (user rating preferred)
    #[serde(default)]
    pub local_rating: Option<f64>,
}

impl MediaItem {
    /// Provider id for this item, if any identifier shape yields one
    pub fn external_id(&self) -> Option<String> {
        self.identifier.external_id()
    }

    /// Short description for log lines: `Library / Title (Year)`
    pub fn describe(&self) -> String {
        let year = self
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "?".to_string());
        if self.library.is_empty() {
            format!("{} ({})", self.title, year)
        } else {
            format!("{} / {} ({})", self.library, self.title, year)
        }
    }
}

/// A guid object as found in catalog guid lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GuidRef {
    #[serde(default)]
    pub id: Option<String>,
}

/// Known shapes in which catalogs carry the provider id
///
/// Extraction is total: unexpected or malformed shapes yield `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdentifierSource {
    /// Id stored directly on the item (`tt0111161`)
    Direct { id: String },

    /// Single agent guid URI (`com.plexapp.agents.imdb://tt0111161?lang=en`)
    Guid { guid: String },

    /// List of guid objects, with the item's primary guid as fallback
    GuidList {
        guids: Vec<GuidRef>,
        #[serde(default)]
        fallback: Option<String>,
    },

    /// Catalog has no identifier for the item
    #[default]
    Absent,
}

impl IdentifierSource {
    /// Extract the provider id, never failing on unexpected shapes
    pub fn external_id(&self) -> Option<String> {
        match self {
            IdentifierSource::Direct { id } => parse_identifier(id),
            IdentifierSource::Guid { guid } => parse_identifier(guid),
            IdentifierSource::GuidList { guids, fallback } => guids
                .iter()
                .filter_map(|g| g.id.as_deref())
                .find_map(parse_identifier)
                .or_else(|| fallback.as_deref().and_then(parse_identifier)),
            IdentifierSource::Absent => None,
        }
    }
}

/// Accepts either a bare id or a guid URI carrying `imdb://<id>`
fn parse_identifier(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let candidate = match raw.split_once("imdb://") {
        Some((_, after)) => after.split(['?', '/']).next().unwrap_or(""),
        None if raw.contains("://") => return None,
        None => raw,
    };

    let candidate = candidate.trim().to_ascii_lowercase();
    is_imdb_id(&candidate).then_some(candidate)
}

/// `tt` followed by at least one digit and nothing else
pub fn is_imdb_id(value: &str) -> bool {
    value
        .strip_prefix("tt")
        .map(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}
