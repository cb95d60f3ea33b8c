//! Catalog metadata correction suggestions
//!
//! Suggestions are reported alongside the classification; nothing here
//! writes to the catalog.

use super::title_match::normalize_title;
use crate::models::{ExternalRecord, MediaItem, MetadataSuggestion, SuggestionAction};
use tracing::debug;

pub struct MetadataSuggester;

impl MetadataSuggester {
    /// Suggest the provider's title and/or year when they differ from the catalog
    pub fn suggest(item: &MediaItem, record: &ExternalRecord) -> Option<MetadataSuggestion> {
        let local_title = normalize_title(&item.title);
        let resolved_title = record.title.as_deref().map(normalize_title);

        let title_differs = match &resolved_title {
            Some(resolved) => {
                !local_title.is_empty() && !resolved.is_empty() && *resolved != local_title
            }
            None => false,
        };

        let year_differs = matches!((item.year, record.year), (Some(a), Some(b)) if a != b);

        let action = match (title_differs, year_differs) {
            (true, true) => SuggestionAction::FixTitleAndYear,
            (true, false) => SuggestionAction::FixTitle,
            (false, true) => SuggestionAction::FixYear,
            (false, false) => return None,
        };

        let suggestion = MetadataSuggestion {
            action,
            new_title: title_differs.then(|| record.title.clone()).flatten(),
            new_year: if year_differs { record.year } else { None },
        };

        debug!(
            item = %item.describe(),
            action = suggestion.action.as_str(),
            new_title = ?suggestion.new_title,
            new_year = ?suggestion.new_year,
            "Metadata suggestion"
        );

        Some(suggestion)
    }
}
