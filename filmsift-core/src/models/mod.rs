//! Data models for filmsift
//!
//! - `MediaItem`: catalog input (immutable)
//! - `ExternalRecord`: normalized provider data
//! - `ScoreResult` / `ClassificationRow`: classification output

pub mod classification;
pub mod external_record;
pub mod media_item;

pub use classification::{
    ClassificationRow, Decision, MetadataSuggestion, MisidentificationHint, RuleTag, ScoreInputs,
    ScoreResult, SuggestionAction,
};
pub use external_record::ExternalRecord;
pub use media_item::{is_imdb_id, GuidRef, IdentifierSource, MediaItem};
