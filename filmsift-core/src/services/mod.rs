//! Enrichment and classification services
//!
//! - `enrichment`: cache-first resolution of items to provider records
//! - `scoring`: ordered rule table producing decisions
//! - `misidentification`: advisory mismatch heuristics
//! - `metadata_suggester`: advisory title/year corrections
//! - `sorter`: presentation order
//! - `pipeline`: end-to-end orchestration over an item feed

pub mod enrichment;
pub mod metadata_suggester;
pub mod misidentification;
pub mod pipeline;
pub mod scoring;
pub mod sorter;
pub mod title_match;

pub use enrichment::{EnrichmentService, EnrichmentSettings, LookupOutcome};
pub use metadata_suggester::MetadataSuggester;
pub use misidentification::{DetectionInputs, MisidentificationDetector};
pub use pipeline::ClassificationPipeline;
pub use scoring::{bayes_score, ScoringEngine};
pub use sorter::ResultSorter;
