//! # filmsift Common Library
//!
//! Shared code for the filmsift crates:
//! - Error types
//! - Configuration loading (TOML bootstrap, env overrides, compiled defaults)
//! - Scoring, provider and misidentification threshold types

pub mod config;
pub mod error;

pub use error::{Error, Result};
