//! Shared record model, error type, and configuration for bibresolve.
//!
//! This crate is the foundation depended on by all other bibresolve crates.
//! It provides:
//! - [`BibError`]: the unified error type
//! - The canonical [`Record`] model and its validation
//! - [`isbn`] normalization helpers
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod isbn;
pub mod types;
pub mod validate;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CompletionConfig, EndpointsConfig, HttpConfig, ResolverConfig, completion_api_key,
    config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{BibError, Result};
pub use types::{
    Annotation, Attempt, AttemptTrace, Author, Record, RecordType, generate_id, parse_authors,
    slugify, year_from_date,
};
pub use validate::{MIN_YEAR, max_year, today};
