//! Spec ingestion: fetching and parsing OpenAPI documents and resolving
//! catalog entries into documents.

pub mod catalog;
pub mod loader;

pub use catalog::{CatalogEnricher, EnrichedEntry, catalog_spec_url};
pub use loader::{CompositeSpecLoader, HttpSpecLoader, SpecLoader, SpecSource, parse_spec_text};
