//! Catalog module for paginated identifier discovery
//!
//! This module walks the remote listing endpoint page by page, turning
//! table rows into candidate identifiers and filtering out entries that
//! are not eligible for a detail fetch.

mod cursor;

pub use cursor::{CandidateEntry, CatalogCursor, PageCursorState};

use thiserror::Error;

/// Errors raised while paginating the remote catalog
///
/// Any of these is fatal to a crawl run: once the listing endpoint
/// misbehaves, the set of identifiers can no longer be trusted.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Listing request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed listing response: {0}")]
    MalformedListing(String),
}

/// Result type alias for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;
