//! Pagination cursor over the remote listing endpoint
//!
//! The listing endpoint speaks the DataTables server-side protocol: a POST
//! with offset/length form fields, answered by a JSON object whose `aaData`
//! field is an array of rows, each row an array of positional cells. Cell
//! positions we rely on: `[1]` is the identifier, `[len-2]` is the status
//! tag.

use crate::catalog::{CatalogError, CatalogResult};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

/// One row from a listing page, after positional extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateEntry {
    /// Unique identifier of the remote sample (a content hash)
    pub identifier: String,

    /// Detection status tag from the source table
    pub status: String,
}

/// Pagination state, advanced monotonically after each consumed page
///
/// The offset moves forward by the configured page size after every
/// non-empty page, even when the page came back short. Exhaustion is
/// signalled by an empty page, not by a short one. The page size itself
/// stays fixed for the lifetime of the cursor.
#[derive(Debug, Clone, Copy)]
pub struct PageCursorState {
    /// Row offset of the next page to request
    pub offset: u32,

    /// Number of rows requested per page
    pub page_size: u32,

    /// Number of pages fetched so far
    pub pages_fetched: u32,
}

/// Shape of the listing endpoint's JSON response
#[derive(Debug, Deserialize)]
struct ListingResponse {
    #[serde(rename = "aaData")]
    rows: Vec<Vec<Value>>,
}

/// Stateful generator of successive listing pages
///
/// Holds no state beyond its [`PageCursorState`]; restarting a crawl means
/// constructing a fresh cursor.
pub struct CatalogCursor {
    client: Client,
    listing_url: String,
    ineligible_status: String,
    state: PageCursorState,
    exhausted: bool,
}

impl CatalogCursor {
    /// Creates a cursor positioned at the start of the catalog
    pub fn new(
        client: Client,
        listing_url: String,
        page_size: u32,
        ineligible_status: String,
    ) -> Self {
        Self {
            client,
            listing_url,
            ineligible_status,
            state: PageCursorState {
                offset: 0,
                page_size,
                pages_fetched: 0,
            },
            exhausted: false,
        }
    }

    /// Current pagination state (offset, page size, pages fetched)
    pub fn state(&self) -> PageCursorState {
        self.state
    }

    /// Fetches the next page of candidate entries
    ///
    /// Returns `Ok(None)` once the catalog is exhausted, i.e. the most
    /// recently fetched page contained zero rows before filtering. Entries
    /// whose status tag equals the ineligible sentinel are dropped before
    /// being yielded; a page whose rows are all filtered out still yields
    /// `Ok(Some(vec![]))` so the caller keeps paginating.
    ///
    /// # Errors
    ///
    /// A transport failure or a response that does not match the expected
    /// listing shape returns a [`CatalogError`]. These are never retried
    /// here; the caller is expected to abort the run.
    pub async fn next_page(&mut self) -> CatalogResult<Option<Vec<CandidateEntry>>> {
        if self.exhausted {
            return Ok(None);
        }

        let payload = listing_payload(self.state.offset, self.state.page_size);
        let response = self
            .client
            .post(&self.listing_url)
            .form(&payload)
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        let listing: ListingResponse = serde_json::from_str(&body)
            .map_err(|e| CatalogError::MalformedListing(e.to_string()))?;

        tracing::debug!(
            "Listing page {} (offset {}): {} rows",
            self.state.pages_fetched,
            self.state.offset,
            listing.rows.len()
        );

        if listing.rows.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }

        let entries = entries_from_rows(&listing.rows)?;
        let total = entries.len();
        let eligible: Vec<CandidateEntry> = entries
            .into_iter()
            .filter(|entry| entry.status != self.ineligible_status)
            .collect();

        if eligible.len() < total {
            tracing::debug!(
                "Filtered {} ineligible entries from page {}",
                total - eligible.len(),
                self.state.pages_fetched
            );
        }

        // Offset advances by the full page size even on a short page.
        self.state.offset += self.state.page_size;
        self.state.pages_fetched += 1;

        Ok(Some(eligible))
    }
}

/// Builds the DataTables-style form payload for one listing request
fn listing_payload(offset: u32, page_size: u32) -> Vec<(&'static str, String)> {
    let mut payload = vec![
        ("sEcho", "1".to_string()),
        ("iColumns", "5".to_string()),
        ("sColumns", String::new()),
        ("iDisplayStart", offset.to_string()),
        ("iDisplayLength", page_size.to_string()),
    ];
    for i in 0..5 {
        payload.push((data_prop_name(i), i.to_string()));
    }
    payload.push(("iSortCol_0", "0".to_string()));
    payload.push(("sSortDir_0", "asc".to_string()));
    payload.push(("iSortingCols", "1".to_string()));
    for i in 0..5 {
        payload.push((sortable_name(i), "true".to_string()));
    }
    payload.push(("is_search", "false".to_string()));
    payload
}

fn data_prop_name(index: u32) -> &'static str {
    match index {
        0 => "mDataProp_0",
        1 => "mDataProp_1",
        2 => "mDataProp_2",
        3 => "mDataProp_3",
        _ => "mDataProp_4",
    }
}

fn sortable_name(index: u32) -> &'static str {
    match index {
        0 => "bSortable_0",
        1 => "bSortable_1",
        2 => "bSortable_2",
        3 => "bSortable_3",
        _ => "bSortable_4",
    }
}

/// Extracts candidate entries from raw listing rows
///
/// Rows must be long enough to carry both the identifier cell and the
/// status cell, and both cells must be strings. Anything else means the
/// table shape has changed under us and the whole listing is untrusted.
fn entries_from_rows(rows: &[Vec<Value>]) -> CatalogResult<Vec<CandidateEntry>> {
    rows.iter()
        .map(|row| {
            if row.len() < 4 {
                return Err(CatalogError::MalformedListing(format!(
                    "listing row has {} cells, expected at least 4",
                    row.len()
                )));
            }

            let identifier = string_cell(&row[1], "identifier")?;
            let status = string_cell(&row[row.len() - 2], "status")?;

            Ok(CandidateEntry { identifier, status })
        })
        .collect()
}

fn string_cell(value: &Value, what: &str) -> CatalogResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(CatalogError::MalformedListing(format!(
            "listing {} cell is not a string: {}",
            what, other
        ))),
    }
}
