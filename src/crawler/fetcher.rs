//! Detail report fetcher
//!
//! This module handles the per-identifier detail requests, including:
//! - Building the shared HTTP client
//! - Rotating user-agent headers across requests
//! - Classifying transport and parse failures so one bad identifier
//!   never aborts the run

use crate::crawler::parser::{parse_detail, DetailRecord, ParseError};
use crate::storage::{RecordStore, StorageError};
use reqwest::header::USER_AGENT;
use reqwest::Client;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Per-identifier fetch failures
///
/// All variants are caught and counted at the coordinator; none of them
/// aborts a run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Parse failure: {0}")]
    Parse(#[from] ParseError),

    #[error("Store failure: {0}")]
    Store(#[from] StorageError),
}

/// User-agent strings rotated when no custom pool is configured
const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

/// Round-robin pool of user-agent strings
///
/// The detail endpoint is friendlier to requests that look like ordinary
/// browser traffic, so each request draws the next agent from the pool.
pub struct UserAgentPool {
    agents: Vec<String>,
    next: AtomicUsize,
}

impl UserAgentPool {
    /// Creates a pool from the configured agents, falling back to the
    /// built-in list when none are configured
    pub fn new(configured: &[String]) -> Self {
        let agents = if configured.is_empty() {
            DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect()
        } else {
            configured.to_vec()
        };

        Self {
            agents,
            next: AtomicUsize::new(0),
        }
    }

    /// Returns the next user-agent string in rotation
    pub fn next_agent(&self) -> &str {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.agents.len();
        &self.agents[index]
    }
}

/// Builds the HTTP client shared by the cursor and all fetch workers
///
/// No default user-agent is set here; the pool supplies one per request.
pub fn build_http_client(timeout_secs: u64) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches and parses the detail report for one identifier
///
/// Builds `<detail_url>?apk_md5=<identifier>`, POSTs an empty body, and
/// feeds the response to the detail parser. A non-success status or a
/// connection error becomes [`FetchError::Transport`]; a body the parser
/// rejects becomes [`FetchError::Parse`]. No retries happen here; one
/// attempt per identifier is authoritative.
pub async fn fetch_one(
    client: &Client,
    detail_url: &str,
    user_agent: &str,
    identifier: &str,
) -> Result<DetailRecord, FetchError> {
    let url = format!("{}?apk_md5={}", detail_url, identifier);

    let response = client
        .post(&url)
        .header(USER_AGENT, user_agent)
        .body("")
        .send()
        .await
        .map_err(|e| FetchError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Transport(format!(
            "HTTP {} from {}",
            status, url
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| FetchError::Transport(e.to_string()))?;

    let record = parse_detail(&body)?;
    Ok(record)
}

/// Fetches one identifier and upserts the resulting record
///
/// Exactly one store write happens on success, none on failure. The store
/// mutex serializes concurrent upserts from the worker pool.
pub async fn fetch_and_store<S: RecordStore>(
    client: &Client,
    detail_url: &str,
    user_agent: &str,
    identifier: &str,
    store: &Arc<Mutex<S>>,
) -> Result<(), FetchError> {
    let record = fetch_one(client, detail_url, user_agent, identifier).await?;

    tracing::debug!("Fetched detail for {}: {}", identifier, record.name);

    let mut store = store.lock().expect("record store mutex poisoned");
    store.upsert_record(&record)?;

    Ok(())
}
