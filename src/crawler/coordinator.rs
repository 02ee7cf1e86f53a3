//! Crawl coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Pulling candidate pages from the catalog cursor
//! - Dispatching detail fetches with bounded concurrency
//! - Aggregating per-batch results into the run summary
//! - Applying the stopping condition
//! - Recording the run outcome in storage
//!
//! The run moves through three phases: running (pages are pulled and
//! batches dispatched), stopping (the target was reached or the catalog
//! is exhausted; the in-flight batch drains but no new one starts), and
//! stopped (the final summary is recorded and returned). Batches are not
//! pipelined across pages: the whole batch settles before the next page
//! is requested, which bounds memory and keeps failure accounting
//! per-page.

use crate::catalog::{CandidateEntry, CatalogCursor};
use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, fetch_and_store, UserAgentPool};
use crate::storage::{RecordStore, SqliteStore};
use crate::ScoutError;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Aggregate counts for one crawl run
///
/// Mutated only by the coordinator between batches; workers never see it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Identifiers for which a fetch was dispatched
    pub attempted: u64,

    /// Records successfully parsed and upserted
    pub stored: u64,

    /// Identifiers whose fetch, parse, or upsert failed
    pub failed: u64,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    client: Client,
    store: Arc<Mutex<SqliteStore>>,
    agents: Arc<UserAgentPool>,
    run_id: i64,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Opens (or creates) the record store and registers a new run.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `config_hash` - Hash of the configuration file, recorded with the run
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(ScoutError)` - Failed to initialize
    pub fn new(config: Config, config_hash: &str) -> Result<Self, ScoutError> {
        let mut store = SqliteStore::new(Path::new(&config.storage.database_path))?;
        let run_id = store.create_run(config_hash)?;

        let client = build_http_client(config.crawler.request_timeout_secs)?;
        let agents = Arc::new(UserAgentPool::new(&config.crawler.user_agents));

        Ok(Self {
            config,
            client,
            store: Arc::new(Mutex::new(store)),
            agents,
            run_id,
        })
    }

    /// Runs the main crawl loop and returns the final summary
    ///
    /// Per iteration: pull one page of candidates from the cursor, fan out
    /// one fetch worker per identifier bounded by the configured
    /// concurrency, wait for the whole batch to settle, then fold the
    /// results into the summary. The loop ends when the stored count
    /// reaches the configured target or the catalog is exhausted. An
    /// already-dispatched batch always drains, so the stored count may
    /// overshoot the target by at most one page.
    ///
    /// Per-identifier failures are counted, never propagated. A catalog
    /// failure aborts the run: once the listing shape cannot be trusted,
    /// continuing to paginate would fetch garbage.
    pub async fn run(&mut self) -> Result<CrawlSummary, ScoutError> {
        tracing::info!("Starting crawl run {}", self.run_id);
        let start_time = std::time::Instant::now();

        let mut cursor = CatalogCursor::new(
            self.client.clone(),
            self.config.catalog.listing_url.clone(),
            self.config.catalog.page_size,
            self.config.catalog.ineligible_status.clone(),
        );

        let mut summary = CrawlSummary::default();

        loop {
            if self.target_reached(&summary) {
                tracing::info!(
                    "Target of {} stored records reached, stopping",
                    self.config.crawler.target_records.unwrap_or_default()
                );
                break;
            }

            let page = match cursor.next_page().await {
                Ok(Some(page)) => page,
                Ok(None) => {
                    tracing::info!("Catalog exhausted, stopping");
                    break;
                }
                Err(e) => {
                    tracing::error!("Catalog failure, aborting run: {}", e);
                    let mut store = self.store.lock().expect("record store mutex poisoned");
                    store.fail_run(self.run_id, &summary)?;
                    return Err(e.into());
                }
            };

            if page.is_empty() {
                // Every row on this page was ineligible; keep paginating.
                continue;
            }

            let batch_size = page.len() as u64;
            let succeeded = self.dispatch_batch(&page).await;

            summary.attempted += batch_size;
            summary.stored += succeeded;
            summary.failed += batch_size - succeeded;

            tracing::info!(
                "Batch complete: {} attempted, {} stored, {} failed (run totals: {}/{}/{})",
                batch_size,
                succeeded,
                batch_size - succeeded,
                summary.attempted,
                summary.stored,
                summary.failed
            );
        }

        {
            let mut store = self.store.lock().expect("record store mutex poisoned");
            store.complete_run(self.run_id, &summary)?;
        }

        tracing::info!(
            "Crawl run {} finished in {:?}: {} attempted, {} stored, {} failed",
            self.run_id,
            start_time.elapsed(),
            summary.attempted,
            summary.stored,
            summary.failed
        );

        Ok(summary)
    }

    /// Dispatches fetch workers for one page of candidates and waits for
    /// the whole batch to settle
    ///
    /// Returns the number of identifiers that were fetched, parsed, and
    /// upserted successfully. Concurrency is bounded by the configured
    /// maximum; completion order within the batch is arbitrary.
    async fn dispatch_batch(&self, page: &[CandidateEntry]) -> u64 {
        let max_concurrency = self.config.crawler.max_concurrency as usize;
        let detail_url = &self.config.catalog.detail_url;

        let outcomes: Vec<bool> = stream::iter(page.iter().map(|entry| {
            let client = self.client.clone();
            let store = Arc::clone(&self.store);
            let agents = Arc::clone(&self.agents);
            let identifier = entry.identifier.clone();

            async move {
                let user_agent = agents.next_agent().to_string();
                match fetch_and_store(&client, detail_url, &user_agent, &identifier, &store).await
                {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!("Detail fetch failed for {}: {}", identifier, e);
                        false
                    }
                }
            }
        }))
        .buffer_unordered(max_concurrency)
        .collect()
        .await;

        outcomes.into_iter().filter(|ok| *ok).count() as u64
    }

    fn target_reached(&self, summary: &CrawlSummary) -> bool {
        match self.config.crawler.target_records {
            Some(target) => summary.stored >= target,
            None => false,
        }
    }
}

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the record store and register a run
/// 2. Build the HTTP client
/// 3. Walk the catalog page by page, fetching details with bounded
///    concurrency
/// 4. Record the run outcome and return the summary
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash of the configuration file
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Final counts for the run
/// * `Err(ScoutError)` - Initialization or catalog failure
pub async fn run_crawl(config: Config, config_hash: &str) -> Result<CrawlSummary, ScoutError> {
    let mut coordinator = Coordinator::new(config, config_hash)?;
    coordinator.run().await
}
