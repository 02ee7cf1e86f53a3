//! Crawler module for detail fetching and crawl coordination
//!
//! This module contains the core crawling logic, including:
//! - Detail report fetching with per-request user-agent rotation
//! - Detail JSON parsing into normalized records
//! - Batch dispatch with bounded concurrency
//! - Overall crawl coordination and the run summary

mod coordinator;
mod fetcher;
mod parser;

pub use coordinator::{run_crawl, Coordinator, CrawlSummary};
pub use fetcher::{build_http_client, fetch_and_store, fetch_one, FetchError, UserAgentPool};
pub use parser::{parse_detail, DetailRecord, ParseError};
