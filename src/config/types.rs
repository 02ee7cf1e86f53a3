use serde::Deserialize;

/// Main configuration structure for ApkScout
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub crawler: CrawlerConfig,
    pub storage: StorageConfig,
}

/// Remote catalog endpoints and pagination behavior
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// URL of the paginated listing endpoint
    #[serde(rename = "listing-url")]
    pub listing_url: String,

    /// Base URL of the per-identifier detail endpoint
    #[serde(rename = "detail-url")]
    pub detail_url: String,

    /// Number of rows requested per listing page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// Status tag marking listing rows that must not be fetched
    #[serde(rename = "ineligible-status", default = "default_ineligible_status")]
    pub ineligible_status: String,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of detail fetches in flight at once
    #[serde(rename = "max-concurrency", default = "default_max_concurrency")]
    pub max_concurrency: u32,

    /// Stop once this many records are stored; absent means run to exhaustion
    #[serde(rename = "target-records", default)]
    pub target_records: Option<u64>,

    /// Per-request timeout in seconds
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// User-agent strings rotated across detail requests; empty uses a built-in pool
    #[serde(rename = "user-agents", default)]
    pub user_agents: Vec<String>,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

fn default_page_size() -> u32 {
    100
}

fn default_ineligible_status() -> String {
    "UnDetected".to_string()
}

fn default_max_concurrency() -> u32 {
    8
}

fn default_request_timeout_secs() -> u64 {
    30
}
