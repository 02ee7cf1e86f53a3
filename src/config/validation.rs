use crate::config::types::{CatalogConfig, Config, CrawlerConfig, StorageConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_catalog_config(&config.catalog)?;
    validate_crawler_config(&config.crawler)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates catalog endpoint configuration
fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    validate_endpoint_url("listing-url", &config.listing_url)?;
    validate_endpoint_url("detail-url", &config.detail_url)?;

    if config.page_size < 1 {
        return Err(ConfigError::Validation(format!(
            "page-size must be >= 1, got {}",
            config.page_size
        )));
    }

    if config.ineligible_status.is_empty() {
        return Err(ConfigError::Validation(
            "ineligible-status cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrency < 1 || config.max_concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrency must be between 1 and 100, got {}",
            config.max_concurrency
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if let Some(target) = config.target_records {
        if target == 0 {
            return Err(ConfigError::Validation(
                "target-records must be >= 1 when set; omit it to crawl to exhaustion".to_string(),
            ));
        }
    }

    if config.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user-agents entries cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that an endpoint URL parses and uses an http(s) scheme
fn validate_endpoint_url(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!(
            "{} cannot be empty",
            field
        )));
    }

    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", field, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} must use an http or https scheme, got '{}'",
            field,
            url.scheme()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            catalog: CatalogConfig {
                listing_url: "http://catalog.example.com/apk_table_info".to_string(),
                detail_url: "http://catalog.example.com/detail_report".to_string(),
                page_size: 100,
                ineligible_status: "UnDetected".to_string(),
            },
            crawler: CrawlerConfig {
                max_concurrency: 8,
                target_records: Some(300),
                request_timeout_secs: 30,
                user_agents: vec![],
            },
            storage: StorageConfig {
                database_path: "./apkscout.db".to_string(),
            },
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_rejects_bad_listing_url() {
        let mut config = valid_config();
        config.catalog.listing_url = "not a url".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let mut config = valid_config();
        config.catalog.detail_url = "ftp://catalog.example.com/detail".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_zero_page_size() {
        let mut config = valid_config();
        config.catalog.page_size = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let mut config = valid_config();
        config.crawler.max_concurrency = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_target() {
        let mut config = valid_config();
        config.crawler.target_records = Some(0);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_target_is_optional() {
        let mut config = valid_config();
        config.crawler.target_records = None;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_rejects_empty_database_path() {
        let mut config = valid_config();
        config.storage.database_path = String::new();
        assert!(validate(&config).is_err());
    }
}
