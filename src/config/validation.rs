use crate::config::types::{Config, CrawlerConfig, OutputConfig, PortalConfig, ProxyEntry};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_portal_config(&config.portal)?;
    validate_crawler_config(&config.crawler)?;
    validate_proxy_entries(&config.proxy)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates portal configuration
fn validate_portal_config(config: &PortalConfig) -> Result<(), ConfigError> {
    validate_http_url("listing-url", &config.listing_url)?;
    validate_http_url("detail-url", &config.detail_url)?;

    if encoding_rs::Encoding::for_label(config.encoding.as_bytes()).is_none() {
        return Err(ConfigError::UnknownEncoding(config.encoding.clone()));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.connection_limit < 1 || config.connection_limit > 100 {
        return Err(ConfigError::Validation(format!(
            "connection_limit must be between 1 and 100, got {}",
            config.connection_limit
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if let Some(limit) = config.time_limit_secs {
        if limit < 1 {
            return Err(ConfigError::Validation(format!(
                "time_limit_secs must be >= 1 when set, got {}",
                limit
            )));
        }
    }

    Ok(())
}

/// Validates forwarding endpoint entries
fn validate_proxy_entries(entries: &[ProxyEntry]) -> Result<(), ConfigError> {
    for entry in entries {
        validate_http_url("proxy endpoint", &entry.endpoint)?;
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.progress_path.is_empty() {
        return Err(ConfigError::Validation(
            "progress_path cannot be empty".to_string(),
        ));
    }

    if config.dataset_path.is_empty() {
        return Err(ConfigError::Validation(
            "dataset_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that a string is a well-formed http(s) URL
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Invalid {}: '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            portal: PortalConfig {
                listing_url: "http://registry.example.gov/query/list.asp".to_string(),
                detail_url: "http://registry.example.gov/query/detail.asp".to_string(),
                encoding: "big5".to_string(),
            },
            crawler: CrawlerConfig {
                connection_limit: 15,
                request_timeout_secs: 30,
                retry_cooldown_secs: 10,
                block_cooldown_secs: 600,
                time_limit_secs: None,
            },
            proxy: vec![ProxyEntry {
                endpoint: "http://10.0.0.1:8080".to_string(),
            }],
            output: OutputConfig {
                progress_path: "_record.json".to_string(),
                dataset_path: "data.json".to_string(),
            },
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_rejects_zero_connection_limit() {
        let mut config = valid_config();
        config.crawler.connection_limit = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_encoding() {
        let mut config = valid_config();
        config.portal.encoding = "klingon-7".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::UnknownEncoding(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_listing_url() {
        let mut config = valid_config();
        config.portal.listing_url = "not a url".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_rejects_non_http_proxy() {
        let mut config = valid_config();
        config.proxy[0].endpoint = "ftp://10.0.0.1".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_rejects_empty_output_paths() {
        let mut config = valid_config();
        config.output.dataset_path = String::new();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_accepts_empty_proxy_list() {
        let mut config = valid_config();
        config.proxy.clear();
        assert!(validate(&config).is_ok());
    }
}
