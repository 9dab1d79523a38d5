use crate::config::types::{Config, HarvestConfig, SelectorConfig, StoreBackend, StoreConfig};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvest_config(&config.harvest)?;
    validate_selectors(&config.selectors)?;
    validate_store_config(&config.store)?;
    Ok(())
}

/// Validates the harvest section
fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.entrypoint).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid entrypoint '{}': {}", config.entrypoint, e))
    })?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::Validation(format!(
            "Entrypoint '{}' must use HTTP or HTTPS scheme",
            config.entrypoint
        )));
    }

    if config.book_id < 0 {
        return Err(ConfigError::Validation(format!(
            "book_id must be >= 0, got {}",
            config.book_id
        )));
    }

    if config.selector_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "selector_timeout_ms must be >= 100ms, got {}ms",
            config.selector_timeout_ms
        )));
    }

    Ok(())
}

/// Validates that every configured selector is well-formed CSS
fn validate_selectors(config: &SelectorConfig) -> Result<(), ConfigError> {
    for (name, raw) in [
        ("panel", &config.panel),
        ("header", &config.header),
        ("arabic", &config.arabic),
        ("translation", &config.translation),
        ("next", &config.next),
    ] {
        parse_selector(name, raw)?;
    }
    Ok(())
}

/// Parses a single selector, naming the config key on failure
pub(crate) fn parse_selector(name: &str, raw: &str) -> Result<Selector, ConfigError> {
    if raw.trim().is_empty() {
        return Err(ConfigError::InvalidSelector(format!(
            "{} selector cannot be empty",
            name
        )));
    }

    Selector::parse(raw)
        .map_err(|e| ConfigError::InvalidSelector(format!("{} selector '{}': {:?}", name, raw, e)))
}

/// Validates the store section
fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.database.is_empty() {
        return Err(ConfigError::Validation(
            "database cannot be empty".to_string(),
        ));
    }

    validate_table_name(&config.table)?;

    if config.max_connections < 1 || config.max_connections > 100 {
        return Err(ConfigError::Validation(format!(
            "max_connections must be between 1 and 100, got {}",
            config.max_connections
        )));
    }

    if config.backend == StoreBackend::Postgres {
        if config.host.is_empty() {
            return Err(ConfigError::Validation(
                "host cannot be empty for the postgres backend".to_string(),
            ));
        }

        if config.user.is_empty() {
            return Err(ConfigError::Validation(
                "user cannot be empty for the postgres backend".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates a table name of the form `table` or `schema.table`
///
/// The name is spliced into SQL text, so only plain identifiers are allowed.
fn validate_table_name(table: &str) -> Result<(), ConfigError> {
    if table.is_empty() {
        return Err(ConfigError::InvalidTable(
            "Table name cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = table.split('.').collect();
    if parts.len() > 2 {
        return Err(ConfigError::InvalidTable(format!(
            "Table '{}' may have at most one schema qualifier",
            table
        )));
    }

    for part in parts {
        let mut chars = part.chars();
        let valid_start = chars
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false);

        if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ConfigError::InvalidTable(format!(
                "Table '{}' must consist of letters, digits and underscores",
                table
            )));
        }
    }

    Ok(())
}
