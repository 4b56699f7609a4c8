use std::{env, str::FromStr, time::Duration};

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache TTL in seconds (default: 300)
    pub cache_ttl_seconds: u64,
    /// Maximum number of cache entries (default: 10,000)
    pub cache_max_entries: usize,
    /// Maximum size of event history for SSE (default: 1,000)
    pub event_history_max_size: usize,
    /// Largest batch accepted by bulk endpoints (default: 100)
    pub max_batch_size: usize,
    /// Days of occupancy readings kept by the retention purge (default: 90)
    pub occupancy_retention_days: u32,
    /// Path to SQLite database file (default: "propdesk.db")
    #[cfg_attr(not(feature = "sqlite"), allow(dead_code))]
    pub sqlite_path: String,
    /// Redis connection URL (default: "redis://localhost:6379")
    #[cfg_attr(not(feature = "redis"), allow(dead_code))]
    pub redis_url: String,
    /// Log output format (default: pretty)
    pub log_format: LogFormat,
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CACHE_TTL_SECONDS` - Cache TTL in seconds (default: 300)
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 10,000)
    /// - `EVENT_HISTORY_MAX_SIZE` - SSE event history size (default: 1,000)
    /// - `MAX_BATCH_SIZE` - Bulk request limit (default: 100)
    /// - `OCCUPANCY_RETENTION_DAYS` - Reading retention (default: 90)
    /// - `SQLITE_PATH` - SQLite database path (default: "propdesk.db")
    /// - `REDIS_URL` - Redis connection URL (default: "redis://localhost:6379")
    /// - `LOG_FORMAT` - `pretty` or `json` (default: pretty)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            cache_ttl_seconds: parse_or(&lookup, "CACHE_TTL_SECONDS", 300),
            cache_max_entries: parse_or(&lookup, "CACHE_MAX_ENTRIES", 10_000),
            event_history_max_size: parse_or(&lookup, "EVENT_HISTORY_MAX_SIZE", 1_000),
            max_batch_size: parse_or(&lookup, "MAX_BATCH_SIZE", 100),
            occupancy_retention_days: parse_or(&lookup, "OCCUPANCY_RETENTION_DAYS", 90),
            sqlite_path: lookup("SQLITE_PATH").unwrap_or_else(|| "propdesk.db".to_string()),
            redis_url: lookup("REDIS_URL")
                .unwrap_or_else(|| "redis://localhost:6379".to_string()),
            log_format: parse_or(&lookup, "LOG_FORMAT", LogFormat::default()),
        }
    }

    /// Get cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_cache_ttl_conversion() {
        let config = Config {
            cache_ttl_seconds: 600,
            ..Config::default()
        };

        assert_eq!(config.cache_ttl(), Duration::from_secs(600));
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();

        assert_eq!(config.cache_ttl_seconds, 300);
        assert_eq!(config.cache_max_entries, 10_000);
        assert_eq!(config.event_history_max_size, 1_000);
        assert_eq!(config.max_batch_size, 100);
        assert_eq!(config.occupancy_retention_days, 90);
        assert_eq!(config.sqlite_path, "propdesk.db");
        assert_eq!(config.redis_url, "redis://localhost:6379");
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("CACHE_TTL_SECONDS", "60"),
            ("MAX_BATCH_SIZE", "not-a-number"),
            ("OCCUPANCY_RETENTION_DAYS", "30"),
            ("LOG_FORMAT", "JSON"),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.cache_ttl_seconds, 60);
        assert_eq!(config.max_batch_size, 100);
        assert_eq!(config.occupancy_retention_days, 30);
        assert_eq!(config.log_format, LogFormat::Json);
    }
}
