use std::env;
use std::str::FromStr;

use crate::store::ErrorCode;

/// Which document store backs the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "postgres" => Ok(StoreBackend::Postgres),
            other => Err(format!("STORE_BACKEND must be 'memory' or 'postgres', got '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,

    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    /// Collection ids the memory store has group indexes for.
    pub store_group_indexes: Vec<String>,

    pub journal_user_id: String,
    /// Store error codes that trigger the per-partition fallback read.
    pub index_fallback_codes: Vec<ErrorCode>,

    pub step_source_url: Option<String>,
    pub step_source_token: Option<String>,

    pub recent_limit: usize,
    pub insight_window_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            frontend_url: "http://localhost:3000".into(),
            store_backend: StoreBackend::Memory,
            database_url: None,
            store_group_indexes: Vec::new(),
            journal_user_id: "default_user".into(),
            index_fallback_codes: vec![ErrorCode::FailedPrecondition],
            step_source_url: None,
            step_source_token: None,
            recent_limit: 50,
            insight_window_days: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let store_backend = env::var("STORE_BACKEND")
            .map(|raw| raw.parse().expect("invalid STORE_BACKEND"))
            .unwrap_or(defaults.store_backend);
        let database_url = non_empty("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            panic!("DATABASE_URL must be set when STORE_BACKEND=postgres");
        }

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .expect("PORT must be a number"),
            frontend_url: env::var("FRONTEND_URL").unwrap_or(defaults.frontend_url),

            store_backend,
            database_url,
            store_group_indexes: env::var("STORE_GROUP_INDEXES")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),

            journal_user_id: non_empty("JOURNAL_USER_ID").unwrap_or(defaults.journal_user_id),
            index_fallback_codes: env::var("INDEX_FALLBACK_CODES")
                .map(|raw| parse_codes(&raw).expect("invalid INDEX_FALLBACK_CODES"))
                .unwrap_or(defaults.index_fallback_codes),

            step_source_url: non_empty("STEP_SOURCE_URL"),
            step_source_token: non_empty("STEP_SOURCE_TOKEN"),

            recent_limit: env::var("RECENT_LIMIT")
                .unwrap_or_else(|_| "50".into())
                .parse()
                .unwrap_or(defaults.recent_limit),
            insight_window_days: env::var("INSIGHT_WINDOW_DAYS")
                .unwrap_or_else(|_| "30".into())
                .parse()
                .unwrap_or(defaults.insight_window_days),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Comma-separated store error codes, e.g. `failed-precondition,unavailable`.
pub fn parse_codes(raw: &str) -> Result<Vec<ErrorCode>, String> {
    split_list(raw).iter().map(|code| code.parse()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.journal_user_id, "default_user");
        assert_eq!(config.index_fallback_codes, vec![ErrorCode::FailedPrecondition]);
        assert_eq!(config.recent_limit, 50);
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_parse_codes() {
        assert_eq!(
            parse_codes(" failed-precondition, unavailable ,").unwrap(),
            vec![ErrorCode::FailedPrecondition, ErrorCode::Unavailable]
        );
        assert!(parse_codes("").unwrap().is_empty());
        assert!(parse_codes("index-missing").is_err());
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("Postgres".parse::<StoreBackend>(), Ok(StoreBackend::Postgres));
        assert_eq!("memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert!("sqlite".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_split_list_skips_blanks() {
        assert_eq!(split_list("entries, ,fullCharges"), vec!["entries", "fullCharges"]);
    }
}
