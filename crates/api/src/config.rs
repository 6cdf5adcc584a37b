//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use book_tools::ToolPolicy;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server bind address.
    pub addr: SocketAddr,
    /// Allowed CORS origins. `None` allows any origin.
    pub cors_origins: Option<Vec<String>>,
    /// JSONL book catalog.
    pub catalog_path: Option<PathBuf>,
    /// Directory holding `<book_id>.txt` files.
    pub book_content_dir: Option<PathBuf>,
    /// Create missing assistants at startup and delete them on shutdown.
    pub provision_assistants: bool,
    /// Per-call limit for local tool handlers.
    pub tool_timeout: Duration,
    /// How long successful catalog lookups are reused. `None` disables caching.
    pub tool_cache_ttl: Option<Duration>,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `HOST` | Bind host | `0.0.0.0` |
    /// | `PORT` | Bind port | `8000` |
    /// | `CORS_ORIGINS` | Comma-separated origins, `*` for any | `*` |
    /// | `CATALOG_PATH` | JSONL book catalog | (none) |
    /// | `BOOK_CONTENT_DIR` | Book text directory | (none) |
    /// | `PROVISION_ASSISTANTS` | Create assistants at startup | `false` |
    /// | `TOOL_TIMEOUT_SECS` | Tool handler timeout | `120` |
    /// | `TOOL_CACHE_TTL_SECS` | Catalog lookup cache lifetime, `0` disables | (disabled) |
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_string("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match env_string("PORT") {
            Some(port) => port.parse::<u16>().map_err(|_| ConfigError::InvalidPort(port))?,
            None => 8000,
        };
        let addr = format!("{}:{}", host, port)
            .parse()
            .map_err(|_| ConfigError::InvalidAddr(host))?;

        let provision_assistants = env_string("PROVISION_ASSISTANTS")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let tool_timeout = env_string("TOOL_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(120));

        let tool_cache_ttl = env_string("TOOL_CACHE_TTL_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(Self {
            addr,
            cors_origins: parse_origins(env_string("CORS_ORIGINS").as_deref()),
            catalog_path: env_string("CATALOG_PATH").map(PathBuf::from),
            book_content_dir: env_string("BOOK_CONTENT_DIR").map(PathBuf::from),
            provision_assistants,
            tool_timeout,
            tool_cache_ttl,
        })
    }

    /// Execution policy for the local tool handlers.
    pub fn tool_policy(&self) -> ToolPolicy {
        let policy = ToolPolicy::default().with_timeout(self.tool_timeout);
        match self.tool_cache_ttl {
            Some(ttl) => policy.with_cache_ttl(ttl),
            None => policy,
        }
    }
}

/// Parse a comma-separated origin list. `*` or an empty list allows any.
fn parse_origins(value: Option<&str>) -> Option<Vec<String>> {
    let origins: Vec<String> = value?
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect();
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        None
    } else {
        Some(origins)
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid PORT: {0}")]
    InvalidPort(String),

    #[error("Invalid HOST: {0}")]
    InvalidAddr(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins() {
        assert_eq!(parse_origins(None), None);
        assert_eq!(parse_origins(Some("*")), None);
        assert_eq!(parse_origins(Some(" , ")), None);
        assert_eq!(
            parse_origins(Some("http://localhost:3000, https://books.example")),
            Some(vec![
                "http://localhost:3000".to_string(),
                "https://books.example".to_string()
            ])
        );
    }

    #[test]
    fn test_from_env_scenarios() {
        use std::sync::Mutex;
        static ENV_LOCK: Mutex<()> = Mutex::new(());
        let _guard = ENV_LOCK.lock().unwrap();

        fn clear_vars() {
            for key in [
                "HOST",
                "PORT",
                "CORS_ORIGINS",
                "CATALOG_PATH",
                "BOOK_CONTENT_DIR",
                "PROVISION_ASSISTANTS",
                "TOOL_TIMEOUT_SECS",
                "TOOL_CACHE_TTL_SECS",
            ] {
                std::env::remove_var(key);
            }
        }

        clear_vars();
        let config = ApiConfig::from_env().unwrap();
        assert_eq!(config.addr.to_string(), "0.0.0.0:8000");
        assert!(config.cors_origins.is_none());
        assert!(config.catalog_path.is_none());
        assert!(!config.provision_assistants);
        assert_eq!(config.tool_timeout, Duration::from_secs(120));
        assert!(config.tool_cache_ttl.is_none());
        assert!(config.tool_policy().cache_ttl.is_none());

        std::env::set_var("HOST", "127.0.0.1");
        std::env::set_var("PORT", "9001");
        std::env::set_var("PROVISION_ASSISTANTS", "TRUE");
        std::env::set_var("CATALOG_PATH", "data/books.jsonl");
        std::env::set_var("TOOL_TIMEOUT_SECS", "30");
        let config = ApiConfig::from_env().unwrap();
        assert_eq!(config.addr.to_string(), "127.0.0.1:9001");
        assert!(config.provision_assistants);
        assert_eq!(config.catalog_path, Some(PathBuf::from("data/books.jsonl")));
        assert_eq!(config.tool_timeout, Duration::from_secs(30));

        std::env::set_var("TOOL_CACHE_TTL_SECS", "300");
        let policy = ApiConfig::from_env().unwrap().tool_policy();
        assert_eq!(policy.timeout, Some(Duration::from_secs(30)));
        assert_eq!(policy.cache_ttl, Some(Duration::from_secs(300)));

        std::env::set_var("TOOL_CACHE_TTL_SECS", "0");
        assert!(ApiConfig::from_env().unwrap().tool_cache_ttl.is_none());

        std::env::set_var("PORT", "eighty");
        assert!(matches!(ApiConfig::from_env(), Err(ConfigError::InvalidPort(_))));

        clear_vars();
    }
}
