//! Server configuration loaded from environment variables.
//!
//! All settings have defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.  The literal `:memory:` selects the in-memory
    /// backend (state is lost on shutdown).
    /// Env: `DATABASE_PATH`
    /// Default: unset (SQLite file in the platform data directory).
    pub database_path: Option<PathBuf>,

    /// Number of in-flight resolutions a bulk validation runs at once.
    /// Env: `BULK_CONCURRENCY`
    /// Default: `4`
    pub bulk_concurrency: usize,

    /// Seconds after which an unrefreshed typing signal disappears.
    /// Env: `TYPING_TTL_SECS`
    /// Default: `10`
    pub typing_ttl_secs: u64,

    /// Human-readable name for this server instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"Tribune"`
    pub instance_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            database_path: None,
            bulk_concurrency: tribune_core::DEFAULT_CONCURRENCY,
            typing_ttl_secs: 10,
            instance_name: "Tribune".to_string(),
        }
    }
}

impl ServerConfig {
    /// Whether the in-memory backend was requested.
    pub fn in_memory(&self) -> bool {
        self.database_path.as_deref() == Some(std::path::Path::new(":memory:"))
    }

    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(val) = std::env::var("BULK_CONCURRENCY") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.bulk_concurrency = n,
                _ => {
                    tracing::warn!(value = %val, "Invalid BULK_CONCURRENCY, using default");
                }
            }
        }

        if let Ok(val) = std::env::var("TYPING_TTL_SECS") {
            match val.parse::<u64>() {
                Ok(n) => config.typing_ttl_secs = n,
                Err(_) => {
                    tracing::warn!(value = %val, "Invalid TYPING_TTL_SECS, using default");
                }
            }
        }

        if let Ok(name) = std::env::var("INSTANCE_NAME") {
            if !name.is_empty() {
                config.instance_name = name;
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert!(config.database_path.is_none());
        assert!(!config.in_memory());
        assert_eq!(config.bulk_concurrency, 4);
        assert_eq!(config.typing_ttl_secs, 10);
    }

    #[test]
    fn test_memory_backend_sentinel() {
        let config = ServerConfig {
            database_path: Some(PathBuf::from(":memory:")),
            ..Default::default()
        };
        assert!(config.in_memory());
    }
}
