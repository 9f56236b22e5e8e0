use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::schema::ValidationMode;

/// URL scheme selecting the process-local document store.
pub const MEMORY_STORE_URL: &str = "memory://";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    /// `DATABASE_URL` itself was set, as opposed to a URL assembled from `DB_*`
    pub database_url_from_env: bool,
    pub database_name: Option<String>,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub max_list_limit: u32,
    pub validation_mode: ValidationMode,
    pub cors_allowed_origins: Vec<String>,
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            database_url_from_env: false,
            database_name: None,
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_connections: 10,
            max_list_limit: 1000,
            validation_mode: ValidationMode::Permissive,
            cors_allowed_origins: vec!["*".to_string()],
            log_dir: None,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // DATABASE_URL wins; otherwise assemble one from DB_* parts when a host is given
        let database_url_from_env = var("DATABASE_URL").is_some();
        let database_url = match var("DATABASE_URL") {
            Some(url) => Some(url),
            None => var("DB_HOST").map(|db_host| {
                let db_port = var("DB_PORT").unwrap_or_else(|| "5432".to_string());
                let db_user = var("DB_USER").unwrap_or_else(|| "postgres".to_string());
                let db_password = var("DB_PASSWORD").unwrap_or_default();

                // URL-encode password to handle special characters
                let encoded_password = urlencoding::encode(&db_password);

                format!(
                    "postgres://{}:{}@{}:{}/postgres",
                    db_user, encoded_password, db_host, db_port
                )
            }),
        };

        let database_name = var("DATABASE_NAME");

        let host = var("HOST").unwrap_or(defaults.host);

        let port = var("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let max_connections = var("MAX_CONNECTIONS")
            .and_then(|v| v.parse().ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.max_connections);

        let max_list_limit = var("MAX_LIST_LIMIT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_list_limit);

        let validation_mode = match var("STRICT_ENUMS") {
            Some(v) if parse_bool(&v) => ValidationMode::Strict,
            _ => ValidationMode::Permissive,
        };

        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .unwrap_or(defaults.cors_allowed_origins);

        let log_dir = var("LOG_DIR").map(PathBuf::from);

        Ok(Config {
            database_url,
            database_url_from_env,
            database_name,
            host,
            port,
            max_connections,
            max_list_limit,
            validation_mode,
            cors_allowed_origins,
            log_dir,
        })
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|e| anyhow::anyhow!("Invalid socket address: {}", e))
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url.as_deref() == Some(MEMORY_STORE_URL)
    }

    /// Connection URL with the path replaced by `DATABASE_NAME` when one is set.
    pub fn resolved_database_url(&self) -> anyhow::Result<Option<String>> {
        let Some(base_url) = self.database_url.as_deref() else {
            return Ok(None);
        };

        let Some(db_name) = self.database_name.as_deref() else {
            return Ok(Some(base_url.to_string()));
        };

        // Find the slash that starts the path, after the scheme's "//"
        let authority_start = base_url
            .find("://")
            .map(|i| i + 3)
            .ok_or_else(|| anyhow::anyhow!("Invalid DATABASE_URL format: {}", base_url))?;

        let (base, query) = match base_url.find('?') {
            Some(q) => (&base_url[..q], &base_url[q..]),
            None => (base_url, ""),
        };

        let host_part = match base[authority_start..].find('/') {
            Some(slash) => &base[..authority_start + slash],
            None => base,
        };

        Ok(Some(format!("{}/{}{}", host_part, db_name, query)))
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
