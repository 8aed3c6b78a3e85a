use dotenv::dotenv;
use std::env;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_JWT_SECRET: &str = "un segreto meno bello";

/// Backend usato per lo store delle conversazioni
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    MySql,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Obbligatorio solo con `StoreBackend::MySql`
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub max_connections: u32,
    pub connection_lifetime_secs: u64,
    pub query_timeout_ms: u64,
    pub preview_concurrency: usize,
    pub refresh_interval_ms: u64,
    pub store_backend: StoreBackend,
    pub app_env: String,
}

impl Config {
    /// Carica la configurazione dalle variabili d'ambiente
    /// Chiama dotenv() automaticamente
    pub fn from_env() -> Result<Self, String> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Costruisce la configurazione a partire da una funzione di lookup delle variabili
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_backend = match lookup("STORE_BACKEND")
            .unwrap_or_else(|| "mysql".to_string())
            .to_lowercase()
            .as_str()
        {
            "mysql" => StoreBackend::MySql,
            "memory" => StoreBackend::Memory,
            other => return Err(format!("Invalid STORE_BACKEND '{}': use mysql or memory", other)),
        };

        let database_url = lookup("DATABASE_URL");
        if store_backend == StoreBackend::MySql && database_url.is_none() {
            return Err("DATABASE_URL must be set in .env file".to_string());
        }

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, using default (not secure for production!)");
            DEFAULT_JWT_SECRET.to_string()
        });

        let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let server_port = lookup("SERVER_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| "Invalid SERVER_PORT: must be a number between 0-65535".to_string())?;

        let max_connections = lookup("MAX_DB_CONNECTIONS")
            .unwrap_or_else(|| "100".to_string())
            .parse::<u32>()
            .map_err(|_| "Invalid MAX_DB_CONNECTIONS: must be a positive number".to_string())?;

        let connection_lifetime_secs = lookup("DB_CONNECTION_LIFETIME_SECS")
            .unwrap_or_else(|| "1800".to_string())
            .parse::<u64>()
            .map_err(|_| {
                "Invalid DB_CONNECTION_LIFETIME_SECS: must be a positive number".to_string()
            })?;

        let query_timeout_ms = lookup("QUERY_TIMEOUT_MS")
            .unwrap_or_else(|| "5000".to_string())
            .parse::<u64>()
            .ok()
            .filter(|&ms| ms > 0)
            .ok_or_else(|| "Invalid QUERY_TIMEOUT_MS: must be a positive number".to_string())?;

        let preview_concurrency = lookup("PREVIEW_CONCURRENCY")
            .unwrap_or_else(|| "4".to_string())
            .parse::<usize>()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| "Invalid PREVIEW_CONCURRENCY: must be at least 1".to_string())?;

        let refresh_interval_ms = lookup("REFRESH_INTERVAL_MS")
            .unwrap_or_else(|| "250".to_string())
            .parse::<u64>()
            .ok()
            .filter(|&ms| ms > 0)
            .ok_or_else(|| "Invalid REFRESH_INTERVAL_MS: must be a positive number".to_string())?;

        let app_env = lookup("APP_ENV").unwrap_or_else(|| "development".to_string());

        Ok(Config {
            database_url,
            jwt_secret,
            server_host,
            server_port,
            max_connections,
            connection_lifetime_secs,
            query_timeout_ms,
            preview_concurrency,
            refresh_interval_ms,
            store_backend,
            app_env,
        })
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    /// Logga la configurazione (nascondendo i segreti)
    pub fn print_info(&self) {
        info!("Server Configuration:");
        info!("   Environment: {}", self.app_env);
        info!("   Server Address: {}:{}", self.server_host, self.server_port);
        info!("   Store Backend: {:?}", self.store_backend);
        if let Some(url) = &self.database_url {
            info!("   Database: {}", Self::mask_url(url));
        }
        info!("   Max DB Connections: {}", self.max_connections);
        info!("   Connection Lifetime: {}s", self.connection_lifetime_secs);
        info!("   Query Timeout: {}ms", self.query_timeout_ms);
        info!("   Preview Concurrency: {}", self.preview_concurrency);
        info!("   Refresh Interval: {}ms", self.refresh_interval_ms);
        if self.jwt_secret == DEFAULT_JWT_SECRET {
            warn!("   JWT Secret: USING DEFAULT (INSECURE!)");
        } else {
            info!("   JWT Secret: custom secret configured");
        }
    }

    /// Maschera l'URL del database per il logging
    fn mask_url(url: &str) -> String {
        if let Some(at_pos) = url.find('@') {
            if let Some(scheme_end) = url.find("://") {
                let scheme = &url[..scheme_end + 3];
                let after_at = &url[at_pos..];
                return format!("{}***{}", scheme, after_at);
            }
        }
        "***".to_string()
    }
}
