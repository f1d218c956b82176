use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cors: CorsConfig,
    pub login_guard: LoginGuardConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: u64,
    pub idle_timeout: u64,
    pub max_lifetime: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub address: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// Thresholds for the sliding-window login throttle.
///
/// A (username, ip) pair is rate limited once `max_attempts` failed logins
/// have been recorded within the trailing `window_hours` window. The block
/// lifts by itself as failures age out of the window.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoginGuardConfig {
    pub max_attempts: i64,
    pub window_hours: i64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/forum_db".to_string(),
            max_connections: 16,
            min_connections: 4,
            acquire_timeout: 5,
            idle_timeout: 30,
            max_lifetime: 1800,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            address: "127.0.0.1".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allow_credentials: false,
        }
    }
}

impl Default for LoginGuardConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_hours: 1,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources in priority order:
    /// 1. Built-in defaults
    /// 2. Forum.toml (base configuration file)
    /// 3. Environment variables (prefixed with FORUM_)
    /// 4. DATABASE_URL environment variable (for backwards compatibility)
    pub fn load() -> Result<Self, figment::Error> {
        let defaults = toml::to_string(&Config::default()).expect("default config must serialize");

        let figment = Figment::new()
            .merge(Toml::string(&defaults).nested())
            .merge(Toml::file("Forum.toml").nested())
            .merge(Env::prefixed("FORUM_").split("_"))
            .merge(Env::raw().only(&["DATABASE_URL"]).map(|_| "database.url".into()));

        figment.extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_guard_defaults() {
        let config = LoginGuardConfig::default();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.window_hours, 1);
    }

    #[test]
    fn database_pool_tunables_have_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.acquire_timeout, 5);
        assert_eq!(config.idle_timeout, 30);
        assert_eq!(config.max_lifetime, 1800);
    }

    #[test]
    fn default_config_serializes() {
        let serialized = toml::to_string(&Config::default()).unwrap();
        assert!(serialized.contains("max_attempts"));
        assert!(serialized.contains("allowed_origins"));
    }
}
