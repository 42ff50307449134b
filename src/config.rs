use std::time::Duration;

use config::{Config as CConfig, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::qr::{self, QrGenerator};

/// Prefix of the environment variables overriding the configuration, e.g.
/// `TABLE_SERVICE__SERVER__PORT=8080`
pub const ENV_PREFIX: &str = "TABLE_SERVICE";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub photos: PhotosConfig,
    #[serde(default)]
    pub qr: QrConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
    /// Number of worker threads, available parallelism if unset
    #[serde(default)]
    pub workers: Option<usize>,
    /// SQLite database file, ":memory:" to keep everything in memory
    #[serde(default = "ServerConfig::default_database")]
    pub database: String,
}

impl ServerConfig {
    fn default_host() -> String {
        String::from("127.0.0.1")
    }

    fn default_port() -> u16 {
        9898
    }

    fn default_database() -> String {
        String::from(":memory:")
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|x| x.into())
                .unwrap_or(4)
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            workers: None,
            database: Self::default_database(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PhotosConfig {
    /// Directory the uploaded photos are written to
    #[serde(default = "PhotosConfig::default_dir")]
    pub dir: String,
    /// Scheme, host and port under which the server is reachable by browsers
    #[serde(default = "PhotosConfig::default_public_base_url")]
    pub public_base_url: String,
}

impl PhotosConfig {
    fn default_dir() -> String {
        String::from("photos")
    }

    fn default_public_base_url() -> String {
        String::from("http://127.0.0.1:9898")
    }
}

impl Default for PhotosConfig {
    fn default() -> Self {
        Self {
            dir: Self::default_dir(),
            public_base_url: Self::default_public_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct QrConfig {
    /// Origin of the customer web app the codes point to
    #[serde(default = "QrConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "QrConfig::default_image_service")]
    pub image_service: String,
    #[serde(default = "QrConfig::default_size")]
    pub size: u32,
}

impl QrConfig {
    fn default_base_url() -> String {
        String::from("http://localhost:3000")
    }

    fn default_image_service() -> String {
        String::from(qr::DEFAULT_IMAGE_SERVICE)
    }

    fn default_size() -> u32 {
        qr::DEFAULT_SIZE
    }

    pub fn generator(&self) -> QrGenerator {
        QrGenerator {
            base_url: self.base_url.clone(),
            image_service: self.image_service.clone(),
            size: self.size,
        }
    }
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            image_service: Self::default_image_service(),
            size: Self::default_size(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Whether staff may delete every request at once
    #[serde(default)]
    pub allow_bulk_clear: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Server the client talks to
    #[serde(default = "ClientConfig::default_address")]
    pub address: String,
    /// Interval between two dashboard refreshes
    #[serde(default = "ClientConfig::default_dashboard_poll", with = "humantime_serde")]
    pub dashboard_poll: Duration,
    /// Interval between two cooldown display updates
    #[serde(default = "ClientConfig::default_countdown_tick", with = "humantime_serde")]
    pub countdown_tick: Duration,
}

impl ClientConfig {
    fn default_address() -> String {
        String::from(crate::cli::DEFAULT_ADDRESS)
    }

    fn default_dashboard_poll() -> Duration {
        Duration::from_secs(3)
    }

    fn default_countdown_tick() -> Duration {
        Duration::from_secs(1)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: Self::default_address(),
            dashboard_poll: Self::default_dashboard_poll(),
            countdown_tick: Self::default_countdown_tick(),
        }
    }
}

impl Config {
    /// Parse a TOML document, without environment overrides
    pub fn from_str(toml_str: &str) -> Result<Config> {
        CConfig::builder()
            .add_source(File::from_str(toml_str, FileFormat::Toml))
            .build()
            .and_then(CConfig::try_deserialize)
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// Load the configuration from an optional TOML file, overridden by `TABLE_SERVICE__*`
    /// environment variables
    pub fn load(path: Option<&str>) -> Result<Config> {
        let mut builder = CConfig::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(CConfig::try_deserialize)
            .map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.address(), "127.0.0.1:9898");
        assert_eq!(config.server.database, ":memory:");
        assert!(!config.service.allow_bulk_clear);
        assert_eq!(config.client.dashboard_poll, Duration::from_secs(3));
        assert_eq!(config.client.countdown_tick, Duration::from_secs(1));
        assert_eq!(config.qr.size, 200);
    }

    #[test]
    fn test_load_correct_toml() {
        let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 3000
        workers = 2
        database = "tables.db"

        [photos]
        dir = "/var/lib/table-service/photos"
        public_base_url = "https://tables.example.com"

        [qr]
        base_url = "https://order.example.com"

        [service]
        allow_bulk_clear = true

        [client]
        dashboard_poll = "5s"
        countdown_tick = "500ms"
        "#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.server.address(), "0.0.0.0:3000");
        assert_eq!(config.server.worker_count(), 2);
        assert_eq!(config.server.database, "tables.db");
        assert_eq!(config.photos.public_base_url, "https://tables.example.com");
        assert_eq!(config.qr.generator().base_url, "https://order.example.com");
        assert_eq!(config.qr.image_service, qr::DEFAULT_IMAGE_SERVICE);
        assert!(config.service.allow_bulk_clear);
        assert_eq!(config.client.dashboard_poll, Duration::from_secs(5));
        assert_eq!(config.client.countdown_tick, Duration::from_millis(500));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let toml = r#"
        [server]
        hots = "0.0.0.0"
        "#;
        assert!(matches!(Config::from_str(toml), Err(Error::Config(_))));
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("table-service.toml");
        std::fs::write(
            &path,
            "[server]\nport = 3000\nhost = \"0.0.0.0\"\n\n[service]\nallow_bulk_clear = false\n",
        )
        .unwrap();

        std::env::set_var("TABLE_SERVICE__SERVER__PORT", "8181");
        std::env::set_var("TABLE_SERVICE__SERVICE__ALLOW_BULK_CLEAR", "true");
        let config = Config::load(path.to_str());
        std::env::remove_var("TABLE_SERVICE__SERVER__PORT");
        std::env::remove_var("TABLE_SERVICE__SERVICE__ALLOW_BULK_CLEAR");

        let config = config.unwrap();
        assert_eq!(config.server.port, 8181);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.service.allow_bulk_clear);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Config::load(Some("/nonexistent/table-service.toml")).is_err());
    }
}
