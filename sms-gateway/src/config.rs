//! Configuration loading for sms-gateway.
//!
//! Configuration is loaded from a TOML file (default: `sms-gateway.toml`).
//! Every section and field is optional.

use serde::Deserialize;
use sms_client::KeeneticConfig;
use sms_types::Cost;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for sms-gateway.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Router connection.
    #[serde(default)]
    pub keenetic: KeeneticSection,
    /// REST API.
    #[serde(default)]
    pub http: HttpConfig,
    /// MQTT broker.
    #[serde(default)]
    pub mqtt: MqttConfig,
    /// Reconciliation loop.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Persistent state.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Per-message cost.
    #[serde(default)]
    pub billing: BillingConfig,
}

/// Router connection configuration.
#[derive(Clone, Deserialize)]
pub struct KeeneticSection {
    /// Router host (default: 192.168.1.1).
    #[serde(default = "default_keenetic_host")]
    pub host: String,
    /// Admin login (default: admin).
    #[serde(default = "default_admin")]
    pub username: String,
    /// Admin password.
    #[serde(default)]
    pub password: String,
    /// Modem interface (default: UsbLte0).
    #[serde(default = "default_interface")]
    pub interface: String,
    /// Talk to the router over HTTPS (default: false).
    #[serde(default)]
    pub use_https: bool,
    /// Upper bound for one remote call, including re-authentication
    /// (default: 60).
    #[serde(default = "default_call_timeout_secs")]
    pub timeout_secs: u64,
    /// Timeout for a single HTTP request (default: 15).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// REST API configuration.
#[derive(Clone, Deserialize)]
pub struct HttpConfig {
    /// Bind address (default: 0.0.0.0:5000).
    #[serde(default = "default_http_bind")]
    pub bind_address: String,
    /// Basic auth user for protected routes (default: admin).
    #[serde(default = "default_admin")]
    pub username: String,
    /// Basic auth password for protected routes (default: password).
    #[serde(default = "default_http_password")]
    pub password: String,
}

/// MQTT broker configuration.
#[derive(Clone, Deserialize)]
pub struct MqttConfig {
    /// Connect to a broker at all (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Broker host (default: core-mosquitto).
    #[serde(default = "default_mqtt_host")]
    pub host: String,
    /// Broker port (default: 1883).
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    /// Broker user; empty for anonymous.
    #[serde(default)]
    pub username: String,
    /// Broker password.
    #[serde(default)]
    pub password: String,
    /// MQTT client id (default: sms_keenetic_gateway).
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Prefix for state and command topics.
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,
    /// Prefix for discovery descriptors (default: homeassistant).
    #[serde(default = "default_discovery_prefix")]
    pub discovery_prefix: String,
    /// Keep-alive interval in seconds (default: 60).
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// Reconnect backoff ceiling in seconds (default: 60).
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
    /// Time allowed for the final publish on shutdown (default: 5).
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

/// Reconciliation loop configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Run the loop (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between passes (default: 60).
    #[serde(default = "default_sync_interval")]
    pub interval_secs: u64,
    /// Delete new messages from the modem once recorded (default: false).
    #[serde(default)]
    pub auto_delete: bool,
}

/// Persistent state configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to SQLite database file.
    #[serde(default = "default_database_path")]
    pub database: PathBuf,
    /// JSON counter file from older installs, imported once if present.
    #[serde(default)]
    pub legacy_counter_file: Option<PathBuf>,
}

/// Per-message cost configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Cost of one sent message (default: 0, cost sensor hidden).
    #[serde(default)]
    pub cost_per_message: f64,
    /// Currency label (default: USD).
    #[serde(default = "default_currency")]
    pub currency: String,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_keenetic_host() -> String {
    "192.168.1.1".to_string()
}

fn default_admin() -> String {
    "admin".to_string()
}

fn default_interface() -> String {
    "UsbLte0".to_string()
}

fn default_call_timeout_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_http_bind() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_http_password() -> String {
    "password".to_string()
}

fn default_mqtt_host() -> String {
    "core-mosquitto".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "sms_keenetic_gateway".to_string()
}

fn default_topic_prefix() -> String {
    "homeassistant/sensor/sms_keenetic_gateway".to_string()
}

fn default_discovery_prefix() -> String {
    "homeassistant".to_string()
}

fn default_keep_alive_secs() -> u64 {
    60
}

fn default_max_backoff_secs() -> u64 {
    60
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

fn default_sync_interval() -> u64 {
    60
}

fn default_database_path() -> PathBuf {
    PathBuf::from("sms-gateway.db")
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for KeeneticSection {
    fn default() -> Self {
        Self {
            host: default_keenetic_host(),
            username: default_admin(),
            password: String::new(),
            interface: default_interface(),
            use_https: false,
            timeout_secs: default_call_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl KeeneticSection {
    /// Client settings for this router.
    pub fn client_config(&self) -> KeeneticConfig {
        KeeneticConfig {
            host: self.host.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            interface: self.interface.clone(),
            use_https: self.use_https,
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
        }
    }

    /// Upper bound for one remote call.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl std::fmt::Debug for KeeneticSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeeneticSection")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("interface", &self.interface)
            .field("use_https", &self.use_https)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: default_http_bind(),
            username: default_admin(),
            password: default_http_password(),
        }
    }
}

impl std::fmt::Debug for HttpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConfig")
            .field("bind_address", &self.bind_address)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            username: String::new(),
            password: String::new(),
            client_id: default_client_id(),
            topic_prefix: default_topic_prefix(),
            discovery_prefix: default_discovery_prefix(),
            keep_alive_secs: default_keep_alive_secs(),
            max_backoff_secs: default_max_backoff_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

impl std::fmt::Debug for MqttConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttConfig")
            .field("enabled", &self.enabled)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("client_id", &self.client_id)
            .field("topic_prefix", &self.topic_prefix)
            .field("discovery_prefix", &self.discovery_prefix)
            .field("max_backoff_secs", &self.max_backoff_secs)
            .finish_non_exhaustive()
    }
}

impl MqttConfig {
    /// Reconnect backoff ceiling.
    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs.max(1))
    }

    /// Time allowed for the final publish on shutdown.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_sync_interval(),
            auto_delete: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database_path(),
            legacy_counter_file: None,
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            cost_per_message: 0.0,
            currency: default_currency(),
        }
    }
}

impl BillingConfig {
    /// Configured cost as an exact amount.
    pub fn cost(&self) -> Cost {
        Cost::from_decimal(self.cost_per_message)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
