// Configuration types
// Server, logging, transport, registry and mount definitions

use serde::{Deserialize, Serialize};

use crate::registry::DuplicatePolicy;
use crate::store::StoreConfig;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Filesystems mounted at boot
    #[serde(default)]
    pub mounts: Vec<MountConfig>,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub admin_host: String,
    pub admin_port: u16,
    pub workers: Option<usize>,
    /// Seconds to wait for open connections after a shutdown signal
    pub shutdown_timeout: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Minimum level: error, warn, info or debug
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Seconds allowed for a client to send request headers
    pub read_timeout: u64,
    pub tcp_nodelay: bool,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    /// Largest accepted PUT body, checked against Content-Length
    pub max_body_size: u64,
}

/// How filesystems get registered
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationMode {
    /// Mounts come from the config file only; the registry is frozen after boot
    Static,
    /// Mounts may also be added and removed through the admin API
    #[default]
    Dynamic,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default)]
pub struct RegistryConfig {
    #[serde(default)]
    pub mode: RegistrationMode,
    #[serde(default)]
    pub on_duplicate: DuplicatePolicy,
}

/// One filesystem definition
///
/// ```toml
/// [[mounts]]
/// name = "local1"
/// prefix = "/files"
/// methods = ["GET", "HEAD"]
/// store = { type = "local", root = "/srv/files", create = true }
/// ```
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct MountConfig {
    pub name: String,
    pub prefix: String,
    pub store: StoreConfig,
    /// Methods to serve; GET, HEAD and (unless read-only) PUT when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods: Option<Vec<String>>,
}
