// Configuration module entry point
// Loads the layered configuration and holds the runtime state

mod state;
mod types;

use std::net::SocketAddr;

pub use state::AppState;
pub use types::{
    Config, HttpConfig, LoggingConfig, MountConfig, PerformanceConfig, RegistrationMode,
    RegistryConfig, ServerConfig,
};

type Builder = config::ConfigBuilder<config::builder::DefaultState>;

/// Defaults applied under every other source
fn with_defaults(builder: Builder) -> Result<Builder, config::ConfigError> {
    builder
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8080)?
        .set_default("server.admin_host", "127.0.0.1")?
        .set_default("server.admin_port", 8000)?
        .set_default("server.shutdown_timeout", 5)?
        .set_default("logging.level", "info")?
        .set_default("logging.access_log", true)?
        .set_default("performance.keep_alive", true)?
        .set_default("performance.read_timeout", 15)?
        .set_default("performance.tcp_nodelay", true)?
        .set_default("http.server_name", "fsgate/1.0")?
        .set_default("http.max_body_size", 104_857_600) // 100MB
}

impl Config {
    /// Load configuration from specified file path (extension optional)
    ///
    /// Environment variables override the file, e.g.
    /// `FSGATE_SERVER__PORT=9090` or `FSGATE_REGISTRY__MODE=static`.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("FSGATE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        with_defaults(builder)?.build()?.try_deserialize()
    }

    /// Parse configuration from TOML text, defaults applied
    pub fn from_toml_str(toml: &str) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml));

        with_defaults(builder)?.build()?.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    pub fn get_admin_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.admin_host, self.server.admin_port)
            .parse()
            .map_err(|e| format!("Invalid admin address: {e}"))
    }
}
