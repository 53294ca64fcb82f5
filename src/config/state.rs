// Application state module
// Shared by every connection task of both listeners

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::types::Config;
use crate::gateway::Gateway;
use crate::server::signal::Shutdown;

/// Application state
pub struct AppState {
    pub config: Config,
    pub gateway: Arc<Gateway>,
    pub shutdown: Arc<Shutdown>,

    // Cached config values for fast access without locks
    pub cached_access_log: AtomicBool,
}

impl AppState {
    pub fn new(config: Config, gateway: Arc<Gateway>) -> Self {
        let cached_access_log = AtomicBool::new(config.logging.access_log);
        Self {
            config,
            gateway,
            shutdown: Arc::new(Shutdown::new()),
            cached_access_log,
        }
    }

    pub fn access_log_enabled(&self) -> bool {
        self.cached_access_log.load(Ordering::Relaxed)
    }
}
