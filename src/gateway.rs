//! Gateway composition root
//!
//! Owns the registry and the router built on top of it. Boot-time mounts come
//! from [`Config::mounts`]; a definition that fails to build is logged and
//! skipped so the remaining filesystems still come up.

use std::sync::Arc;
use thiserror::Error;

use crate::action::{ActionTable, PipelineError};
use crate::config::{Config, MountConfig, RegistrationMode};
use crate::logger;
use crate::mount::MountedStore;
use crate::registry::{DuplicatePolicy, Prefix, RegistryError, StoreRegistry};
use crate::router::RequestRouter;
use crate::store::{build_store, FileStore, StoreError};

/// Failure to mount one filesystem definition
#[derive(Debug, Error)]
pub enum MountError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("cannot open store: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

#[derive(Debug)]
pub struct Gateway {
    registry: Arc<StoreRegistry>,
    router: RequestRouter,
}

impl Gateway {
    pub fn new(policy: DuplicatePolicy) -> Self {
        let registry = Arc::new(StoreRegistry::new(policy));
        let router = RequestRouter::new(Arc::clone(&registry));
        Self { registry, router }
    }

    /// Build the gateway and mount every configured filesystem
    pub async fn from_config(config: &Config) -> Self {
        let gateway = Self::new(config.registry.on_duplicate);

        for mount in &config.mounts {
            match gateway.mount_config(mount).await {
                Ok(()) => logger::log_info(&format!(
                    "[Mount] {} ({}) mounted at {}",
                    mount.name,
                    mount.store.kind(),
                    mount.prefix
                )),
                Err(e) => logger::log_error(&format!(
                    "[Mount] Skipping '{}' at {}: {e}",
                    mount.name, mount.prefix
                )),
            }
        }

        if config.registry.mode == RegistrationMode::Static {
            gateway.registry.freeze();
        }
        logger::log_mounts(&gateway.registry.prefixes());
        gateway
    }

    pub const fn registry(&self) -> &Arc<StoreRegistry> {
        &self.registry
    }

    pub const fn router(&self) -> &RequestRouter {
        &self.router
    }

    /// Build the store of `definition` and bind it
    ///
    /// The prefix and method list are checked before the store is opened, so
    /// a rejected definition never creates its root directory.
    pub async fn mount_config(&self, definition: &MountConfig) -> Result<(), MountError> {
        if self.registry.is_frozen() {
            return Err(RegistryError::Frozen.into());
        }
        let prefix = Prefix::parse(&definition.prefix)?;
        let methods = definition
            .methods
            .as_deref()
            .map(ActionTable::parse_methods)
            .transpose()?;

        let store = build_store(&definition.store).await?;
        let mounted = match methods {
            Some(methods) => MountedStore::with_methods(&definition.name, store, &methods)?,
            None => MountedStore::new(&definition.name, store)?,
        };
        self.bind(prefix.as_str(), mounted)
    }

    /// Bind an already-built store with the standard pipelines
    pub fn mount(
        &self,
        prefix: &str,
        name: &str,
        store: Arc<dyn FileStore>,
    ) -> Result<(), MountError> {
        self.bind(prefix, MountedStore::new(name, store)?)
    }

    pub fn unmount(&self, prefix: &str) -> Result<(), MountError> {
        let removed = self.registry.unmount(prefix)?;
        logger::log_info(&format!("[Mount] {} unmounted from {prefix}", removed.name()));
        Ok(())
    }

    fn bind(&self, prefix: &str, mounted: MountedStore) -> Result<(), MountError> {
        if let Some(old) = self.registry.mount(prefix, Arc::new(mounted))? {
            logger::log_warning(&format!(
                "[Mount] {prefix} rebound, '{}' released once idle",
                old.name()
            ));
        }
        Ok(())
    }
}
