//! Store construction from configuration blocks

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{FileStore, LocalStore, MemoryStore, StoreError};

/// Store-specific parameters of a mount definition
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Directory on local disk
    Local {
        root: String,
        #[serde(default)]
        read_only: bool,
        /// Create the root directory when missing
        #[serde(default)]
        create: bool,
    },
    /// Volatile in-memory store
    Memory {
        #[serde(default)]
        read_only: bool,
    },
}

impl StoreConfig {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Local { .. } => "local",
            Self::Memory { .. } => "memory",
        }
    }
}

/// Build the store described by `config`
pub async fn build_store(config: &StoreConfig) -> Result<Arc<dyn FileStore>, StoreError> {
    match config {
        StoreConfig::Local {
            root,
            read_only,
            create,
        } => Ok(Arc::new(LocalStore::open(root, *create, *read_only).await?)),
        StoreConfig::Memory { read_only: false } => Ok(Arc::new(MemoryStore::new())),
        StoreConfig::Memory { read_only: true } => Ok(Arc::new(MemoryStore::read_only(
            Vec::<(String, hyper::body::Bytes)>::new(),
        )?)),
    }
}
