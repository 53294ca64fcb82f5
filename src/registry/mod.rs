//! Store registry
//!
//! Maps URL prefixes to mounted stores and resolves request paths by longest
//! matching prefix.
//!
//! The mount table is an immutable snapshot behind `RwLock<Arc<_>>`:
//! - `resolve` takes the read lock only long enough to clone the `Arc`,
//!   so concurrent lookups never wait on each other
//! - `mount`/`unmount` build a new table and swap it in under the write lock,
//!   which also serializes registrations
//! - a replaced store stays alive until the last in-flight request that
//!   resolved to it drops its `Arc`

mod prefix;

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

use crate::mount::MountedStore;

pub use prefix::Prefix;

/// What `mount` does when the prefix is already bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Refuse the new binding with `DuplicatePrefix`
    #[default]
    Reject,
    /// Swap the new store in, releasing the old one once idle
    Replace,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("prefix {0} is already mounted")]
    DuplicatePrefix(String),
    #[error("invalid prefix {prefix:?}: {reason}")]
    InvalidPrefix { prefix: String, reason: String },
    #[error("registry is frozen, mounts are only accepted at startup")]
    Frozen,
    #[error("prefix {0} is not mounted")]
    NotMounted(String),
}

/// Successful lookup: the bound store and the path relative to it
#[derive(Debug, Clone)]
pub struct Resolution {
    pub prefix: Prefix,
    pub relative: String,
    pub mount: Arc<MountedStore>,
}

#[derive(Debug, Clone)]
struct Binding {
    prefix: Prefix,
    mount: Arc<MountedStore>,
}

/// Bindings ordered longest prefix first
type MountTable = Vec<Binding>;

#[derive(Debug)]
pub struct StoreRegistry {
    table: RwLock<Arc<MountTable>>,
    policy: DuplicatePolicy,
    frozen: AtomicBool,
}

impl StoreRegistry {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            table: RwLock::new(Arc::new(Vec::new())),
            policy,
            frozen: AtomicBool::new(false),
        }
    }

    pub const fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Bind `mount` under `prefix`
    ///
    /// Returns the store previously bound there when the policy replaced it.
    pub fn mount(
        &self,
        prefix: &str,
        mount: Arc<MountedStore>,
    ) -> Result<Option<Arc<MountedStore>>, RegistryError> {
        let prefix = Prefix::parse(prefix)?;
        let mut guard = self.table.write().unwrap_or_else(PoisonError::into_inner);
        if self.is_frozen() {
            return Err(RegistryError::Frozen);
        }

        let mut next: MountTable = guard.as_ref().clone();
        let replaced = match next.iter_mut().find(|b| b.prefix == prefix) {
            Some(_) if self.policy == DuplicatePolicy::Reject => {
                return Err(RegistryError::DuplicatePrefix(prefix.to_string()));
            }
            Some(binding) => Some(std::mem::replace(&mut binding.mount, mount)),
            None => {
                next.push(Binding { prefix, mount });
                None
            }
        };
        next.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()).then_with(|| a.prefix.cmp(&b.prefix)));

        *guard = Arc::new(next);
        Ok(replaced)
    }

    /// Remove the binding at `prefix`, returning the store that was bound
    pub fn unmount(&self, prefix: &str) -> Result<Arc<MountedStore>, RegistryError> {
        let prefix = Prefix::parse(prefix)?;
        let mut guard = self.table.write().unwrap_or_else(PoisonError::into_inner);
        if self.is_frozen() {
            return Err(RegistryError::Frozen);
        }

        let mut next: MountTable = guard.as_ref().clone();
        let Some(index) = next.iter().position(|b| b.prefix == prefix) else {
            return Err(RegistryError::NotMounted(prefix.to_string()));
        };
        let removed = next.remove(index);
        *guard = Arc::new(next);
        Ok(removed.mount)
    }

    /// Longest registered prefix matching `path`, or `None` when unmounted
    pub fn resolve(&self, path: &str) -> Option<Resolution> {
        let table = self.snapshot();
        table.iter().find_map(|binding| {
            binding.prefix.strip(path).map(|relative| Resolution {
                prefix: binding.prefix.clone(),
                relative: relative.to_string(),
                mount: Arc::clone(&binding.mount),
            })
        })
    }

    /// Mounted prefixes, case-insensitive lexical order
    pub fn prefixes(&self) -> Vec<String> {
        let mut prefixes: Vec<String> = self
            .snapshot()
            .iter()
            .map(|b| b.prefix.to_string())
            .collect();
        prefixes.sort_by_key(|p| p.to_lowercase());
        prefixes
    }

    /// Bindings in the same order as `prefixes`
    pub fn mounts(&self) -> Vec<(Prefix, Arc<MountedStore>)> {
        let mut mounts: Vec<(Prefix, Arc<MountedStore>)> = self
            .snapshot()
            .iter()
            .map(|b| (b.prefix.clone(), Arc::clone(&b.mount)))
            .collect();
        mounts.sort_by_key(|(p, _)| p.as_str().to_lowercase());
        mounts
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Refuse any further `mount`/`unmount`
    pub fn freeze(&self) {
        let _guard = self.table.write().unwrap_or_else(PoisonError::into_inner);
        self.frozen.store(true, Ordering::SeqCst);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    fn snapshot(&self) -> Arc<MountTable> {
        Arc::clone(&self.table.read().unwrap_or_else(PoisonError::into_inner))
    }
}
