//! Store bound into the registry together with its pipelines

use hyper::Method;
use std::fmt;
use std::sync::Arc;

use crate::action::{ActionTable, PipelineError};
use crate::store::FileStore;

pub struct MountedStore {
    name: String,
    store: Arc<dyn FileStore>,
    actions: ActionTable,
}

impl MountedStore {
    /// Mount with the standard GET/HEAD/PUT pipelines
    pub fn new(name: impl Into<String>, store: Arc<dyn FileStore>) -> Result<Self, PipelineError> {
        let actions = ActionTable::standard(&store)?;
        Ok(Self {
            name: name.into(),
            store,
            actions,
        })
    }

    /// Mount serving only `methods`
    pub fn with_methods(
        name: impl Into<String>,
        store: Arc<dyn FileStore>,
        methods: &[Method],
    ) -> Result<Self, PipelineError> {
        let actions = ActionTable::for_methods(&store, methods)?;
        Ok(Self {
            name: name.into(),
            store,
            actions,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &Arc<dyn FileStore> {
        &self.store
    }

    pub const fn actions(&self) -> &ActionTable {
        &self.actions
    }
}

impl fmt::Debug for MountedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountedStore")
            .field("name", &self.name)
            .field("kind", &self.store.kind())
            .field("methods", &self.actions.methods())
            .finish()
    }
}
