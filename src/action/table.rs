//! Method to pipeline mapping for one store

use hyper::Method;
use std::sync::Arc;

use super::{PathAction, PathActionBuilder, PipelineError};
use crate::store::FileStore;

/// Pipelines registered for one store, at most one per method
#[derive(Debug)]
pub struct ActionTable {
    actions: Vec<(Method, Arc<PathAction>)>,
}

impl ActionTable {
    /// GET, HEAD and PUT; a read-only store refuses the write itself
    pub fn standard(store: &Arc<dyn FileStore>) -> Result<Self, PipelineError> {
        Self::for_methods(store, &[Method::GET, Method::HEAD, Method::PUT])
    }

    /// Table restricted to `methods`
    pub fn for_methods(
        store: &Arc<dyn FileStore>,
        methods: &[Method],
    ) -> Result<Self, PipelineError> {
        let mut actions: Vec<(Method, Arc<PathAction>)> = Vec::with_capacity(methods.len());
        for method in methods {
            if actions.iter().any(|(m, _)| m == method) {
                continue;
            }
            let action = Self::pipeline_for(method, Arc::clone(store))?;
            actions.push((method.clone(), Arc::new(action)));
        }
        Ok(Self { actions })
    }

    /// The pipeline each supported method runs
    pub fn pipeline_for(
        method: &Method,
        store: Arc<dyn FileStore>,
    ) -> Result<PathAction, PipelineError> {
        let builder = match *method {
            Method::GET => PathActionBuilder::new().assert_exists().return_content(),
            Method::HEAD => PathActionBuilder::new().assert_exists().return_size_only(),
            Method::PUT => PathActionBuilder::new().save_content(),
            _ => return Err(PipelineError::UnsupportedMethod(method.to_string())),
        };
        builder.build(store)
    }

    /// Parse method names from configuration (case-insensitive)
    pub fn parse_methods<S: AsRef<str>>(names: &[S]) -> Result<Vec<Method>, PipelineError> {
        names
            .iter()
            .map(|name| {
                let upper = name.as_ref().trim().to_ascii_uppercase();
                match Method::from_bytes(upper.as_bytes()) {
                    Ok(m) if matches!(m, Method::GET | Method::HEAD | Method::PUT) => Ok(m),
                    _ => Err(PipelineError::UnsupportedMethod(name.as_ref().to_string())),
                }
            })
            .collect()
    }

    pub fn get(&self, method: &Method) -> Option<&Arc<PathAction>> {
        self.actions
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, action)| action)
    }

    /// Methods with a registered pipeline, in registration order
    pub fn methods(&self) -> Vec<Method> {
        self.actions.iter().map(|(m, _)| m.clone()).collect()
    }

    /// Value for an `Allow` header
    pub fn allow_header(&self) -> String {
        self.actions
            .iter()
            .map(|(m, _)| m.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Step;
    use crate::store::MemoryStore;
    use hyper::body::Bytes;

    #[test]
    fn test_standard_table() {
        let store: Arc<dyn FileStore> = Arc::new(MemoryStore::new());
        let table = ActionTable::standard(&store).unwrap();
        assert_eq!(table.methods(), vec![Method::GET, Method::HEAD, Method::PUT]);
        assert_eq!(table.allow_header(), "GET, HEAD, PUT");
        assert_eq!(
            table.get(&Method::GET).unwrap().steps(),
            &[Step::AssertExists, Step::ReturnContent]
        );
        assert_eq!(
            table.get(&Method::HEAD).unwrap().steps(),
            &[Step::AssertExists, Step::ReturnSizeOnly]
        );
        assert_eq!(table.get(&Method::PUT).unwrap().steps(), &[Step::SaveContent]);
        assert!(table.get(&Method::DELETE).is_none());
    }

    #[test]
    fn test_read_only_store_keeps_put() {
        let store: Arc<dyn FileStore> =
            Arc::new(MemoryStore::read_only(Vec::<(String, Bytes)>::new()).unwrap());
        let table = ActionTable::standard(&store).unwrap();
        assert_eq!(table.methods(), vec![Method::GET, Method::HEAD, Method::PUT]);
        assert!(ActionTable::for_methods(&store, &[Method::PUT]).is_ok());
    }

    #[test]
    fn test_restricted_methods() {
        let store: Arc<dyn FileStore> = Arc::new(MemoryStore::new());
        let table = ActionTable::for_methods(&store, &[Method::GET, Method::GET]).unwrap();
        assert_eq!(table.methods(), vec![Method::GET]);
        assert!(table.get(&Method::HEAD).is_none());
    }

    #[test]
    fn test_parse_methods() {
        assert_eq!(
            ActionTable::parse_methods(&["get", " HEAD "]).unwrap(),
            vec![Method::GET, Method::HEAD]
        );
        assert_eq!(
            ActionTable::parse_methods(&["DELETE"]).unwrap_err(),
            PipelineError::UnsupportedMethod("DELETE".to_string())
        );
        assert!(ActionTable::for_methods(
            &(Arc::new(MemoryStore::new()) as Arc<dyn FileStore>),
            &[Method::POST]
        )
        .is_err());
    }
}
