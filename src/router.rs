//! Request router
//!
//! Drives one request through `Received → Resolved → Dispatched` and ends in
//! `Completed` (a pipeline ran) or `Failed` (no mount, or no pipeline for the
//! method). The router never retries: one lookup, one pipeline run.

use hyper::{Method, StatusCode};
use std::fmt;
use std::sync::Arc;

use crate::action::ActionResult;
use crate::logger;
use crate::mount::MountedStore;
use crate::registry::{Prefix, StoreRegistry};
use crate::store::{ByteStream, StoreError};

/// Per-request state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteState {
    Received,
    Resolved,
    Dispatched,
    Completed,
    Failed,
}

impl fmt::Display for RouteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Resolved => "resolved",
            Self::Dispatched => "dispatched",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Everything known about a request once its mount is resolved
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    raw_path: String,
    prefix: Prefix,
    relative: String,
    mount: Arc<MountedStore>,
}

impl RequestContext {
    pub fn new(
        method: Method,
        raw_path: String,
        prefix: Prefix,
        relative: String,
        mount: Arc<MountedStore>,
    ) -> Self {
        Self {
            method,
            raw_path,
            prefix,
            relative,
            mount,
        }
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    pub const fn prefix(&self) -> &Prefix {
        &self.prefix
    }

    pub fn relative(&self) -> &str {
        &self.relative
    }

    pub const fn mount(&self) -> &Arc<MountedStore> {
        &self.mount
    }
}

/// Final outcome of routing one request
#[derive(Debug)]
pub enum Outcome {
    /// No prefix matched the path
    Unmounted,
    /// The mount has no pipeline for the method
    MethodNotAllowed { allow: String },
    /// A pipeline ran
    Action(ActionResult),
}

impl Outcome {
    /// HTTP status for this outcome
    ///
    /// Unmounted paths and missing entries both map to 404 so clients cannot
    /// tell them apart.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unmounted | Self::Action(ActionResult::NotFound) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Action(ActionResult::Content { .. } | ActionResult::Size { .. }) => {
                StatusCode::OK
            }
            Self::Action(ActionResult::Written { .. }) => StatusCode::CREATED,
            Self::Action(ActionResult::Failure(StoreError::AccessDenied(_))) => {
                StatusCode::FORBIDDEN
            }
            Self::Action(ActionResult::Failure(StoreError::NotFound(_))) => StatusCode::NOT_FOUND,
            Self::Action(ActionResult::Failure(StoreError::Io(_))) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Result of [`RequestRouter::route`]
#[derive(Debug)]
pub struct Routed {
    pub state: RouteState,
    pub context: Option<RequestContext>,
    pub outcome: Outcome,
}

impl Routed {
    pub const fn status(&self) -> StatusCode {
        self.outcome.status()
    }
}

#[derive(Debug, Clone)]
pub struct RequestRouter {
    registry: Arc<StoreRegistry>,
}

impl RequestRouter {
    pub const fn new(registry: Arc<StoreRegistry>) -> Self {
        Self { registry }
    }

    pub const fn registry(&self) -> &Arc<StoreRegistry> {
        &self.registry
    }

    /// Route one request
    ///
    /// `path` is the decoded URL path. `body` is consumed only by PUT
    /// pipelines and dropped otherwise.
    pub async fn route(&self, method: &Method, path: &str, body: ByteStream) -> Routed {
        let mut state = RouteState::Received;

        let Some(resolution) = self.registry.resolve(path) else {
            advance(&mut state, RouteState::Failed, method, path);
            logger::log_debug(&format!("[Route] {method} {path}: no mount for path"));
            return Routed {
                state,
                context: None,
                outcome: Outcome::Unmounted,
            };
        };
        advance(&mut state, RouteState::Resolved, method, path);

        let ctx = RequestContext::new(
            method.clone(),
            path.to_string(),
            resolution.prefix,
            resolution.relative,
            resolution.mount,
        );

        let Some(action) = ctx.mount().actions().get(method).map(Arc::clone) else {
            advance(&mut state, RouteState::Failed, method, path);
            logger::log_debug(&format!(
                "[Route] {method} {path}: method not allowed on {}",
                ctx.prefix()
            ));
            let allow = ctx.mount().actions().allow_header();
            return Routed {
                state,
                context: Some(ctx),
                outcome: Outcome::MethodNotAllowed { allow },
            };
        };
        advance(&mut state, RouteState::Dispatched, method, path);

        let result = action.execute(&ctx, body).await;
        match &result {
            ActionResult::NotFound => logger::log_debug(&format!(
                "[Route] {method} {path}: not found in store '{}'",
                ctx.mount().name()
            )),
            ActionResult::Failure(StoreError::AccessDenied(reason)) => logger::log_warning(
                &format!("{method} {path}: access denied: {reason}"),
            ),
            ActionResult::Failure(err) => {
                logger::log_error(&format!(
                    "{method} {path}: store '{}' failed: {err}",
                    ctx.mount().name()
                ));
            }
            _ => {}
        }
        advance(&mut state, RouteState::Completed, method, path);

        Routed {
            state,
            context: Some(ctx),
            outcome: Outcome::Action(result),
        }
    }
}

fn advance(state: &mut RouteState, next: RouteState, method: &Method, path: &str) {
    logger::log_debug(&format!("[Route] {method} {path}: {state} -> {next}"));
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::collect_content;
    use crate::registry::DuplicatePolicy;
    use crate::store::{empty_stream, once_stream, FileStore, LocalStore, MemoryStore};
    use hyper::body::Bytes;

    fn router_with(mounts: &[(&str, Arc<dyn FileStore>)]) -> RequestRouter {
        let registry = Arc::new(StoreRegistry::new(DuplicatePolicy::Reject));
        for (prefix, store) in mounts {
            let mount = MountedStore::new(*prefix, Arc::clone(store)).unwrap();
            registry.mount(prefix, Arc::new(mount)).unwrap();
        }
        RequestRouter::new(registry)
    }

    #[tokio::test]
    async fn test_example_scenario() {
        let local1: Arc<dyn FileStore> = Arc::new(MemoryStore::new());
        let router = router_with(&[("/files", local1)]);

        let put = router
            .route(&Method::PUT, "/files/a.txt", once_stream("hello"))
            .await;
        assert_eq!(put.state, RouteState::Completed);
        assert_eq!(put.status(), StatusCode::CREATED);
        assert!(matches!(put.outcome, Outcome::Action(ActionResult::Written { bytes: 5 })));

        let head = router.route(&Method::HEAD, "/files/a.txt", empty_stream()).await;
        assert_eq!(head.status(), StatusCode::OK);
        let Outcome::Action(head_result) = head.outcome else {
            panic!("expected action outcome");
        };
        assert_eq!(head_result.length(), Some(5));

        let get = router.route(&Method::GET, "/files/a.txt", empty_stream()).await;
        assert_eq!(get.status(), StatusCode::OK);
        let ctx = get.context.as_ref().unwrap();
        assert_eq!(ctx.prefix().as_str(), "/files");
        assert_eq!(ctx.relative(), "a.txt");
        assert_eq!(ctx.raw_path(), "/files/a.txt");
        let Outcome::Action(get_result) = get.outcome else {
            panic!("expected action outcome");
        };
        assert_eq!(get_result.length(), Some(5));
        assert_eq!(collect_content(get_result).await.unwrap(), Bytes::from("hello"));

        let missing = router.route(&Method::GET, "/files/missing.txt", empty_stream()).await;
        assert_eq!(missing.state, RouteState::Completed);
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let other = router.route(&Method::GET, "/other/a.txt", empty_stream()).await;
        assert_eq!(other.state, RouteState::Failed);
        assert!(other.context.is_none());
        assert_eq!(other.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let store: Arc<dyn FileStore> = Arc::new(MemoryStore::new());
        let registry = Arc::new(StoreRegistry::new(DuplicatePolicy::Reject));
        let mount = MountedStore::with_methods("get-only", store, &[Method::GET, Method::HEAD])
            .unwrap();
        registry.mount("/ro", Arc::new(mount)).unwrap();
        let router = RequestRouter::new(registry);

        let routed = router.route(&Method::PUT, "/ro/a.txt", once_stream("y")).await;
        assert_eq!(routed.state, RouteState::Failed);
        assert_eq!(routed.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(matches!(
            routed.outcome,
            Outcome::MethodNotAllowed { ref allow } if allow == "GET, HEAD"
        ));

        let routed = router.route(&Method::DELETE, "/ro/a.txt", empty_stream()).await;
        assert_eq!(routed.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_read_only_store_put_is_forbidden() {
        let store: Arc<dyn FileStore> =
            Arc::new(MemoryStore::read_only([("a.txt", "x")]).unwrap());
        let router = router_with(&[("/ro", Arc::clone(&store))]);

        for path in ["/ro/a.txt", "/ro/new.txt", "/ro/../../secret"] {
            let routed = router.route(&Method::PUT, path, once_stream("y")).await;
            assert_eq!(routed.state, RouteState::Completed, "{path}");
            assert_eq!(routed.status(), StatusCode::FORBIDDEN, "{path}");
        }

        let handle = store.resolve("a.txt").await.unwrap();
        assert_eq!(handle.size(), 1);
        assert!(store.resolve("new.txt").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_traversal_forbidden_for_every_method() {
        let store: Arc<dyn FileStore> = Arc::new(MemoryStore::new());
        let router = router_with(&[("/files", store)]);

        for method in [Method::GET, Method::HEAD, Method::PUT] {
            let routed = router
                .route(&method, "/files/../../secret", once_stream("x"))
                .await;
            assert_eq!(routed.status(), StatusCode::FORBIDDEN, "{method}");
        }
    }

    #[tokio::test]
    async fn test_path_below_a_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
        let store: Arc<dyn FileStore> =
            Arc::new(LocalStore::open(dir.path(), false, false).await.unwrap());
        let router = router_with(&[("/files", store)]);

        for method in [Method::GET, Method::HEAD] {
            let routed = router.route(&method, "/files/a.txt/x", empty_stream()).await;
            assert_eq!(routed.state, RouteState::Completed, "{method}");
            assert_eq!(routed.status(), StatusCode::NOT_FOUND, "{method}");
        }
    }

    #[tokio::test]
    async fn test_no_cross_talk() {
        let a: Arc<dyn FileStore> = Arc::new(MemoryStore::new());
        let b: Arc<dyn FileStore> = Arc::new(MemoryStore::new());
        let router = router_with(&[("/a", Arc::clone(&a)), ("/a/b", Arc::clone(&b))]);

        router.route(&Method::PUT, "/a/b/file", once_stream("in b")).await;
        router.route(&Method::PUT, "/a/file", once_stream("in a")).await;

        assert!(b.resolve("file").await.is_ok());
        assert!(a.resolve("file").await.is_ok());
        assert!(a.resolve("b/file").await.unwrap_err().is_not_found());

        let get = router.route(&Method::GET, "/a/b/file", empty_stream()).await;
        assert_eq!(get.context.as_ref().unwrap().prefix().as_str(), "/a/b");
        let Outcome::Action(result) = get.outcome else {
            panic!("expected action outcome");
        };
        assert_eq!(collect_content(result).await.unwrap(), Bytes::from("in b"));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(Outcome::Unmounted.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            Outcome::Action(ActionResult::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Outcome::Action(ActionResult::Failure(StoreError::Io(std::io::Error::other("x"))))
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Outcome::Action(ActionResult::Failure(StoreError::AccessDenied("x".into()))).status(),
            StatusCode::FORBIDDEN
        );
    }
}
