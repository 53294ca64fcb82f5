//! Path action pipelines
//!
//! A pipeline is a short, validated list of steps bound to one store. It is
//! built once when a store is mounted and then shared by every request for
//! that (method, store) pair, so it holds no per-request state.

mod table;

use hyper::body::Bytes;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::router::RequestContext;
use crate::store::{empty_stream, ByteStream, FileStore, Handle, StoreError, StorePath};

pub use table::ActionTable;

/// Single step of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Resolve the path, short-circuit with `NotFound` when absent
    AssertExists,
    /// Produce the full content stream and its length
    ReturnContent,
    /// Produce only the length
    ReturnSizeOnly,
    /// Drain the request body into the store
    SaveContent,
}

impl Step {
    /// Steps that produce the pipeline's result
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::AssertExists)
    }

    const fn needs_handle(self) -> bool {
        matches!(self, Self::ReturnContent | Self::ReturnSizeOnly)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AssertExists => "AssertExists",
            Self::ReturnContent => "ReturnContent",
            Self::ReturnSizeOnly => "ReturnSizeOnly",
            Self::SaveContent => "SaveContent",
        };
        f.write_str(name)
    }
}

/// Outcome of running a pipeline
pub enum ActionResult {
    NotFound,
    Content {
        path: StorePath,
        length: u64,
        stream: ByteStream,
    },
    Size {
        path: StorePath,
        length: u64,
    },
    Written {
        bytes: u64,
    },
    Failure(StoreError),
}

impl ActionResult {
    fn from_error(err: StoreError) -> Self {
        if err.is_not_found() {
            Self::NotFound
        } else {
            Self::Failure(err)
        }
    }

    /// Payload length reported to the client
    pub const fn length(&self) -> Option<u64> {
        match self {
            Self::Content { length, .. } | Self::Size { length, .. } => Some(*length),
            Self::Written { bytes } => Some(*bytes),
            Self::NotFound | Self::Failure(_) => None,
        }
    }
}

impl fmt::Debug for ActionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("NotFound"),
            Self::Content { path, length, .. } => f
                .debug_struct("Content")
                .field("path", path)
                .field("length", length)
                .finish_non_exhaustive(),
            Self::Size { path, length } => f
                .debug_struct("Size")
                .field("path", path)
                .field("length", length)
                .finish(),
            Self::Written { bytes } => f.debug_struct("Written").field("bytes", bytes).finish(),
            Self::Failure(err) => f.debug_tuple("Failure").field(err).finish(),
        }
    }
}

/// Pipeline construction failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("pipeline has no steps")]
    Empty,
    #[error("pipeline must end with a content step")]
    MissingTerminal,
    #[error("{0} must be the last step")]
    TerminalNotLast(Step),
    #[error("{0} requires a preceding AssertExists")]
    MissingAssertExists(Step),
    #[error("unsupported method {0}")]
    UnsupportedMethod(String),
}

/// Fluent builder for [`PathAction`]
///
/// ```
/// use fsgate::action::PathActionBuilder;
/// use fsgate::store::{FileStore, MemoryStore};
/// use std::sync::Arc;
///
/// let store: Arc<dyn FileStore> = Arc::new(MemoryStore::new());
/// let get = PathActionBuilder::new()
///     .assert_exists()
///     .return_content()
///     .build(store)
///     .unwrap();
/// assert_eq!(get.steps().len(), 2);
/// ```
#[derive(Debug, Default, Clone)]
pub struct PathActionBuilder {
    steps: Vec<Step>,
}

impl PathActionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    #[must_use]
    pub fn assert_exists(self) -> Self {
        self.step(Step::AssertExists)
    }

    #[must_use]
    pub fn return_content(self) -> Self {
        self.step(Step::ReturnContent)
    }

    #[must_use]
    pub fn return_size_only(self) -> Self {
        self.step(Step::ReturnSizeOnly)
    }

    #[must_use]
    pub fn save_content(self) -> Self {
        self.step(Step::SaveContent)
    }

    /// Validate the step order and bind the pipeline to `store`
    pub fn build(self, store: Arc<dyn FileStore>) -> Result<PathAction, PipelineError> {
        let Some((last, init)) = self.steps.split_last() else {
            return Err(PipelineError::Empty);
        };
        if !last.is_terminal() {
            return Err(PipelineError::MissingTerminal);
        }
        if let Some(step) = init.iter().find(|s| s.is_terminal()) {
            return Err(PipelineError::TerminalNotLast(*step));
        }
        if last.needs_handle() && !init.contains(&Step::AssertExists) {
            return Err(PipelineError::MissingAssertExists(*last));
        }
        Ok(PathAction {
            steps: self.steps.into_boxed_slice(),
            store,
        })
    }
}

/// Immutable pipeline bound to one store
pub struct PathAction {
    steps: Box<[Step]>,
    store: Arc<dyn FileStore>,
}

impl PathAction {
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn store(&self) -> &Arc<dyn FileStore> {
        &self.store
    }

    /// Run the pipeline for one request
    ///
    /// `body` is only consumed by `SaveContent`; other pipelines drop it.
    pub async fn execute(&self, ctx: &RequestContext, body: ByteStream) -> ActionResult {
        let mut handle: Option<Handle> = None;
        let mut body = Some(body);

        for step in self.steps.iter() {
            match step {
                Step::AssertExists => match self.store.resolve(ctx.relative()).await {
                    Ok(h) => handle = Some(h),
                    Err(e) => return ActionResult::from_error(e),
                },
                Step::ReturnContent => {
                    let Some(h) = handle.take() else {
                        return ActionResult::NotFound;
                    };
                    let length = self.store.size(&h);
                    let path = h.path().clone();
                    return match self.store.read(h).await {
                        Ok(stream) => ActionResult::Content {
                            path,
                            length,
                            stream,
                        },
                        Err(e) => ActionResult::from_error(e),
                    };
                }
                Step::ReturnSizeOnly => {
                    let Some(h) = handle.take() else {
                        return ActionResult::NotFound;
                    };
                    let length = self.store.size(&h);
                    let path = h.path().clone();
                    drop(h);
                    return ActionResult::Size { path, length };
                }
                Step::SaveContent => {
                    let body = body.take().unwrap_or_else(empty_stream);
                    return match self.store.write(ctx.relative(), body).await {
                        Ok(bytes) => ActionResult::Written { bytes },
                        Err(e) => ActionResult::from_error(e),
                    };
                }
            }
        }

        // Built pipelines always end in a terminal step.
        ActionResult::NotFound
    }
}

impl fmt::Debug for PathAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathAction")
            .field("steps", &self.steps)
            .field("store", &self.store.kind())
            .finish()
    }
}

/// Drain an action result's stream into memory (tests and small payloads)
pub async fn collect_content(result: ActionResult) -> Option<Bytes> {
    use futures_util::TryStreamExt;
    match result {
        ActionResult::Content { stream, .. } => {
            let chunks: Vec<Bytes> = stream.try_collect().await.ok()?;
            Some(Bytes::from(chunks.concat()))
        }
        _ => None,
    }
}
