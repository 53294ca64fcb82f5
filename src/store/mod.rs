//! File store module
//!
//! Defines the `FileStore` capability shared by every storage backend:
//! - `resolve` maps a store-relative path to a `Handle` without reading content
//! - `size` answers from metadata captured at resolve time
//! - `read` turns a handle into a lazy byte stream
//! - `write` creates or overwrites content from a byte stream

mod error;
pub mod factory;
pub mod local;
pub mod memory;
pub mod path;

use async_trait::async_trait;
use futures_util::Stream;
use hyper::body::Bytes;
use std::fmt;
use std::io;
use std::pin::Pin;

pub use error::StoreError;
pub use factory::{build_store, StoreConfig};
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use path::{PathError, StorePath};

/// Lazy, finite, single-pass sequence of byte chunks.
///
/// Dropping the stream releases whatever resource backs it.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + 'static>>;

/// Stream that yields nothing
pub fn empty_stream() -> ByteStream {
    Box::pin(futures_util::stream::empty())
}

/// Stream yielding a single chunk
pub fn once_stream(data: impl Into<Bytes>) -> ByteStream {
    let data = data.into();
    Box::pin(futures_util::stream::once(async move { Ok(data) }))
}

/// Resolved entry inside a store.
///
/// Holds the normalized path, the size observed at resolve time and the
/// not-yet-polled content stream. A handle that is dropped without being read
/// releases its resource immediately.
pub struct Handle {
    path: StorePath,
    size: u64,
    content: ByteStream,
}

impl Handle {
    pub fn new(path: StorePath, size: u64, content: ByteStream) -> Self {
        Self {
            path,
            size,
            content,
        }
    }

    pub const fn path(&self) -> &StorePath {
        &self.path
    }

    pub const fn size(&self) -> u64 {
        self.size
    }

    pub fn into_stream(self) -> ByteStream {
        self.content
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("path", &self.path)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Storage backend capability
///
/// Relative paths are raw strings as cut out of the request URL. Every
/// implementation must parse them with [`StorePath::parse`] so traversal
/// attempts are rejected with `AccessDenied` before touching the medium.
#[async_trait]
pub trait FileStore: Send + Sync + 'static {
    /// Short backend name for logs and the admin API
    fn kind(&self) -> &'static str;

    /// Whether `write` is refused by this store
    fn is_read_only(&self) -> bool {
        false
    }

    /// Locate an entry without reading its content
    async fn resolve(&self, relative: &str) -> Result<Handle, StoreError>;

    /// Size of a resolved entry in bytes
    fn size(&self, handle: &Handle) -> u64 {
        handle.size()
    }

    /// Open the content of a resolved entry
    async fn read(&self, handle: Handle) -> Result<ByteStream, StoreError> {
        Ok(handle.into_stream())
    }

    /// Create or overwrite the entry at `relative`, returning bytes written
    async fn write(&self, relative: &str, content: ByteStream) -> Result<u64, StoreError>;
}
