//! In-memory store
//!
//! Entries live in a map of immutable `Bytes`. A write buffers the whole body
//! and swaps the entry in one step, so writes are all-or-nothing and readers
//! hold on to the snapshot they resolved.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use hyper::body::Bytes;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::{once_stream, ByteStream, FileStore, Handle, StoreError, StorePath};

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<StorePath, Bytes>>,
    read_only: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that refuses writes, serving only the given entries
    pub fn read_only<I, K, V>(entries: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Bytes>,
    {
        let mut map = HashMap::new();
        for (key, value) in entries {
            map.insert(StorePath::parse(key.as_ref())?, value.into());
        }
        Ok(Self {
            entries: RwLock::new(map),
            read_only: true,
        })
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    async fn resolve(&self, relative: &str) -> Result<Handle, StoreError> {
        let path = StorePath::parse(relative)?;
        let data = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        let size = data.len() as u64;
        Ok(Handle::new(path, size, once_stream(data)))
    }

    async fn write(&self, relative: &str, content: ByteStream) -> Result<u64, StoreError> {
        if self.read_only {
            return Err(StoreError::read_only(self.kind()));
        }
        let path = StorePath::parse(relative)?;
        if path.is_root() {
            return Err(StoreError::AccessDenied(
                "cannot write to the store root".to_string(),
            ));
        }

        let chunks: Vec<Bytes> = content.try_collect().await.map_err(StoreError::Io)?;
        let data = Bytes::from(chunks.concat());
        let written = data.len() as u64;

        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, data);
        Ok(written)
    }
}
