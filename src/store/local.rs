//! Local disk store
//!
//! Serves files below a root directory.
//!
//! Writes are all-or-nothing: content is streamed into a temporary file in the
//! target directory, synced, then renamed over the target. Readers that already
//! opened the old file keep reading the old inode to the end, so a concurrent
//! GET sees either the previous or the new content, never a mix. On failure the
//! temporary file is removed and the target is untouched.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use hyper::body::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::{ByteStream, FileStore, Handle, StoreError, StorePath};
use crate::logger;

const READ_CHUNK_SIZE: usize = 64 * 1024;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug)]
pub struct LocalStore {
    root: PathBuf,
    read_only: bool,
}

impl LocalStore {
    /// Open a store rooted at `root`, creating the directory when `create` is set
    pub async fn open(
        root: impl AsRef<Path>,
        create: bool,
        read_only: bool,
    ) -> Result<Self, StoreError> {
        let root = root.as_ref();
        if create {
            fs::create_dir_all(root).await?;
        }
        let canonical = fs::canonicalize(root).await.map_err(|e| {
            StoreError::Io(io::Error::new(
                e.kind(),
                format!("store root '{}': {e}", root.display()),
            ))
        })?;
        if !fs::metadata(&canonical).await?.is_dir() {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("store root '{}' is not a directory", canonical.display()),
            )));
        }
        Ok(Self {
            root: canonical,
            read_only,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical location of `path`, refusing anything that lands outside the root
    async fn confine(&self, path: &StorePath) -> Result<PathBuf, StoreError> {
        let candidate = path.to_fs_path(&self.root);
        let canonical = fs::canonicalize(&candidate).await?;
        if canonical.starts_with(&self.root) {
            Ok(canonical)
        } else {
            logger::log_warning(&format!(
                "Path traversal attempt blocked: {path} -> {}",
                canonical.display()
            ));
            Err(StoreError::AccessDenied(format!("{path} escapes store root")))
        }
    }

    /// Create the directories above `path` one segment at a time
    ///
    /// Each level is canonicalized before the next one is created, so a link
    /// pointing out of the root is refused before anything is made behind it.
    async fn prepare_parent(&self, path: &StorePath) -> Result<PathBuf, StoreError> {
        let segments = path.segments();
        let mut dir = self.root.clone();
        for segment in &segments[..segments.len().saturating_sub(1)] {
            let next = dir.join(segment);
            match fs::create_dir(&next).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }
            let canonical = fs::canonicalize(&next).await?;
            if !canonical.starts_with(&self.root) {
                logger::log_warning(&format!(
                    "Path traversal attempt blocked: {path} -> {}",
                    canonical.display()
                ));
                return Err(StoreError::AccessDenied(format!("{path} escapes store root")));
            }
            dir = canonical;
        }
        Ok(dir)
    }

    fn temp_path(dir: &Path, file_name: &str) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        dir.join(format!(".{file_name}.{}.{n}.tmp", std::process::id()))
    }
}

#[async_trait]
impl FileStore for LocalStore {
    fn kind(&self) -> &'static str {
        "local"
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    async fn resolve(&self, relative: &str) -> Result<Handle, StoreError> {
        let path = StorePath::parse(relative)?;
        if path.is_root() {
            return Err(StoreError::NotFound(path.to_string()));
        }
        let location = self.confine(&path).await?;

        // Size comes from the opened descriptor so it always matches the
        // content later streamed from it.
        let file = File::open(&location).await?;
        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Err(StoreError::NotFound(path.to_string()));
        }
        let size = meta.len();
        Ok(Handle::new(path, size, file_stream(file, size)))
    }

    async fn write(&self, relative: &str, content: ByteStream) -> Result<u64, StoreError> {
        if self.read_only {
            return Err(StoreError::read_only(self.kind()));
        }
        let path = StorePath::parse(relative)?;
        let Some(file_name) = path.file_name() else {
            return Err(StoreError::AccessDenied(
                "cannot write to the store root".to_string(),
            ));
        };

        let parent = self.prepare_parent(&path).await?;
        let target = parent.join(file_name);

        let temp = Self::temp_path(&parent, file_name);
        match write_temp(&temp, content).await {
            Ok(written) => {
                if let Err(e) = fs::rename(&temp, &target).await {
                    let _ = fs::remove_file(&temp).await;
                    return Err(e.into());
                }
                Ok(written)
            }
            Err(e) => {
                let _ = fs::remove_file(&temp).await;
                Err(e)
            }
        }
    }
}

async fn write_temp(temp: &Path, mut content: ByteStream) -> Result<u64, StoreError> {
    let mut file = File::create(temp).await?;
    let mut written = 0u64;
    while let Some(chunk) = content.try_next().await.map_err(StoreError::Io)? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

/// Stream exactly `len` bytes from `file` in fixed-size chunks
fn file_stream(file: File, len: u64) -> ByteStream {
    Box::pin(futures_util::stream::try_unfold(
        (file, len),
        |(mut file, remaining)| async move {
            if remaining == 0 {
                return Ok(None);
            }
            let want = usize::try_from(remaining).map_or(READ_CHUNK_SIZE, |r| r.min(READ_CHUNK_SIZE));
            let mut buf = vec![0u8; want];
            let n = file.read(&mut buf).await?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "file truncated while streaming",
                ));
            }
            buf.truncate(n);
            Ok(Some((Bytes::from(buf), (file, remaining - n as u64))))
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::once_stream;
    use tempfile::tempdir;

    async fn collect(stream: ByteStream) -> Vec<u8> {
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
        chunks.concat()
    }

    #[tokio::test]
    async fn test_write_then_resolve_and_read() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path(), false, false).await.unwrap();

        let written = store.write("a.txt", once_stream("hello")).await.unwrap();
        assert_eq!(written, 5);

        let handle = store.resolve("a.txt").await.unwrap();
        assert_eq!(store.size(&handle), 5);
        let body = collect(store.read(handle).await.unwrap()).await;
        assert_eq!(body, b"hello");
    }

    #[tokio::test]
    async fn test_write_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path(), false, false).await.unwrap();
        store
            .write("deep/nested/file.bin", once_stream(vec![1u8, 2, 3]))
            .await
            .unwrap();
        assert_eq!(
            std::fs::read(dir.path().join("deep/nested/file.bin")).unwrap(),
            vec![1u8, 2, 3]
        );
    }

    #[tokio::test]
    async fn test_large_file_streams_in_chunks() {
        let dir = tempdir().unwrap();
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(dir.path().join("big.bin"), &data).unwrap();
        let store = LocalStore::open(dir.path(), false, true).await.unwrap();

        let handle = store.resolve("big.bin").await.unwrap();
        assert_eq!(handle.size(), data.len() as u64);
        let chunks: Vec<Bytes> = store.read(handle).await.unwrap().try_collect().await.unwrap();
        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), data);
    }

    #[tokio::test]
    async fn test_missing_and_directory_are_not_found() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let store = LocalStore::open(dir.path(), false, false).await.unwrap();

        assert!(store.resolve("missing.txt").await.unwrap_err().is_not_found());
        assert!(store.resolve("sub").await.unwrap_err().is_not_found());
        assert!(store.resolve("").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_traversal_is_access_denied() {
        let outer = tempdir().unwrap();
        std::fs::write(outer.path().join("secret"), "top secret").unwrap();
        let root = outer.path().join("root");
        let store = LocalStore::open(&root, true, false).await.unwrap();

        let err = store.resolve("../secret").await.unwrap_err();
        assert!(matches!(err, StoreError::AccessDenied(_)));
        let err = store.write("../secret", once_stream("x")).await.unwrap_err();
        assert!(matches!(err, StoreError::AccessDenied(_)));
        assert_eq!(
            std::fs::read_to_string(outer.path().join("secret")).unwrap(),
            "top secret"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_is_access_denied() {
        let outer = tempdir().unwrap();
        std::fs::write(outer.path().join("secret"), "top secret").unwrap();
        let root = outer.path().join("root");
        std::fs::create_dir(&root).unwrap();
        std::os::unix::fs::symlink(outer.path().join("secret"), root.join("link")).unwrap();
        let store = LocalStore::open(&root, false, false).await.unwrap();

        let err = store.resolve("link").await.unwrap_err();
        assert!(matches!(err, StoreError::AccessDenied(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_on_write_creates_nothing_outside() {
        let outer = tempdir().unwrap();
        let outside = outer.path().join("outside");
        std::fs::create_dir(&outside).unwrap();
        let root = outer.path().join("root");
        std::fs::create_dir(&root).unwrap();
        std::os::unix::fs::symlink(&outside, root.join("link")).unwrap();
        let store = LocalStore::open(&root, false, false).await.unwrap();

        for relative in ["link/x.txt", "link/new/deep/x.txt"] {
            let err = store.write(relative, once_stream("x")).await.unwrap_err();
            assert!(matches!(err, StoreError::AccessDenied(_)), "{relative}");
        }
        assert_eq!(std::fs::read_dir(&outside).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_path_below_a_file_is_not_found() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
        let store = LocalStore::open(dir.path(), false, false).await.unwrap();

        assert!(store.resolve("a.txt/x").await.unwrap_err().is_not_found());
        assert!(store.resolve("a.txt/x/y").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_read_only_store_rejects_write() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path(), false, true).await.unwrap();
        assert!(store.is_read_only());
        let err = store.write("a.txt", once_stream("x")).await.unwrap_err();
        assert!(matches!(err, StoreError::AccessDenied(_)));
        assert!(!dir.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_target_and_no_temp_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "original").unwrap();
        let store = LocalStore::open(dir.path(), false, false).await.unwrap();

        let failing: ByteStream = Box::pin(futures_util::stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "client went away")),
        ]));
        let err = store.write("a.txt", failing).await.unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));

        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.txt")).unwrap(),
            "original"
        );
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_open_missing_root_without_create_fails() {
        let dir = tempdir().unwrap();
        let result = LocalStore::open(dir.path().join("nope"), false, false).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_reader_keeps_old_content_across_overwrite() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path(), false, false).await.unwrap();
        store.write("a.txt", once_stream("old content")).await.unwrap();

        let handle = store.resolve("a.txt").await.unwrap();
        store.write("a.txt", once_stream("brand new content")).await.unwrap();

        assert_eq!(handle.size(), 11);
        let body = collect(store.read(handle).await.unwrap()).await;
        assert_eq!(body, b"old content");
    }
}
