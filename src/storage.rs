use async_trait::async_trait;
use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{io::AsyncWriteExt, sync::RwLock};

// 1. StorageService Contract
/// StorageService
///
/// Defines the contract for uploaded image storage. Handlers only see this trait,
/// so the on-disk implementation (`LocalStorage`) can be replaced by the in-memory
/// `MockStorageService` in tests.
///
/// Keys are bare filenames; callers must check them with `is_safe_filename` first.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the upload directory when missing. Safe to call at every startup.
    async fn ensure_dir(&self) -> io::Result<()>;

    /// Never overwrites: an existing file answers `io::ErrorKind::AlreadyExists`.
    async fn save(&self, filename: &str, bytes: &[u8]) -> io::Result<()>;

    /// `io::ErrorKind::NotFound` when the file does not exist.
    async fn load(&self, filename: &str) -> io::Result<Vec<u8>>;
}

// 2. The Real Implementation (local disk)
/// LocalStorage
///
/// Stores images as plain files under one directory (`UPLOAD_DIR`, default `uploads`).
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, filename: &str) -> io::Result<PathBuf> {
        if !is_safe_filename(filename) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("rejected filename: {}", filename),
            ));
        }
        Ok(self.root.join(filename))
    }
}

#[async_trait]
impl StorageService for LocalStorage {
    async fn ensure_dir(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    async fn save(&self, filename: &str, bytes: &[u8]) -> io::Result<()> {
        let path = self.path_for(filename)?;
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        tracing::debug!("stored image at {}", path.display());
        Ok(())
    }

    async fn load(&self, filename: &str) -> io::Result<Vec<u8>> {
        let path = self.path_for(filename)?;
        tokio::fs::read(path).await
    }
}

/// is_safe_filename
///
/// Prevents path traversal: a storage key must be a single non-empty path segment
/// with no separators and no `..`.
pub fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && filename != "."
        && !filename.contains("..")
        && !filename.contains('/')
        && !filename.contains('\\')
        && !filename.contains('\0')
}

// 3. The Mock Implementation (For Unit Tests)
/// MockStorageService
///
/// Keeps files in a shared map so tests can upload and read back without touching
/// the disk.
#[derive(Clone, Default)]
pub struct MockStorageService {
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Names currently stored, sorted.
    pub async fn filenames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    fn simulated_failure() -> io::Error {
        io::Error::other("Mock Storage Error: Simulation requested")
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_dir(&self) -> io::Result<()> {
        Ok(())
    }

    async fn save(&self, filename: &str, bytes: &[u8]) -> io::Result<()> {
        if self.should_fail {
            return Err(Self::simulated_failure());
        }
        let mut files = self.files.write().await;
        if files.contains_key(filename) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                filename.to_string(),
            ));
        }
        files.insert(filename.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn load(&self, filename: &str) -> io::Result<Vec<u8>> {
        if self.should_fail {
            return Err(Self::simulated_failure());
        }
        self.files
            .read()
            .await
            .get(filename)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, filename.to_string()))
    }
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;
