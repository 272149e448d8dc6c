//! Filesystem primitives consumed by the executor and the cache probe.
//!
//! All output paths in the graph are relative to a served data root; the
//! trait keeps the executor oblivious to where that root actually lives.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{Error, Result};

/// The filesystem boundary: existence checks, subdirectory creation and
/// descriptor read-back.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Whether `path` exists under the data root.
    async fn exists(
        &self,
        path: &str,
    ) -> bool;

    /// Create `name` inside `parent`. Creating an existing directory is not
    /// an error.
    async fn create_subdirectory(
        &self,
        parent: &str,
        name: &str,
    ) -> Result<()>;

    /// Read a file to a string.
    async fn read_to_string(
        &self,
        path: &str,
    ) -> Result<String>;
}

/// Local-disk filesystem rooted at a data directory.
pub struct LocalFileSystem {
    root: PathBuf,
}

impl LocalFileSystem {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn resolve(
        &self,
        path: &str,
    ) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn exists(
        &self,
        path: &str,
    ) -> bool {
        tokio::fs::try_exists(self.resolve(path)).await.unwrap_or(false)
    }

    async fn create_subdirectory(
        &self,
        parent: &str,
        name: &str,
    ) -> Result<()> {
        let path = self.resolve(parent).join(name);
        tokio::fs::create_dir_all(&path).await.map_err(|e| Error::Filesystem(format!("{}: {}", path.display(), e)))
    }

    async fn read_to_string(
        &self,
        path: &str,
    ) -> Result<String> {
        let path = self.resolve(path);
        tokio::fs::read_to_string(&path).await.map_err(|e| Error::Filesystem(format!("{}: {}", path.display(), e)))
    }
}
