//! Local directory acting as a bucket.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use crate::folder::{latest_dated_folder, latest_folder_from_index, WEEKLY_INDEX};
use crate::{LoaderError, ResourceLoader};

/// Loader reading resources from a directory tree.
///
/// Resource names are paths relative to the root, e.g.
/// `2024-01-05/sym_coverage.txt`.
#[derive(Debug, Clone)]
pub struct FsBucketLoader {
    root: PathBuf,
}

impl FsBucketLoader {
    /// Create a loader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The bucket root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        contained.then(|| self.root.join(relative))
    }

    async fn dated_subfolders(&self) -> Result<Vec<String>, LoaderError> {
        let io_err = |source: std::io::Error| LoaderError::Io {
            resource: self.root.display().to_string(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(io_err)?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            if entry.file_type().await.map_err(io_err)?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(names)
    }
}

#[async_trait]
impl ResourceLoader for FsBucketLoader {
    async fn load_resource(&self, name: &str) -> Result<Bytes, LoaderError> {
        let path = self
            .resolve(name)
            .ok_or_else(|| LoaderError::NotFound(name.to_string()))?;
        debug!(path = %path.display(), "Reading resource");

        match tokio::fs::read(&path).await {
            Ok(content) => Ok(Bytes::from(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(LoaderError::NotFound(name.to_string()))
            }
            Err(source) => Err(LoaderError::Io {
                resource: name.to_string(),
                source,
            }),
        }
    }

    async fn find_latest_resources_folder(&self) -> Result<String, LoaderError> {
        match self.load_resource(WEEKLY_INDEX).await {
            Ok(content) => {
                if let Some(folder) = latest_folder_from_index(&String::from_utf8_lossy(&content)) {
                    info!(folder = %folder, "Found latest folder from weekly index");
                    return Ok(folder);
                }
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let names = self.dated_subfolders().await?;
        let folder = latest_dated_folder(names.iter().map(String::as_str))
            .ok_or_else(|| LoaderError::NoResourceFolder(self.root.display().to_string()))?;
        info!(folder = %folder, "Found latest dated folder");
        Ok(folder)
    }

    async fn bucket_exists(&self) -> Result<bool, LoaderError> {
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(LoaderError::Io {
                resource: self.root.display().to_string(),
                source,
            }),
        }
    }
}
