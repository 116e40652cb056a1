//! In-memory loader for tests and fixtures.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{LoaderError, ResourceLoader};

/// Loader serving fixed resources from memory.
///
/// # Examples
///
/// ```
/// use adapter_loader::{InMemoryLoader, ResourceLoader};
///
/// # tokio_test::block_on(async {
/// let loader = InMemoryLoader::new()
///     .with_latest_folder("2024-01-05")
///     .with_resource("2024-01-05/sym_bbg.txt", "\"FSYM_ID\"|\"BBG_ID\"\n");
///
/// let folder = loader.find_latest_resources_folder().await.unwrap();
/// assert_eq!(folder, "2024-01-05");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryLoader {
    resources: HashMap<String, Bytes>,
    failing: HashSet<String>,
    latest_folder: Option<String>,
    available: bool,
}

impl Default for InMemoryLoader {
    fn default() -> Self {
        Self {
            resources: HashMap::new(),
            failing: HashSet::new(),
            latest_folder: None,
            available: true,
        }
    }
}

impl InMemoryLoader {
    /// Create an empty, reachable loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource under `name`.
    pub fn with_resource(mut self, name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        self.resources.insert(name.into(), content.into());
        self
    }

    /// Make reads of `name` fail with an I/O error.
    pub fn with_failure(mut self, name: impl Into<String>) -> Self {
        self.failing.insert(name.into());
        self
    }

    /// Set the folder reported as the latest extract.
    pub fn with_latest_folder(mut self, folder: impl Into<String>) -> Self {
        self.latest_folder = Some(folder.into());
        self
    }

    /// Report the bucket as missing.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }
}

#[async_trait]
impl ResourceLoader for InMemoryLoader {
    async fn load_resource(&self, name: &str) -> Result<Bytes, LoaderError> {
        if self.failing.contains(name) {
            return Err(LoaderError::Io {
                resource: name.to_string(),
                source: std::io::Error::other("stream closed unexpectedly"),
            });
        }
        self.resources
            .get(name)
            .cloned()
            .ok_or_else(|| LoaderError::NotFound(name.to_string()))
    }

    async fn find_latest_resources_folder(&self) -> Result<String, LoaderError> {
        self.latest_folder
            .clone()
            .ok_or_else(|| LoaderError::NoResourceFolder("memory".to_string()))
    }

    async fn bucket_exists(&self) -> Result<bool, LoaderError> {
        Ok(self.available)
    }
}
