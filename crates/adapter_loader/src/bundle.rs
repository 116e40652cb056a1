//! Extracts published as one zip archive per folder.
//!
//! A bundled folder holds `weekly.zip`, whose entries live under `weekly/`.
//! [`ZipBundleLoader`] maps a resource name such as
//! `2024-01-05/sym_coverage.txt` to the entry `weekly/sym_coverage.txt` of
//! `2024-01-05/weekly.zip`.

use std::io::{Cursor, Read};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::{LoaderError, ResourceLoader};

/// Object name of the archive inside a folder.
pub const BUNDLE_OBJECT: &str = "weekly.zip";

/// Directory of the resources inside the archive.
pub const BUNDLE_DIR: &str = "weekly";

/// Loader reading resources out of the zip archive of their folder.
///
/// The archive is fetched through the wrapped loader. The most recently
/// fetched archive is kept so the resources of one extract cost one fetch.
pub struct ZipBundleLoader<L> {
    inner: L,
    archive: Mutex<Option<(String, Bytes)>>,
}

impl<L: ResourceLoader> ZipBundleLoader<L> {
    /// Wrap `inner`, which serves the archives themselves.
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            archive: Mutex::new(None),
        }
    }

    /// The wrapped loader.
    pub fn inner(&self) -> &L {
        &self.inner
    }

    async fn fetch_archive(&self, object: &str) -> Result<Bytes, LoaderError> {
        {
            let cached = self.archive.lock().unwrap_or_else(|e| e.into_inner());
            if let Some((name, content)) = cached.as_ref() {
                if name == object {
                    return Ok(content.clone());
                }
            }
        }

        info!(object, "Fetching resource bundle");
        let content = self.inner.load_resource(object).await?;
        let mut cached = self.archive.lock().unwrap_or_else(|e| e.into_inner());
        *cached = Some((object.to_string(), content.clone()));
        Ok(content)
    }
}

/// Split `name` into the archive object and the entry it names.
fn bundle_location(name: &str) -> (String, String) {
    match name.rsplit_once('/') {
        Some((folder, file)) => (
            format!("{folder}/{BUNDLE_OBJECT}"),
            format!("{BUNDLE_DIR}/{file}"),
        ),
        None => (BUNDLE_OBJECT.to_string(), format!("{BUNDLE_DIR}/{name}")),
    }
}

fn read_entry(archive: Bytes, object: &str, entry: &str) -> Result<Bytes, LoaderError> {
    let archive_err = |source: ZipError| LoaderError::Archive {
        resource: object.to_string(),
        source,
    };

    let mut archive = ZipArchive::new(Cursor::new(archive)).map_err(archive_err)?;
    let mut file = match archive.by_name(entry) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => {
            return Err(LoaderError::NotFound(format!("{object}:{entry}")))
        }
        Err(e) => return Err(archive_err(e)),
    };

    let mut content = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut content)
        .map_err(|source| LoaderError::Io {
            resource: format!("{object}:{entry}"),
            source,
        })?;
    Ok(Bytes::from(content))
}

#[async_trait]
impl<L: ResourceLoader> ResourceLoader for ZipBundleLoader<L> {
    async fn load_resource(&self, name: &str) -> Result<Bytes, LoaderError> {
        let (object, entry) = bundle_location(name);
        let archive = self.fetch_archive(&object).await?;
        debug!(object = %object, entry = %entry, "Reading bundled resource");
        read_entry(archive, &object, &entry)
    }

    async fn find_latest_resources_folder(&self) -> Result<String, LoaderError> {
        self.inner.find_latest_resources_folder().await
    }

    async fn bucket_exists(&self) -> Result<bool, LoaderError> {
        self.inner.bucket_exists().await
    }
}
