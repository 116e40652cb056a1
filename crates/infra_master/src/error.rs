//! Error types for parsing and loading.

use adapter_loader::LoaderError;
use thiserror::Error;

/// Errors raised while scanning a delimited stream.
///
/// Malformed rows are skipped, so the only failure is the stream itself.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to read {dataset} records: {source}")]
    Io {
        dataset: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Errors aborting a full load.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A resource could not be fetched.
    #[error("Resource unavailable: {0}")]
    Resource(#[from] LoaderError),

    /// A resource could not be read as text.
    #[error(transparent)]
    Parse(#[from] ParseError),
}
