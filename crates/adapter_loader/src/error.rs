//! Loader error types.

use thiserror::Error;

/// Errors raised while fetching resources from a bucket.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The named resource does not exist.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// No folder usable as the latest extract could be found.
    #[error("No resource folder found in {0}")]
    NoResourceFolder(String),

    /// Reading from local storage failed.
    #[error("I/O error for {resource}: {source}")]
    Io {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP request could not be completed.
    #[error("HTTP error for {resource}: {source}")]
    Http {
        resource: String,
        #[source]
        source: reqwest::Error,
    },

    /// A resource bundle could not be read as a zip archive.
    #[error("Archive error for {resource}: {source}")]
    Archive {
        resource: String,
        #[source]
        source: zip::result::ZipError,
    },

    /// The object store answered with a status other than success or 404.
    #[error("Unexpected status {status} for {resource}")]
    UnexpectedStatus { resource: String, status: u16 },
}

impl LoaderError {
    /// Whether the error means the resource is absent rather than unreachable.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LoaderError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = LoaderError::NotFound("2024-01-05/sym_bbg.txt".to_string());
        assert_eq!(err.to_string(), "Resource not found: 2024-01-05/sym_bbg.txt");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_error_display_unexpected_status() {
        let err = LoaderError::UnexpectedStatus {
            resource: "weekly".to_string(),
            status: 403,
        };
        assert_eq!(err.to_string(), "Unexpected status 403 for weekly");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_io_error_keeps_source() {
        let err = LoaderError::Io {
            resource: "sym_coverage.txt".to_string(),
            source: std::io::Error::other("disk gone"),
        };
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("disk gone"));
    }
}
