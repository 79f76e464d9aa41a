//! Error type for store construction, loading, seeding and saving.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error type for configuration store operations.
///
/// Variants fall into two classes:
///
/// | Class | Variants                     | Meaning                                   |
/// |-------|------------------------------|-------------------------------------------|
/// | I/O   | `Io`, `Serialize`            | the medium could not be read or written   |
/// | Parse | `Parse`, `NotAMapping`       | the bytes on disk are not a valid document |
///
/// Use [`StoreError::is_io`] / [`StoreError::is_parse`] when only the class matters.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file content could not be parsed as YAML.
    #[error("failed to parse config YAML at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The file parsed, but its top-level value is a list or scalar.
    #[error("config at {path} is not a mapping at the top level")]
    NotAMapping { path: PathBuf },

    /// The in-memory contents could not be serialized.
    #[error("failed to serialize config for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Path of the file or directory the failed operation touched.
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. }
            | Self::Parse { path, .. }
            | Self::NotAMapping { path }
            | Self::Serialize { path, .. } => path,
        }
    }

    /// `true` for failures of the storage medium (read, write, create).
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Serialize { .. })
    }

    /// `true` when the file content is not a valid configuration document.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::NotAMapping { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_is_classified_as_io() {
        let err = StoreError::io(
            Path::new("/tmp/x.yml"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.is_io());
        assert!(!err.is_parse());
        assert_eq!(err.path(), Path::new("/tmp/x.yml"));
    }

    #[test]
    fn test_not_a_mapping_is_classified_as_parse() {
        let err = StoreError::NotAMapping {
            path: PathBuf::from("list.yml"),
        };
        assert!(err.is_parse());
        assert!(!err.is_io());
        assert!(err.to_string().contains("list.yml"));
    }
}
