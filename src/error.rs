use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("detection failed: {path}: {source}")]
    Detection {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unknown profile: {0}")]
    UnknownProfile(String),

    #[error("invalid profile '{name}': {reason}")]
    InvalidProfile { name: String, reason: String },

    #[error("permission denied writing {path}: {source}")]
    Permission {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("file changed underneath us: {path}")]
    ConcurrentModification { path: PathBuf },

    #[error("no pristine backup recorded for {path}")]
    NoBackup { path: PathBuf },

    #[error("required executable missing: {path}")]
    MissingDependency { path: PathBuf },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("state file error: {0}")]
    State(String),

    #[error("transaction log error: {0}")]
    Log(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Classify a write-side io error for `path`. EACCES gets its own
    /// variant so the operator sees a permission problem, not a generic
    /// i/o failure.
    pub fn from_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            Error::Permission { path, source }
        } else {
            Error::Io { path, source }
        }
    }
}
