use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Read-only view of the procfs/sysfs/device-tree side of the system.
/// Defaults to `/` in production, redirectable to a temp directory for
/// testing. Fact detection never writes through this.
#[derive(Debug, Clone)]
pub struct SysfsRoot {
    root: PathBuf,
}

impl Default for SysfsRoot {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
        }
    }
}

impl SysfsRoot {
    /// A SysfsRoot pointing at the real system.
    pub fn system() -> Self {
        Self::default()
    }

    /// A SysfsRoot pointing at a custom directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a path relative to this root.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Read a file, trimming whitespace and any trailing NULs
    /// (device-tree strings are NUL-terminated).
    ///
    /// A missing file is a valid negative fact and comes back as `None`;
    /// an unreadable file (permissions) is an error, because a fact we
    /// cannot read is not the same as a fact that is absent.
    pub fn read_optional(&self, relative: impl AsRef<Path>) -> Result<Option<String>> {
        let path = self.path(relative);
        match std::fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s.trim_matches(['\0', ' ', '\n', '\t', '\r']).to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Detection { path, source: e }),
        }
    }

    /// List entries in a directory, sorted. A missing directory yields an
    /// empty list; an unreadable one is an error.
    pub fn list_dir(&self, relative: impl AsRef<Path>) -> Result<Vec<String>> {
        let path = self.path(relative);
        let entries = match std::fs::read_dir(&path) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Detection { path, source: e }),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::Detection {
                path: path.clone(),
                source: e,
            })?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Check if a path exists relative to this root.
    pub fn exists(&self, relative: impl AsRef<Path>) -> bool {
        self.path(relative).exists()
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }
}
