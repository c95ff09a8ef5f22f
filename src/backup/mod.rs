use crate::editor::write_atomic;
use crate::error::{Error, Result};
use crate::layout::Layout;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// What a target file looked like before this tool ever touched it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "path")]
pub enum Pristine {
    /// Verbatim copy of the original file.
    File(PathBuf),
    /// The file did not exist before the first mutation; restoring it
    /// means removing it.
    Absent,
}

/// Tracks one pristine backup per mutated file, persisted as a JSON
/// index next to the backups themselves. A recorded backup is never
/// overwritten, so it stays pristine across any number of applies.
#[derive(Debug)]
pub struct BackupStore {
    dir: PathBuf,
    index_path: PathBuf,
    index: BTreeMap<String, Pristine>,
}

impl BackupStore {
    pub fn open(layout: &Layout) -> Result<Self> {
        let dir = layout.backups_dir();
        std::fs::create_dir_all(&dir)
            .map_err(|e| Error::State(format!("failed to create backup dir: {}", e)))?;

        let index_path = layout.backup_index();
        let index = match std::fs::read_to_string(&index_path) {
            Ok(data) => serde_json::from_str(&data)
                .map_err(|e| Error::State(format!("failed to parse backup index: {}", e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(Error::State(format!("failed to read backup index: {}", e))),
        };

        Ok(Self {
            dir,
            index_path,
            index,
        })
    }

    /// Capture a pristine copy of `target` unless one is already
    /// recorded. Returns the recorded state either way.
    pub fn backup_if_absent(&mut self, target: &Path) -> Result<Pristine> {
        let key = index_key(target);
        if let Some(existing) = self.index.get(&key) {
            return Ok(existing.clone());
        }

        let pristine = if target.exists() {
            let backup_path = self.unique_backup_path(target);
            std::fs::copy(target, &backup_path)
                .map_err(|e| Error::from_write(&backup_path, e))?;
            Pristine::File(backup_path)
        } else {
            Pristine::Absent
        };

        self.index.insert(key, pristine.clone());
        self.save_index()?;
        Ok(pristine)
    }

    /// Restore `target` to its recorded pristine state. The backup is
    /// kept, so restore can run any number of times.
    pub fn restore(&self, target: &Path) -> Result<()> {
        match self.index.get(&index_key(target)) {
            None => Err(Error::NoBackup {
                path: target.to_path_buf(),
            }),
            Some(Pristine::File(backup_path)) => {
                let bytes = std::fs::read(backup_path).map_err(|e| Error::Io {
                    path: backup_path.clone(),
                    source: e,
                })?;
                write_atomic(target, &bytes)
            }
            Some(Pristine::Absent) => match std::fs::remove_file(target) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(Error::from_write(target, e)),
            },
        }
    }

    /// Every target file with a recorded pristine state.
    pub fn recorded(&self) -> impl Iterator<Item = (&String, &Pristine)> {
        self.index.iter()
    }

    /// Restore every recorded file, attempting all of them even if some
    /// fail. Results are reported per file.
    pub fn restore_all(&self) -> Vec<(PathBuf, Result<()>)> {
        self.index
            .keys()
            .map(|key| {
                let path = PathBuf::from(key);
                let result = self.restore(&path);
                (path, result)
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Backup path for `target`, disambiguated if two targets sanitize
    /// to the same file name.
    fn unique_backup_path(&self, target: &Path) -> PathBuf {
        let base = sanitize(target);
        let mut candidate = self.dir.join(format!("{}.orig", base));
        let mut n = 1;
        while candidate.exists() {
            n += 1;
            candidate = self.dir.join(format!("{}-{}.orig", base, n));
        }
        candidate
    }

    fn save_index(&self) -> Result<()> {
        let data = serde_json::to_string_pretty(&self.index)
            .map_err(|e| Error::State(format!("failed to serialize backup index: {}", e)))?;
        write_atomic(&self.index_path, data.as_bytes())
    }
}

fn index_key(target: &Path) -> String {
    target.to_string_lossy().into_owned()
}

/// Flatten a path into a file name: `/boot/config.txt` becomes
/// `boot-config.txt`.
fn sanitize(path: &Path) -> String {
    let flat: String = path
        .to_string_lossy()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect();
    flat.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn open_store(tmp: &TempDir) -> BackupStore {
        BackupStore::open(&Layout::new(tmp.path())).unwrap()
    }

    #[test]
    fn test_backup_never_overwritten() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("config.txt");
        fs::write(&target, "original\n").unwrap();
        let mut store = open_store(&tmp);

        let Pristine::File(backup) = store.backup_if_absent(&target).unwrap() else {
            panic!("expected file backup");
        };

        // Mutate the target, then ask again: same backup, same content.
        fs::write(&target, "mutated\n").unwrap();
        let again = store.backup_if_absent(&target).unwrap();
        assert_eq!(again, Pristine::File(backup.clone()));
        assert_eq!(fs::read_to_string(&backup).unwrap(), "original\n");
    }

    #[test]
    fn test_absent_target_recorded_as_absent() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("missing.conf");
        let mut store = open_store(&tmp);

        assert_eq!(store.backup_if_absent(&target).unwrap(), Pristine::Absent);

        // Even if the file appears later, the recorded state stays.
        fs::write(&target, "late\n").unwrap();
        assert_eq!(store.backup_if_absent(&target).unwrap(), Pristine::Absent);
    }

    #[test]
    fn test_restore_round_trip() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("config.txt");
        fs::write(&target, "original\n").unwrap();
        let mut store = open_store(&tmp);

        store.backup_if_absent(&target).unwrap();
        fs::write(&target, "mutated\n").unwrap();

        store.restore(&target).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "original\n");

        // Repeated restore with no new mutation is a no-op.
        store.restore(&target).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "original\n");
    }

    #[test]
    fn test_restore_absent_removes_file() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("created.conf");
        let mut store = open_store(&tmp);

        store.backup_if_absent(&target).unwrap();
        fs::write(&target, "tool created this\n").unwrap();

        store.restore(&target).unwrap();
        assert!(!target.exists());

        // Restoring absence twice is fine.
        store.restore(&target).unwrap();
    }

    #[test]
    fn test_restore_unrecorded_refused() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);

        let err = store.restore(&tmp.path().join("never-touched.txt"));
        assert!(matches!(err, Err(Error::NoBackup { .. })));
    }

    #[test]
    fn test_index_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("config.txt");
        fs::write(&target, "original\n").unwrap();

        {
            let mut store = open_store(&tmp);
            store.backup_if_absent(&target).unwrap();
        }

        let store = open_store(&tmp);
        assert_eq!(store.recorded().count(), 1);
        fs::write(&target, "mutated\n").unwrap();
        store.restore(&target).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "original\n");
    }

    #[test]
    fn test_sanitize_flattens_path() {
        assert_eq!(sanitize(Path::new("/boot/config.txt")), "boot-config.txt");
        assert_eq!(
            sanitize(Path::new("/etc/sysctl.d/99-overkill.conf")),
            "etc-sysctl.d-99-overkill.conf"
        );
    }

    #[test]
    fn test_colliding_names_disambiguated() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a")).unwrap();
        // `/a/config.txt` and `/a_config.txt` sanitize to the same name.
        let target1 = tmp.path().join("a/config.txt");
        let target2 = tmp.path().join("a_config.txt");
        fs::write(&target1, "one\n").unwrap();
        fs::write(&target2, "two\n").unwrap();

        let mut store = open_store(&tmp);
        let first = store.backup_if_absent(&target1).unwrap();
        let second = store.backup_if_absent(&target2).unwrap();

        let (Pristine::File(p1), Pristine::File(p2)) = (first, second) else {
            panic!("expected file backups");
        };
        assert_ne!(p1, p2);
        assert_eq!(fs::read_to_string(&p1).unwrap(), "one\n");
        assert_eq!(fs::read_to_string(&p2).unwrap(), "two\n");
    }
}
