use crate::editor::MutationStatus;
use crate::error::{Error, Result};
use crate::layout::Layout;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One line of the append-only mutation log.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub file_path: String,
    pub section_marker: String,
    pub status: MutationStatus,
}

/// Append-only record of every section edit attempted, consulted after
/// a crash to show the operator how far the last run got. Never used to
/// re-execute anything unattended.
#[derive(Debug)]
pub struct TransactionLog {
    path: PathBuf,
}

impl TransactionLog {
    pub fn open(layout: &Layout) -> Result<Self> {
        std::fs::create_dir_all(layout.state_dir())
            .map_err(|e| Error::Log(format!("failed to create state dir: {}", e)))?;
        Ok(Self {
            path: layout.mutation_log(),
        })
    }

    pub fn record(&mut self, file: &Path, marker: &str, status: MutationStatus) -> Result<()> {
        let line = format!(
            "{}\t{}\t{}\t{}\n",
            chrono::Utc::now().to_rfc3339(),
            file.display(),
            marker,
            status
        );
        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::Log(format!("failed to open {}: {}", self.path.display(), e)))?;
        f.write_all(line.as_bytes())
            .map_err(|e| Error::Log(format!("failed to append to log: {}", e)))
    }

    /// All entries, oldest first. A torn final line from an interrupted
    /// append is skipped rather than failing the whole read.
    pub fn read_log(&self) -> Result<Vec<LogEntry>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::Log(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        Ok(content.lines().filter_map(parse_line).collect())
    }
}

fn parse_line(line: &str) -> Option<LogEntry> {
    let mut fields = line.splitn(4, '\t');
    let timestamp = fields.next()?.to_string();
    let file_path = fields.next()?.to_string();
    let section_marker = fields.next()?.to_string();
    let status: MutationStatus = fields.next()?.parse().ok()?;
    Some(LogEntry {
        timestamp,
        file_path,
        section_marker,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_record_and_read_back() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path());
        let mut log = TransactionLog::open(&layout).unwrap();

        log.record(
            Path::new("/boot/config.txt"),
            "OVERKILL-BOOT",
            MutationStatus::Pending,
        )
        .unwrap();
        log.record(
            Path::new("/boot/config.txt"),
            "OVERKILL-BOOT",
            MutationStatus::Applied,
        )
        .unwrap();

        let entries = log.read_log().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].status, MutationStatus::Pending);
        assert_eq!(entries[1].status, MutationStatus::Applied);
        assert_eq!(entries[1].file_path, "/boot/config.txt");
        assert_eq!(entries[1].section_marker, "OVERKILL-BOOT");
    }

    #[test]
    fn test_log_is_append_only_across_opens() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path());

        {
            let mut log = TransactionLog::open(&layout).unwrap();
            log.record(Path::new("/a"), "M", MutationStatus::Applied)
                .unwrap();
        }
        {
            let mut log = TransactionLog::open(&layout).unwrap();
            log.record(Path::new("/b"), "M", MutationStatus::SkippedAlreadyPresent)
                .unwrap();
        }

        let log = TransactionLog::open(&layout).unwrap();
        let entries = log.read_log().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].file_path, "/a");
        assert_eq!(entries[1].file_path, "/b");
    }

    #[test]
    fn test_torn_line_skipped() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path());
        let mut log = TransactionLog::open(&layout).unwrap();
        log.record(Path::new("/a"), "M", MutationStatus::Applied)
            .unwrap();

        // Simulate a crash mid-append.
        let mut content = fs::read_to_string(layout.mutation_log()).unwrap();
        content.push_str("2026-01-01T00:00:00+00:00\t/b");
        fs::write(layout.mutation_log(), content).unwrap();

        let entries = log.read_log().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].file_path, "/a");
    }

    #[test]
    fn test_missing_log_is_empty() {
        let tmp = TempDir::new().unwrap();
        let log = TransactionLog::open(&Layout::new(tmp.path())).unwrap();
        assert!(log.read_log().unwrap().is_empty());
    }
}
