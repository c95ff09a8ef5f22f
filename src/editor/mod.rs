use crate::backup::{BackupStore, Pristine};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Marker pair delimiting a tool-owned block inside an operator-owned
/// file. Everything outside the pair is never touched.
pub fn begin_line(marker: &str) -> String {
    format!("# OVERKILL BEGIN {}", marker)
}

pub fn end_line(marker: &str) -> String {
    format!("# OVERKILL END {}", marker)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MutationStatus {
    Pending,
    Applied,
    SkippedAlreadyPresent,
    Failed,
}

impl std::fmt::Display for MutationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MutationStatus::Pending => "pending",
            MutationStatus::Applied => "applied",
            MutationStatus::SkippedAlreadyPresent => "skipped-already-present",
            MutationStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for MutationStatus {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        match s {
            "pending" => Ok(MutationStatus::Pending),
            "applied" => Ok(MutationStatus::Applied),
            "skipped-already-present" => Ok(MutationStatus::SkippedAlreadyPresent),
            "failed" => Ok(MutationStatus::Failed),
            _ => Err(()),
        }
    }
}

/// Per-file, per-run record of one section edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationRecord {
    pub file_path: PathBuf,
    /// Pristine copy taken before the first-ever mutation of this file,
    /// if the file existed then.
    pub backup_path: Option<PathBuf>,
    pub section_marker: String,
    pub applied_content_hash: String,
    pub status: MutationStatus,
}

impl MutationRecord {
    pub fn new(path: &Path, marker: &str, content: &str) -> Self {
        Self {
            file_path: path.to_path_buf(),
            backup_path: None,
            section_marker: marker.to_string(),
            applied_content_hash: content_hash(content),
            status: MutationStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied,
    SkippedAlreadyPresent,
}

impl From<MutationOutcome> for MutationStatus {
    fn from(outcome: MutationOutcome) -> Self {
        match outcome {
            MutationOutcome::Applied => MutationStatus::Applied,
            MutationOutcome::SkippedAlreadyPresent => MutationStatus::SkippedAlreadyPresent,
        }
    }
}

/// Current relationship between a file and a desired block. Used by
/// dry-run planning and drift checks; never writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionState {
    UpToDate,
    Differs,
    Missing,
}

/// SHA-256 over the normalized block content, hex encoded.
pub fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(normalize(content).as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

fn normalize(content: &str) -> String {
    content
        .trim_end_matches('\n')
        .lines()
        .collect::<Vec<_>>()
        .join("\n")
}

/// The idempotence primitive. Owns the backup store while editing so a
/// pristine copy is always captured before the first write to a file.
pub struct SectionEditor<'a> {
    backups: &'a mut BackupStore,
}

impl<'a> SectionEditor<'a> {
    pub fn new(backups: &'a mut BackupStore) -> Self {
        Self { backups }
    }

    /// Ensure the marker-delimited block containing `content` is present
    /// in `path` exactly once.
    ///
    /// Already present with identical content: no write. Present with
    /// different content: replaced in place. Absent: appended. A change
    /// to the file between our read and our write is retried once, then
    /// surfaced as `ConcurrentModification`.
    pub fn ensure_section(
        &mut self,
        path: &Path,
        marker: &str,
        content: &str,
    ) -> Result<(MutationOutcome, Pristine)> {
        let pristine = self.backups.backup_if_absent(path)?;

        let mut retried = false;
        loop {
            let original = read_or_empty(path)?;
            let (rebuilt, already_present) = apply_section(&original, marker, content);
            if already_present {
                return Ok((MutationOutcome::SkippedAlreadyPresent, pristine));
            }

            // Pre-write re-read: catch an external writer slipping in
            // between our read and the rename.
            let reread = read_or_empty(path)?;
            if reread != original {
                if retried {
                    return Err(Error::ConcurrentModification {
                        path: path.to_path_buf(),
                    });
                }
                retried = true;
                continue;
            }

            write_atomic(path, rebuilt.as_bytes())?;
            return Ok((MutationOutcome::Applied, pristine));
        }
    }
}

/// Read-only classification of `path` against the desired block.
pub fn section_state(path: &Path, marker: &str, content: &str) -> Result<SectionState> {
    let current = read_or_empty(path)?;
    let extracted = extract_blocks(&current, marker);
    if extracted.blocks.len() == 1 && extracted.blocks[0] == normalize(content) {
        Ok(SectionState::UpToDate)
    } else if extracted.blocks.is_empty() {
        Ok(SectionState::Missing)
    } else {
        Ok(SectionState::Differs)
    }
}

/// Inner contents of every block for `marker` in `path`. The invariant
/// says at most one; callers treat more than one as drift.
pub fn read_blocks(path: &Path, marker: &str) -> Result<Vec<String>> {
    let current = read_or_empty(path)?;
    Ok(extract_blocks(&current, marker).blocks)
}

/// Write `bytes` to `path` via a temp file in the same directory and an
/// atomic rename, so an interrupted write leaves the old content intact.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| Error::from_write(dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::from_write(path, e))?;
    tmp.write_all(bytes).map_err(|e| Error::from_write(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| Error::from_write(path, e))?;
    tmp.persist(path).map_err(|e| Error::from_write(path, e.error))?;
    Ok(())
}

fn read_or_empty(path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(s) => Ok(s),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(Error::from_write(path, e)),
    }
}

struct Extracted {
    /// Lines outside any block for this marker.
    kept: Vec<String>,
    /// Inner content of each block found, in order.
    blocks: Vec<String>,
    /// Index into `kept` where the first block stood.
    first_at: Option<usize>,
}

fn extract_blocks(content: &str, marker: &str) -> Extracted {
    let begin = begin_line(marker);
    let end = end_line(marker);

    let mut kept = Vec::new();
    let mut blocks = Vec::new();
    let mut first_at = None;

    let mut lines = content.lines();
    while let Some(line) = lines.next() {
        if line == begin {
            if first_at.is_none() {
                first_at = Some(kept.len());
            }
            // An unterminated block (no end line) runs to EOF.
            let mut inner = Vec::new();
            for inner_line in lines.by_ref() {
                if inner_line == end {
                    break;
                }
                inner.push(inner_line.to_string());
            }
            blocks.push(inner.join("\n"));
        } else {
            kept.push(line.to_string());
        }
    }

    Extracted {
        kept,
        blocks,
        first_at,
    }
}

/// Pure content transform: return the rebuilt file and whether the
/// desired block was already present verbatim. A replaced block keeps
/// its position; an appended block lands at the end after a separating
/// blank line. Duplicate blocks (operator corruption) collapse to one.
fn apply_section(original: &str, marker: &str, content: &str) -> (String, bool) {
    let extracted = extract_blocks(original, marker);
    let desired = normalize(content);

    if extracted.blocks.len() == 1 && extracted.blocks[0] == desired {
        return (original.to_string(), true);
    }

    let mut block = vec![begin_line(marker)];
    block.extend(desired.lines().map(str::to_string));
    block.push(end_line(marker));

    let mut out = extracted.kept;
    match extracted.first_at {
        Some(i) => {
            out.splice(i..i, block);
        }
        None => {
            if out.last().is_some_and(|l| !l.is_empty()) {
                out.push(String::new());
            }
            out.extend(block);
        }
    }

    (out.join("\n") + "\n", false)
}
