use crate::apply::ApplyReport;
use crate::editor::{self, MutationStatus};
use crate::error::Result;
use crate::layout::Layout;
use crate::profile::ProfileName;
use serde::Serialize;

/// Drift state of one recorded section edit.
#[derive(Debug, Clone, Serialize)]
pub struct SectionStatus {
    pub path: String,
    pub marker: String,
    /// Terminal status from the last apply.
    pub recorded: MutationStatus,
    /// The marker block exists exactly once in the file.
    pub present: bool,
    /// The block content still hashes to what was applied.
    pub current: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub profile: ProfileName,
    pub applied_at: String,
    pub sections: Vec<SectionStatus>,
}

impl StatusReport {
    pub fn current_count(&self) -> usize {
        self.sections.iter().filter(|s| s.current).count()
    }

    pub fn drifted_count(&self) -> usize {
        self.sections.len() - self.current_count()
    }
}

/// Compare the last apply report against the files as they are now.
/// Returns None when nothing has ever been applied.
pub fn check(layout: &Layout) -> Result<Option<StatusReport>> {
    let report = match ApplyReport::load(layout)? {
        Some(r) => r,
        None => return Ok(None),
    };

    let mut sections = Vec::new();
    for record in &report.records {
        let blocks = editor::read_blocks(&record.file_path, &record.section_marker)?;
        let present = blocks.len() == 1;
        let current = present && editor::content_hash(&blocks[0]) == record.applied_content_hash;
        sections.push(SectionStatus {
            path: record.file_path.display().to_string(),
            marker: record.section_marker.clone(),
            recorded: record.status,
            present,
            current,
        });
    }

    Ok(Some(StatusReport {
        profile: report.profile,
        applied_at: report.timestamp,
        sections,
    }))
}
