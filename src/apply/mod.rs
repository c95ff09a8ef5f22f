pub mod render;

use crate::backup::{BackupStore, Pristine};
use crate::detect::SystemFacts;
use crate::editor::{self, MutationRecord, MutationStatus, SectionEditor, SectionState};
use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::profile::{DesiredConfig, ProfileName};
use crate::txlog::TransactionLog;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const BOOT_MARKER: &str = "OVERKILL-BOOT";
pub const BOOTARGS_MARKER: &str = "OVERKILL-BOOTARGS";
pub const SYSCTL_MARKER: &str = "OVERKILL-SYSCTL";
pub const THERMAL_MARKER: &str = "OVERKILL-THERMAL";

/// One concrete edit the applier will hand to the section editor.
#[derive(Debug, Clone)]
pub struct TargetStep {
    pub label: &'static str,
    pub path: PathBuf,
    pub marker: &'static str,
    pub content: String,
}

/// Build the ordered edit list for a profile. The kernel argument file
/// only exists on Armbian images, so that step is skipped when the OS
/// marker is absent.
pub fn build_steps(
    config: &DesiredConfig,
    facts: &SystemFacts,
    layout: &Layout,
) -> Vec<TargetStep> {
    let mut steps = vec![TargetStep {
        label: "boot-config",
        path: layout.boot_config(),
        marker: BOOT_MARKER,
        content: render::boot_config_block(config),
    }];

    if facts.os_marker_present && !config.extra_boot_args.is_empty() {
        steps.push(TargetStep {
            label: "kernel-args",
            path: layout.kernel_env(),
            marker: BOOTARGS_MARKER,
            content: render::kernel_args_block(config),
        });
    }

    steps.push(TargetStep {
        label: "sysctl",
        path: layout.sysctl_conf(),
        marker: SYSCTL_MARKER,
        content: render::sysctl_block(config),
    });

    steps.push(TargetStep {
        label: "thermal-unit",
        path: layout.thermal_unit(),
        marker: THERMAL_MARKER,
        content: render::thermal_unit_block(config, &layout.fan_control_bin()),
    });

    steps
}

/// Dry-run view: what each edit would do, with no writes at all.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedStep {
    pub label: &'static str,
    pub path: PathBuf,
    pub marker: &'static str,
    pub state: SectionState,
}

pub fn plan(
    config: &DesiredConfig,
    facts: &SystemFacts,
    layout: &Layout,
) -> Result<Vec<PlannedStep>> {
    build_steps(config, facts, layout)
        .into_iter()
        .map(|step| {
            let state = editor::section_state(&step.path, step.marker, &step.content)?;
            Ok(PlannedStep {
                label: step.label,
                path: step.path,
                marker: step.marker,
                state,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyOutcome {
    /// Every step applied or was already current.
    FullyApplied,
    /// At least one file was mutated before a step failed. Already
    /// mutated files stay as-is; rollback is a separate, explicit
    /// operation.
    PartiallyApplied,
    /// A step failed before any file was mutated in this run.
    FailedBeforeMutation,
}

impl std::fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ApplyOutcome::FullyApplied => "fully applied",
            ApplyOutcome::PartiallyApplied => "partially applied",
            ApplyOutcome::FailedBeforeMutation => "failed before any mutation",
        };
        write!(f, "{}", s)
    }
}

/// Structured result of one `apply` run, also persisted so `status` can
/// check for drift later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyReport {
    pub profile: ProfileName,
    pub timestamp: String,
    pub outcome: ApplyOutcome,
    pub error: Option<String>,
    pub records: Vec<MutationRecord>,
}

impl ApplyReport {
    pub fn changed(&self) -> usize {
        self.count(MutationStatus::Applied)
    }

    pub fn skipped(&self) -> usize {
        self.count(MutationStatus::SkippedAlreadyPresent)
    }

    pub fn failed(&self) -> usize {
        self.count(MutationStatus::Failed)
    }

    fn count(&self, status: MutationStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    pub fn save(&self, layout: &Layout) -> Result<()> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| Error::State(format!("failed to serialize apply report: {}", e)))?;
        editor::write_atomic(&layout.last_apply(), data.as_bytes())
    }

    pub fn load(layout: &Layout) -> Result<Option<Self>> {
        let path = layout.last_apply();
        match std::fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data)
                .map(Some)
                .map_err(|e| Error::State(format!("failed to parse apply report: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::State(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

/// Orchestrates one profile application: backup store and transaction
/// log around the section editor, fail-fast, no automatic rollback.
pub struct Applier {
    layout: Layout,
    backups: BackupStore,
    log: TransactionLog,
}

impl Applier {
    pub fn new(layout: &Layout) -> Result<Self> {
        Ok(Self {
            layout: layout.clone(),
            backups: BackupStore::open(layout)?,
            log: TransactionLog::open(layout)?,
        })
    }

    pub fn apply(&mut self, config: &DesiredConfig, facts: &SystemFacts) -> Result<ApplyReport> {
        // The thermal unit references the fan control daemon; if the
        // package layer has not installed it, refuse before touching
        // anything rather than guaranteeing a partial apply.
        let fan_bin = self.layout.fan_control_bin();
        if !fan_bin.exists() {
            return Err(Error::MissingDependency { path: fan_bin });
        }

        let steps = build_steps(config, facts, &self.layout);
        let mut records: Vec<MutationRecord> = Vec::new();
        let mut error = None;

        for step in &steps {
            let mut record = MutationRecord::new(&step.path, step.marker, &step.content);
            self.log
                .record(&step.path, step.marker, MutationStatus::Pending)?;

            match SectionEditor::new(&mut self.backups).ensure_section(
                &step.path,
                step.marker,
                &step.content,
            ) {
                Ok((outcome, pristine)) => {
                    record.status = outcome.into();
                    record.backup_path = match pristine {
                        Pristine::File(p) => Some(p),
                        Pristine::Absent => None,
                    };
                    let logged = self.log.record(&step.path, step.marker, record.status);
                    records.push(record);
                    if let Err(e) = logged {
                        error = Some(e.to_string());
                        break;
                    }
                }
                Err(e) => {
                    record.status = MutationStatus::Failed;
                    // Best effort; the edit failure is the error that matters.
                    let _ = self
                        .log
                        .record(&step.path, step.marker, MutationStatus::Failed);
                    records.push(record);
                    error = Some(e.to_string());
                    break;
                }
            }
        }

        let mutated = records
            .iter()
            .any(|r| r.status == MutationStatus::Applied);
        let outcome = if error.is_none() {
            ApplyOutcome::FullyApplied
        } else if mutated {
            ApplyOutcome::PartiallyApplied
        } else {
            ApplyOutcome::FailedBeforeMutation
        };

        let report = ApplyReport {
            profile: config.profile,
            timestamp: chrono::Utc::now().to_rfc3339(),
            outcome,
            error,
            records,
        };
        report.save(&self.layout)?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Catalog;
    use crate::sysfs::SysfsRoot;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, Layout, SystemFacts) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();

        fs::create_dir_all(root.join("boot")).unwrap();
        fs::write(root.join("boot/config.txt"), "hdmi_group=1\n").unwrap();
        fs::write(root.join("boot/armbianEnv.txt"), "verbosity=1\n").unwrap();
        fs::create_dir_all(root.join("usr/local/bin")).unwrap();
        fs::write(root.join("usr/local/bin/overkill-fancontrol"), "#!/bin/sh\n").unwrap();

        fs::create_dir_all(root.join("proc/device-tree")).unwrap();
        fs::write(
            root.join("proc/device-tree/model"),
            "Raspberry Pi 5 Model B Rev 1.0\0",
        )
        .unwrap();

        let layout = Layout::new(root);
        let facts = SystemFacts::detect(&SysfsRoot::new(root)).unwrap();
        (tmp, layout, facts)
    }

    fn config(name: ProfileName) -> DesiredConfig {
        Catalog::builtin().unwrap().lookup(name).unwrap().clone()
    }

    #[test]
    fn test_apply_touches_all_targets() {
        let (_tmp, layout, facts) = fixture();
        let mut applier = Applier::new(&layout).unwrap();

        let report = applier
            .apply(&config(ProfileName::Balanced), &facts)
            .unwrap();

        assert_eq!(report.outcome, ApplyOutcome::FullyApplied);
        assert_eq!(report.changed(), 4);
        assert_eq!(report.failed(), 0);

        assert!(
            fs::read_to_string(layout.boot_config())
                .unwrap()
                .contains("arm_freq=2600")
        );
        assert!(
            fs::read_to_string(layout.kernel_env())
                .unwrap()
                .contains("extraargs=cma=512M coherent_pool=2M")
        );
        assert!(
            fs::read_to_string(layout.sysctl_conf())
                .unwrap()
                .contains("vm.swappiness=1")
        );
        assert!(
            fs::read_to_string(layout.thermal_unit())
                .unwrap()
                .contains("--curve 40:0,50:25,60:45,70:75,80:100")
        );
    }

    #[test]
    fn test_reapply_is_all_skips() {
        let (_tmp, layout, facts) = fixture();
        let mut applier = Applier::new(&layout).unwrap();
        let cfg = config(ProfileName::Balanced);

        applier.apply(&cfg, &facts).unwrap();
        let before: Vec<String> = [
            layout.boot_config(),
            layout.kernel_env(),
            layout.sysctl_conf(),
            layout.thermal_unit(),
        ]
        .iter()
        .map(|p| fs::read_to_string(p).unwrap())
        .collect();

        let second = applier.apply(&cfg, &facts).unwrap();
        assert_eq!(second.outcome, ApplyOutcome::FullyApplied);
        assert_eq!(second.changed(), 0);
        assert_eq!(second.skipped(), 4);

        let after: Vec<String> = [
            layout.boot_config(),
            layout.kernel_env(),
            layout.sysctl_conf(),
            layout.thermal_unit(),
        ]
        .iter()
        .map(|p| fs::read_to_string(p).unwrap())
        .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_missing_fan_control_refused_before_mutation() {
        let (tmp, layout, facts) = fixture();
        fs::remove_file(tmp.path().join("usr/local/bin/overkill-fancontrol")).unwrap();

        let boot_before = fs::read_to_string(layout.boot_config()).unwrap();
        let mut applier = Applier::new(&layout).unwrap();
        let err = applier.apply(&config(ProfileName::Safe), &facts);

        assert!(matches!(err, Err(Error::MissingDependency { .. })));
        assert_eq!(fs::read_to_string(layout.boot_config()).unwrap(), boot_before);
    }

    #[test]
    fn test_non_armbian_skips_kernel_args_step() {
        let (tmp, layout, mut facts) = fixture();
        fs::remove_file(tmp.path().join("boot/armbianEnv.txt")).unwrap();
        facts.os_marker_present = false;

        let steps = build_steps(&config(ProfileName::Safe), &facts, &layout);
        assert!(steps.iter().all(|s| s.label != "kernel-args"));
        assert_eq!(steps.len(), 3);
    }

    #[test]
    fn test_plan_reports_without_writing() {
        let (_tmp, layout, facts) = fixture();
        let cfg = config(ProfileName::Extreme);

        let before = fs::read_to_string(layout.boot_config()).unwrap();
        let planned = plan(&cfg, &facts, &layout).unwrap();
        assert_eq!(planned.len(), 4);
        assert!(planned.iter().all(|p| p.state == SectionState::Missing));
        assert_eq!(fs::read_to_string(layout.boot_config()).unwrap(), before);

        let mut applier = Applier::new(&layout).unwrap();
        applier.apply(&cfg, &facts).unwrap();
        let planned = plan(&cfg, &facts, &layout).unwrap();
        assert!(planned.iter().all(|p| p.state == SectionState::UpToDate));
    }

    #[test]
    fn test_report_round_trips_through_state_file() {
        let (_tmp, layout, facts) = fixture();
        let mut applier = Applier::new(&layout).unwrap();
        let report = applier.apply(&config(ProfileName::Safe), &facts).unwrap();

        let loaded = ApplyReport::load(&layout).unwrap().unwrap();
        assert_eq!(loaded.profile, report.profile);
        assert_eq!(loaded.records.len(), report.records.len());
        assert_eq!(loaded.outcome, ApplyOutcome::FullyApplied);
    }
}
