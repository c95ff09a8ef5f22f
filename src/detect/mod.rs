pub mod cooling;
pub mod memory;
pub mod platform;
pub mod storage;

use crate::error::Result;
use crate::sysfs::SysfsRoot;
use serde::Serialize;

pub use storage::StorageDevice;

/// Immutable snapshot of everything the applier needs to know about the
/// host. Built once per run; detection itself has no side effects.
#[derive(Debug, Clone, Serialize)]
pub struct SystemFacts {
    /// Raw platform identifier from the device tree.
    pub hardware_model: String,
    /// Whether the Armbian boot environment file is present.
    pub os_marker_present: bool,
    /// All block devices that could hold the media library. When several
    /// qualify, all are listed; selection is the operator's call.
    pub storage: Vec<StorageDevice>,
    pub memory_gib: u64,
    /// Whether an active cooling device is registered.
    pub cooling_present: bool,
}

impl SystemFacts {
    pub fn detect(sysfs: &SysfsRoot) -> Result<Self> {
        Ok(Self {
            hardware_model: platform::hardware_model(sysfs)?,
            os_marker_present: platform::os_marker_present(sysfs),
            storage: storage::detect(sysfs)?,
            memory_gib: memory::total_gib(sysfs)?,
            cooling_present: cooling::present(sysfs),
        })
    }

    pub fn is_pi5(&self) -> bool {
        self.hardware_model.contains("Raspberry Pi 5")
    }

    pub fn primary_candidates(&self) -> impl Iterator<Item = &StorageDevice> {
        self.storage.iter().filter(|d| d.is_primary_candidate)
    }
}

/// Check the host against the appliance baseline. Issues are
/// informational; they are shown to the operator, not enforced.
pub fn check_requirements(facts: &SystemFacts) -> Vec<String> {
    let mut issues = Vec::new();

    if !facts.is_pi5() {
        issues.push(format!(
            "not a Raspberry Pi 5 (detected: {})",
            if facts.hardware_model.is_empty() {
                "unknown"
            } else {
                facts.hardware_model.as_str()
            }
        ));
    }

    if facts.memory_gib < 4 {
        issues.push(format!(
            "insufficient memory: {} GiB (minimum 4 GiB)",
            facts.memory_gib
        ));
    }

    if facts.primary_candidates().next().is_none() {
        issues.push("no NVMe storage detected".to_string());
    }

    if !facts.cooling_present {
        issues.push("no active cooling detected".to_string());
    }

    issues
}
