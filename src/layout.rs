use std::path::{Path, PathBuf};

/// Resolves every path this tool mutates or persists under one
/// filesystem root. Production uses `/`; tests and staged image builds
/// point it at a scratch directory.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
        }
    }
}

impl Layout {
    pub fn system() -> Self {
        Self::default()
    }

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True when this layout operates on the live system rather than a
    /// staged root.
    pub fn is_system(&self) -> bool {
        self.root == Path::new("/")
    }

    /// Firmware boot configuration (overclock lines live here).
    pub fn boot_config(&self) -> PathBuf {
        self.root.join("boot/config.txt")
    }

    /// Kernel boot argument file (Armbian u-boot environment).
    pub fn kernel_env(&self) -> PathBuf {
        self.root.join("boot/armbianEnv.txt")
    }

    /// Sysctl drop-in owned by this tool.
    pub fn sysctl_conf(&self) -> PathBuf {
        self.root.join("etc/sysctl.d/99-overkill.conf")
    }

    /// Thermal management service unit.
    pub fn thermal_unit(&self) -> PathBuf {
        self.root.join("etc/systemd/system/overkill-thermal.service")
    }

    /// Fan control executable the thermal unit runs. Installed by the
    /// package layer; we only verify it exists.
    pub fn fan_control_bin(&self) -> PathBuf {
        self.root.join("usr/local/bin/overkill-fancontrol")
    }

    /// State directory for backups, the transaction log, and the last
    /// apply report.
    pub fn state_dir(&self) -> PathBuf {
        self.root.join("var/lib/overkill")
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.state_dir().join("backups")
    }

    pub fn backup_index(&self) -> PathBuf {
        self.backups_dir().join("index.json")
    }

    pub fn mutation_log(&self) -> PathBuf {
        self.state_dir().join("mutation-state.log")
    }

    pub fn last_apply(&self) -> PathBuf {
        self.state_dir().join("last-apply.json")
    }

    /// Operator-defined profile overrides.
    pub fn profiles_file(&self) -> PathBuf {
        self.root.join("etc/overkill/profiles.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_layout_paths() {
        let layout = Layout::system();
        assert!(layout.is_system());
        assert_eq!(layout.boot_config(), PathBuf::from("/boot/config.txt"));
        assert_eq!(
            layout.mutation_log(),
            PathBuf::from("/var/lib/overkill/mutation-state.log")
        );
    }

    #[test]
    fn test_staged_layout_is_not_system() {
        let layout = Layout::new("/tmp/stage");
        assert!(!layout.is_system());
        assert_eq!(
            layout.sysctl_conf(),
            PathBuf::from("/tmp/stage/etc/sysctl.d/99-overkill.conf")
        );
    }
}
