use super::{CurvePoint, DesiredConfig, ProfileName};
use crate::error::{Error, Result};
use crate::layout::Layout;
use std::collections::BTreeMap;

/// All profiles known to this run: the built-ins plus, when present, the
/// operator's `custom` profile from `profiles.toml`. Every entry is
/// validated before the catalog is handed out.
#[derive(Debug, Clone)]
pub struct Catalog {
    profiles: BTreeMap<ProfileName, DesiredConfig>,
}

impl Catalog {
    /// Built-in profiles only.
    pub fn builtin() -> Result<Self> {
        let mut profiles = BTreeMap::new();
        for config in [safe(), balanced(), performance(), extreme()] {
            config.validate()?;
            profiles.insert(config.profile, config);
        }
        Ok(Self { profiles })
    }

    /// Built-ins plus the operator's custom profile, if one is defined.
    /// The system file wins; a per-user file is the fallback. A
    /// malformed custom profile fails the whole load; silently accepting
    /// a bad overclock is worse than refusing to start.
    pub fn load(layout: &Layout) -> Result<Self> {
        let mut catalog = Self::builtin()?;

        let Some((path, content)) = read_custom_profile(layout)? else {
            return Ok(catalog);
        };

        let mut config: DesiredConfig =
            toml::from_str(&content).map_err(|e| Error::InvalidProfile {
                name: ProfileName::Custom.to_string(),
                reason: format!("{}: {}", path.display(), e),
            })?;
        config.profile = ProfileName::Custom;
        config.validate()?;
        catalog.profiles.insert(ProfileName::Custom, config);

        Ok(catalog)
    }

    pub fn lookup(&self, name: ProfileName) -> Result<&DesiredConfig> {
        self.profiles
            .get(&name)
            .ok_or_else(|| Error::UnknownProfile(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DesiredConfig> {
        self.profiles.values()
    }
}

/// First readable custom profile file: the system location under the
/// layout root, then the invoking user's config directory (only when
/// operating on the real root, where "the user" means something).
fn read_custom_profile(layout: &Layout) -> Result<Option<(std::path::PathBuf, String)>> {
    let mut candidates = vec![layout.profiles_file()];
    if layout.is_system()
        && let Some(dir) = dirs::config_dir()
    {
        candidates.push(dir.join("overkill").join("profiles.toml"));
    }

    for path in candidates {
        match std::fs::read_to_string(&path) {
            Ok(content) => return Ok(Some((path, content))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(Error::Io { path, source: e }),
        }
    }
    Ok(None)
}

fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Firmware lines every overclocked media profile wants: PCIe gen 3 for
/// the NVMe, 1 GiB of GPU memory, the KMS display stack, and 4Kp60.
const MEDIA_BASE_LINES: &[&str] = &[
    "dtparam=pciex1_gen=3",
    "gpu_mem=1024",
    "dtoverlay=vc4-kms-v3d-pi5",
    "max_framebuffers=3",
    "hdmi_enable_4kp60=1",
];

const EXTRA_BOOT_ARGS: &[&str] = &["cma=512M", "coherent_pool=2M"];

fn safe() -> DesiredConfig {
    DesiredConfig {
        profile: ProfileName::Safe,
        cpu_freq_mhz: 2400,
        gpu_freq_mhz: 900,
        over_voltage: 2,
        voltage_delta_uv: 0,
        kernel_params: params(&[
            ("vm.swappiness", "10"),
            ("vm.vfs_cache_pressure", "75"),
            ("vm.dirty_ratio", "20"),
            ("vm.dirty_background_ratio", "10"),
        ]),
        boot_config_lines: lines(MEDIA_BASE_LINES),
        extra_boot_args: lines(EXTRA_BOOT_ARGS),
        thermal_curve: vec![
            CurvePoint { temp_c: 45, fan_state: 0 },
            CurvePoint { temp_c: 55, fan_state: 20 },
            CurvePoint { temp_c: 65, fan_state: 40 },
            CurvePoint { temp_c: 75, fan_state: 70 },
            CurvePoint { temp_c: 80, fan_state: 100 },
        ],
        description: "Conservative settings for stability".to_string(),
    }
}

fn balanced() -> DesiredConfig {
    let mut boot = lines(MEDIA_BASE_LINES);
    boot.push("force_turbo=1".to_string());
    DesiredConfig {
        profile: ProfileName::Balanced,
        cpu_freq_mhz: 2600,
        gpu_freq_mhz: 950,
        over_voltage: 3,
        voltage_delta_uv: 0,
        kernel_params: params(&[
            ("vm.swappiness", "1"),
            ("vm.vfs_cache_pressure", "50"),
            ("vm.dirty_ratio", "30"),
            ("vm.dirty_background_ratio", "5"),
            ("net.core.rmem_max", "8388608"),
            ("net.core.wmem_max", "8388608"),
        ]),
        boot_config_lines: boot,
        extra_boot_args: lines(EXTRA_BOOT_ARGS),
        thermal_curve: vec![
            CurvePoint { temp_c: 40, fan_state: 0 },
            CurvePoint { temp_c: 50, fan_state: 25 },
            CurvePoint { temp_c: 60, fan_state: 45 },
            CurvePoint { temp_c: 70, fan_state: 75 },
            CurvePoint { temp_c: 80, fan_state: 100 },
        ],
        description: "Good performance with reasonable temps".to_string(),
    }
}

fn performance() -> DesiredConfig {
    let mut boot = lines(MEDIA_BASE_LINES);
    boot.push("force_turbo=1".to_string());
    DesiredConfig {
        profile: ProfileName::Performance,
        cpu_freq_mhz: 2700,
        gpu_freq_mhz: 975,
        over_voltage: 4,
        voltage_delta_uv: 0,
        kernel_params: params(&[
            ("vm.swappiness", "1"),
            ("vm.vfs_cache_pressure", "50"),
            ("vm.dirty_ratio", "40"),
            ("vm.dirty_background_ratio", "5"),
            ("net.core.rmem_max", "16777216"),
            ("net.core.wmem_max", "16777216"),
            ("net.core.netdev_max_backlog", "5000"),
            ("net.ipv4.tcp_fastopen", "3"),
            ("fs.file-max", "2097152"),
        ]),
        boot_config_lines: boot,
        extra_boot_args: lines(EXTRA_BOOT_ARGS),
        thermal_curve: vec![
            CurvePoint { temp_c: 35, fan_state: 10 },
            CurvePoint { temp_c: 45, fan_state: 30 },
            CurvePoint { temp_c: 55, fan_state: 50 },
            CurvePoint { temp_c: 65, fan_state: 80 },
            CurvePoint { temp_c: 75, fan_state: 100 },
        ],
        description: "High performance, requires good cooling".to_string(),
    }
}

fn extreme() -> DesiredConfig {
    let mut boot = lines(MEDIA_BASE_LINES);
    boot.push("force_turbo=1".to_string());
    DesiredConfig {
        profile: ProfileName::Extreme,
        cpu_freq_mhz: 2800,
        gpu_freq_mhz: 1000,
        over_voltage: 5,
        voltage_delta_uv: 50_000,
        kernel_params: params(&[
            ("vm.swappiness", "1"),
            ("vm.vfs_cache_pressure", "50"),
            ("vm.dirty_ratio", "40"),
            ("vm.dirty_background_ratio", "5"),
            ("vm.dirty_writeback_centisecs", "1500"),
            ("vm.dirty_expire_centisecs", "3000"),
            ("net.core.rmem_max", "16777216"),
            ("net.core.wmem_max", "16777216"),
            ("net.core.rmem_default", "8388608"),
            ("net.core.wmem_default", "8388608"),
            ("net.core.optmem_max", "65536"),
            ("net.core.netdev_max_backlog", "5000"),
            ("net.ipv4.tcp_rmem", "4096 87380 16777216"),
            ("net.ipv4.tcp_wmem", "4096 65536 16777216"),
            ("net.ipv4.tcp_congestion_control", "bbr"),
            ("net.ipv4.tcp_fastopen", "3"),
            ("net.ipv4.tcp_mtu_probing", "1"),
            ("fs.file-max", "2097152"),
            ("fs.nr_open", "1048576"),
            ("fs.inotify.max_user_watches", "524288"),
        ]),
        boot_config_lines: boot,
        extra_boot_args: lines(EXTRA_BOOT_ARGS),
        thermal_curve: vec![
            CurvePoint { temp_c: 30, fan_state: 20 },
            CurvePoint { temp_c: 40, fan_state: 40 },
            CurvePoint { temp_c: 50, fan_state: 60 },
            CurvePoint { temp_c: 60, fan_state: 85 },
            CurvePoint { temp_c: 70, fan_state: 100 },
        ],
        description: "Maximum performance, excellent cooling required".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_profiles_all_validate() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.iter().count(), 4);
        for name in [
            ProfileName::Safe,
            ProfileName::Balanced,
            ProfileName::Performance,
            ProfileName::Extreme,
        ] {
            catalog.lookup(name).unwrap();
        }
    }

    #[test]
    fn test_custom_missing_without_profiles_file() {
        let catalog = Catalog::builtin().unwrap();
        assert!(matches!(
            catalog.lookup(ProfileName::Custom),
            Err(Error::UnknownProfile(_))
        ));
    }

    #[test]
    fn test_profiles_get_more_aggressive() {
        let catalog = Catalog::builtin().unwrap();
        let freqs: Vec<u32> = catalog.iter().map(|p| p.cpu_freq_mhz).collect();
        let mut sorted = freqs.clone();
        sorted.sort();
        assert_eq!(freqs, sorted);
    }

    #[test]
    fn test_load_custom_profile() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path());
        fs::create_dir_all(tmp.path().join("etc/overkill")).unwrap();
        fs::write(
            layout.profiles_file(),
            r#"
cpu_freq_mhz = 2500
gpu_freq_mhz = 920
over_voltage = 2
description = "tuned for my board"

[kernel_params]
"vm.swappiness" = "5"

[[thermal_curve]]
temp_c = 50
fan_state = 30

[[thermal_curve]]
temp_c = 65
fan_state = 70

[[thermal_curve]]
temp_c = 75
fan_state = 100
"#,
        )
        .unwrap();

        let catalog = Catalog::load(&layout).unwrap();
        let custom = catalog.lookup(ProfileName::Custom).unwrap();
        assert_eq!(custom.profile, ProfileName::Custom);
        assert_eq!(custom.cpu_freq_mhz, 2500);
        assert_eq!(custom.kernel_params["vm.swappiness"], "5");
        assert_eq!(custom.thermal_curve.len(), 3);
    }

    #[test]
    fn test_load_rejects_malformed_custom_curve() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path());
        fs::create_dir_all(tmp.path().join("etc/overkill")).unwrap();
        fs::write(
            layout.profiles_file(),
            r#"
cpu_freq_mhz = 2500
gpu_freq_mhz = 920
over_voltage = 2

[[thermal_curve]]
temp_c = 60
fan_state = 30

[[thermal_curve]]
temp_c = 50
fan_state = 70
"#,
        )
        .unwrap();

        assert!(matches!(
            Catalog::load(&layout),
            Err(Error::InvalidProfile { .. })
        ));
    }

    #[test]
    fn test_load_without_file_is_builtin_only() {
        let tmp = TempDir::new().unwrap();
        let catalog = Catalog::load(&Layout::new(tmp.path())).unwrap();
        assert_eq!(catalog.iter().count(), 4);
    }
}
