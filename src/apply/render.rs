use crate::profile::DesiredConfig;
use std::path::Path;

/// Firmware overclock block: the profile's literal lines plus the
/// frequency and voltage settings rendered from the typed config. This
/// is the only place profile numbers become text.
pub fn boot_config_block(cfg: &DesiredConfig) -> String {
    let mut lines = vec![format!("# Profile: {}", cfg.profile)];
    if !cfg.description.is_empty() {
        lines.push(format!("# {}", cfg.description));
    }
    lines.extend(cfg.boot_config_lines.iter().cloned());
    lines.push(format!("arm_freq={}", cfg.cpu_freq_mhz));
    lines.push(format!("gpu_freq={}", cfg.gpu_freq_mhz));
    lines.push(format!("over_voltage={}", cfg.over_voltage));
    if cfg.voltage_delta_uv > 0 {
        lines.push(format!("over_voltage_delta={}", cfg.voltage_delta_uv));
    }
    lines.join("\n")
}

/// Extra kernel arguments for the u-boot environment.
pub fn kernel_args_block(cfg: &DesiredConfig) -> String {
    format!("extraargs={}", cfg.extra_boot_args.join(" "))
}

/// Sysctl drop-in, one key=value per line. BTreeMap ordering keeps the
/// rendering stable across runs.
pub fn sysctl_block(cfg: &DesiredConfig) -> String {
    cfg.kernel_params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Thermal management unit. The fan curve travels on the daemon's
/// command line as `temp:state` pairs, so changing profiles rewrites
/// exactly one file.
pub fn thermal_unit_block(cfg: &DesiredConfig, fan_control_bin: &Path) -> String {
    let curve = cfg
        .thermal_curve
        .iter()
        .map(|p| format!("{}:{}", p.temp_c, p.fan_state))
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "[Unit]\n\
         Description=OVERKILL Intelligent Thermal Management\n\
         After=multi-user.target\n\
         \n\
         [Service]\n\
         Type=simple\n\
         ExecStart={} --curve {}\n\
         Restart=always\n\
         RestartSec=5\n\
         \n\
         [Install]\n\
         WantedBy=multi-user.target",
        fan_control_bin.display(),
        curve
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{Catalog, ProfileName};

    fn extreme() -> DesiredConfig {
        Catalog::builtin()
            .unwrap()
            .lookup(ProfileName::Extreme)
            .unwrap()
            .clone()
    }

    #[test]
    fn test_boot_config_block_renders_frequencies() {
        let block = boot_config_block(&extreme());
        assert!(block.contains("arm_freq=2800"));
        assert!(block.contains("gpu_freq=1000"));
        assert!(block.contains("over_voltage=5"));
        assert!(block.contains("over_voltage_delta=50000"));
        assert!(block.contains("force_turbo=1"));
        assert!(block.starts_with("# Profile: extreme"));
    }

    #[test]
    fn test_boot_config_block_omits_zero_delta() {
        let safe = Catalog::builtin()
            .unwrap()
            .lookup(ProfileName::Safe)
            .unwrap()
            .clone();
        let block = boot_config_block(&safe);
        assert!(!block.contains("over_voltage_delta"));
        assert!(!block.contains("force_turbo"));
    }

    #[test]
    fn test_kernel_args_block() {
        assert_eq!(
            kernel_args_block(&extreme()),
            "extraargs=cma=512M coherent_pool=2M"
        );
    }

    #[test]
    fn test_sysctl_block_is_sorted_key_value() {
        let block = sysctl_block(&extreme());
        assert!(block.contains("net.ipv4.tcp_congestion_control=bbr"));
        assert!(block.contains("vm.swappiness=1"));
        let lines: Vec<&str> = block.lines().collect();
        let mut sorted = lines.clone();
        sorted.sort();
        assert_eq!(lines, sorted);
    }

    #[test]
    fn test_thermal_unit_embeds_curve_and_exec() {
        let unit = thermal_unit_block(&extreme(), Path::new("/usr/local/bin/overkill-fancontrol"));
        assert!(unit.contains(
            "ExecStart=/usr/local/bin/overkill-fancontrol --curve 30:20,40:40,50:60,60:85,70:100"
        ));
        assert!(unit.contains("[Install]"));
        assert!(unit.contains("WantedBy=multi-user.target"));
    }
}
