pub mod catalog;

use crate::detect::SystemFacts;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use catalog::Catalog;

/// Hard limits for the BCM2712. Values outside these ranges brick boots
/// or cook the SoC regardless of cooling.
const ARM_FREQ_RANGE: std::ops::RangeInclusive<u32> = 600..=3000;
const GPU_FREQ_RANGE: std::ops::RangeInclusive<u32> = 300..=1100;
const OVER_VOLTAGE_RANGE: std::ops::RangeInclusive<i32> = -16..=8;
const VOLTAGE_DELTA_MAX_UV: u32 = 100_000;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ProfileName {
    Safe,
    Balanced,
    Performance,
    Extreme,
    Custom,
}

impl std::fmt::Display for ProfileName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProfileName::Safe => "safe",
            ProfileName::Balanced => "balanced",
            ProfileName::Performance => "performance",
            ProfileName::Extreme => "extreme",
            ProfileName::Custom => "custom",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for ProfileName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "safe" => Ok(ProfileName::Safe),
            "balanced" => Ok(ProfileName::Balanced),
            "performance" => Ok(ProfileName::Performance),
            "extreme" => Ok(ProfileName::Extreme),
            "custom" => Ok(ProfileName::Custom),
            other => Err(Error::UnknownProfile(other.to_string())),
        }
    }
}

/// One point on the fan curve: at or above this temperature, run the fan
/// at least this hard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub temp_c: u32,
    pub fan_state: u32,
}

/// Everything a profile wants the machine to look like. Static data;
/// rendered to file content only at the editor boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredConfig {
    #[serde(default = "default_profile_name")]
    pub profile: ProfileName,
    pub cpu_freq_mhz: u32,
    pub gpu_freq_mhz: u32,
    pub over_voltage: i32,
    /// Extra voltage headroom in microvolts; only the most aggressive
    /// profiles need it.
    #[serde(default)]
    pub voltage_delta_uv: u32,
    /// Sysctl-style keys and values.
    #[serde(default)]
    pub kernel_params: BTreeMap<String, String>,
    /// Literal firmware config lines ensured alongside the rendered
    /// frequency settings.
    #[serde(default)]
    pub boot_config_lines: Vec<String>,
    /// Kernel boot arguments for the u-boot environment.
    #[serde(default)]
    pub extra_boot_args: Vec<String>,
    /// Temperature thresholds to fan states, ascending.
    pub thermal_curve: Vec<CurvePoint>,
    #[serde(default)]
    pub description: String,
}

fn default_profile_name() -> ProfileName {
    ProfileName::Custom
}

impl DesiredConfig {
    /// Validate ranges and the thermal-curve invariant. Called for every
    /// catalog entry at load time; a bad profile never reaches the
    /// applier.
    pub fn validate(&self) -> Result<()> {
        if !ARM_FREQ_RANGE.contains(&self.cpu_freq_mhz) {
            return Err(self.invalid(format!("cpu frequency {} MHz out of range", self.cpu_freq_mhz)));
        }
        if !GPU_FREQ_RANGE.contains(&self.gpu_freq_mhz) {
            return Err(self.invalid(format!("gpu frequency {} MHz out of range", self.gpu_freq_mhz)));
        }
        if !OVER_VOLTAGE_RANGE.contains(&self.over_voltage) {
            return Err(self.invalid(format!("over_voltage {} out of range", self.over_voltage)));
        }
        if self.voltage_delta_uv > VOLTAGE_DELTA_MAX_UV {
            return Err(self.invalid(format!(
                "voltage_delta_uv {} above {} µV limit",
                self.voltage_delta_uv, VOLTAGE_DELTA_MAX_UV
            )));
        }

        if self.thermal_curve.is_empty() {
            return Err(self.invalid("thermal curve is empty".to_string()));
        }
        for pair in self.thermal_curve.windows(2) {
            if pair[1].temp_c <= pair[0].temp_c {
                return Err(self.invalid(format!(
                    "thermal curve thresholds must be strictly increasing ({} after {})",
                    pair[1].temp_c, pair[0].temp_c
                )));
            }
            if pair[1].fan_state < pair[0].fan_state {
                return Err(self.invalid(format!(
                    "fan state must not decrease along the curve ({} after {})",
                    pair[1].fan_state, pair[0].fan_state
                )));
            }
        }

        Ok(())
    }

    fn invalid(&self, reason: String) -> Error {
        Error::InvalidProfile {
            name: self.profile.to_string(),
            reason,
        }
    }
}

/// Safest profile that still makes sense for the detected hardware.
/// Without active cooling, anything beyond stock clocks throttles
/// immediately, so recommend `safe`.
pub fn recommended_for(facts: &SystemFacts) -> ProfileName {
    if !facts.cooling_present {
        return ProfileName::Safe;
    }
    if facts.memory_gib >= 8 {
        ProfileName::Performance
    } else {
        ProfileName::Balanced
    }
}
