use crate::error::Result;
use crate::sysfs::SysfsRoot;

const MODEL_PATH: &str = "proc/device-tree/model";
const OS_MARKER_PATH: &str = "boot/armbianEnv.txt";

/// Raw platform identifier. Empty string when the device tree does not
/// expose a model (x86 hosts, containers).
pub fn hardware_model(sysfs: &SysfsRoot) -> Result<String> {
    Ok(sysfs.read_optional(MODEL_PATH)?.unwrap_or_default())
}

/// Whether the Armbian boot environment exists. Decides which kernel
/// argument conventions apply.
pub fn os_marker_present(sysfs: &SysfsRoot) -> bool {
    sysfs.exists(OS_MARKER_PATH)
}
