use crate::sysfs::SysfsRoot;

const COOLING_DEVICE: &str = "sys/class/thermal/cooling_device0";

/// Whether the kernel registered an active cooling device (the official
/// active cooler or a fan HAT). Absence means passive cooling only.
pub fn present(sysfs: &SysfsRoot) -> bool {
    sysfs.exists(COOLING_DEVICE)
}
