use crate::error::Result;
use crate::sysfs::SysfsRoot;
use serde::Serialize;

const BLOCK_DIR: &str = "sys/block";

#[derive(Debug, Clone, Serialize)]
pub struct StorageDevice {
    /// Kernel block device name, e.g. `nvme0n1` or `mmcblk0`.
    pub name: String,
    /// NVMe devices are where the media library should live.
    pub is_primary_candidate: bool,
}

/// Enumerate block devices. Loop and ram devices are noise, not storage.
pub fn detect(sysfs: &SysfsRoot) -> Result<Vec<StorageDevice>> {
    let mut devices = Vec::new();
    for name in sysfs.list_dir(BLOCK_DIR)? {
        if name.starts_with("loop") || name.starts_with("ram") || name.starts_with("zram") {
            continue;
        }
        let is_primary_candidate = name.starts_with("nvme");
        devices.push(StorageDevice {
            name,
            is_primary_candidate,
        });
    }
    Ok(devices)
}
