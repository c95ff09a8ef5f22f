use crate::error::Result;
use crate::sysfs::SysfsRoot;

const MEMINFO_PATH: &str = "proc/meminfo";

/// Total memory rounded to whole GiB, from `MemTotal` in /proc/meminfo.
/// Kernels reserve a slice of physical RAM, so an 8 GiB board reports a
/// little under 8 GiB; rounding to the nearest GiB recovers the marketed
/// size.
pub fn total_gib(sysfs: &SysfsRoot) -> Result<u64> {
    let Some(meminfo) = sysfs.read_optional(MEMINFO_PATH)? else {
        return Ok(0);
    };

    let kib = meminfo
        .lines()
        .find_map(|line| line.strip_prefix("MemTotal:"))
        .and_then(|rest| rest.trim().split_whitespace().next())
        .and_then(|n| n.parse::<u64>().ok())
        .unwrap_or(0);

    Ok((kib + 512 * 1024) / (1024 * 1024))
}
