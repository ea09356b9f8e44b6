/// Host and volume descriptors recorded in the report, plus the
/// memory-derived default worker count.
use crate::model::{HostInfo, VolumeInfo};
use std::path::Path;
use sysinfo::{Disks, System};

/// Memory budgeted per scan worker when deriving the default pool size.
const MEMORY_PER_WORKER: u64 = 512 * 1024 * 1024;
const MIN_WORKERS: usize = 2;
const MAX_WORKERS: usize = 10;

fn total_memory() -> u64 {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.total_memory()
}

/// Default worker count for parallel scans.
///
/// Scanning is I/O-bound, so the pool is sized from installed memory rather
/// than CPU count: one worker per 512 MiB, clamped to 2..=10.
pub fn default_workers() -> usize {
    workers_for_memory(total_memory())
}

fn workers_for_memory(bytes: u64) -> usize {
    let by_memory = usize::try_from(bytes / MEMORY_PER_WORKER).unwrap_or(MAX_WORKERS);
    by_memory.clamp(MIN_WORKERS, MAX_WORKERS)
}

/// Describe the machine the scan runs on.
pub fn host_info() -> HostInfo {
    HostInfo {
        computer_name: System::host_name(),
        system_name: System::name(),
        system_version: System::os_version(),
        machine_arch: std::env::consts::ARCH.to_string(),
        cpu_count: num_cpus::get(),
        total_memory: total_memory(),
    }
}

/// Find the mounted volume that contains `path` (longest mount-point prefix).
///
/// Returns `None` when no mounted disk matches, e.g. inside some containers.
pub fn volume_for(path: &Path) -> Option<VolumeInfo> {
    let disks = Disks::new_with_refreshed_list();
    disks
        .iter()
        .filter(|d| path.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())
        .map(|d| VolumeInfo {
            mount_point: d.mount_point().to_string_lossy().into_owned(),
            file_system: d.file_system().to_string_lossy().into_owned(),
            total_space: d.total_space(),
            available_space: d.available_space(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_count_is_clamped() {
        assert_eq!(workers_for_memory(0), MIN_WORKERS);
        assert_eq!(workers_for_memory(3 * MEMORY_PER_WORKER), 3);
        assert_eq!(workers_for_memory(64 * 1024 * MEMORY_PER_WORKER), MAX_WORKERS);
    }

    #[test]
    fn host_info_reports_arch_and_cpus() {
        let host = host_info();
        assert!(!host.machine_arch.is_empty());
        assert!(host.cpu_count >= 1);
    }
}
