//! Host metrics for the admin pages.

use std::path::Path;

use serde::Serialize;
use sysinfo::{Disks, System};

/// Snapshot of host resource usage.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    /// Global CPU usage in percent.
    pub cpu_percent: f32,
    /// Logical CPU count.
    pub cpu_count: usize,
    /// Total memory in bytes.
    pub memory_total: u64,
    /// Used memory in bytes.
    pub memory_used: u64,
    /// Used memory in percent.
    pub memory_percent: f64,
    /// Capacity of the root filesystem in bytes.
    pub disk_total: u64,
    /// Used space on the root filesystem in bytes.
    pub disk_used: u64,
    /// Used disk space in percent.
    pub disk_percent: f64,
    /// Seconds since boot.
    pub uptime_seconds: u64,
    /// 1, 5, and 15 minute load averages.
    pub load_average: [f64; 3],
    /// OS name.
    pub os: Option<String>,
    /// Kernel version.
    pub kernel: Option<String>,
}

fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (used as f64 / total as f64 * 1000.0).round() / 10.0
    }
}

impl SystemInfo {
    /// Sample the host. Blocks for one CPU measurement interval, so call it
    /// from a blocking task.
    pub fn collect() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        sys.refresh_cpu();

        let disks = Disks::new_with_refreshed_list();
        let root = disks
            .iter()
            .find(|d| d.mount_point() == Path::new("/"))
            .map(|d| (d.total_space(), d.available_space()));
        let (disk_total, disk_available) = root.unwrap_or_else(|| {
            disks.iter().fold((0, 0), |(total, free), d| {
                (total + d.total_space(), free + d.available_space())
            })
        });
        let disk_used = disk_total.saturating_sub(disk_available);

        let load = System::load_average();
        let memory_total = sys.total_memory();
        let memory_used = sys.used_memory();

        Self {
            cpu_percent: sys.global_cpu_info().cpu_usage(),
            cpu_count: sys.cpus().len(),
            memory_total,
            memory_used,
            memory_percent: percent(memory_used, memory_total),
            disk_total,
            disk_used,
            disk_percent: percent(disk_used, disk_total),
            uptime_seconds: System::uptime(),
            load_average: [load.one, load.five, load.fifteen],
            os: System::name(),
            kernel: System::kernel_version(),
        }
    }

    /// [`SystemInfo::collect`] on the blocking pool.
    pub async fn sample() -> Option<Self> {
        tokio::task::spawn_blocking(Self::collect).await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
        assert_eq!(percent(1, 3), 33.3);
    }

    #[test]
    fn test_collect_is_consistent() {
        let info = SystemInfo::collect();
        assert!(info.memory_used <= info.memory_total);
        assert!(info.disk_used <= info.disk_total);
        assert!((0.0..=100.0).contains(&info.memory_percent));
    }
}
