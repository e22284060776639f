//! Readiness checks consumed by the surrounding application
//!
//! The system is healthy when the data root's disk has room, the sensor is
//! delivering, and at least one body is tracked.

use serde::Serialize;
use std::path::{Path, PathBuf};
use sysinfo::Disks;
use tracing::debug;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthReport {
    pub disk_ok: bool,
    /// Free space on the data root's disk, if the disk could be found
    pub free_mb: Option<u64>,
    pub sensor_available: bool,
    pub bodies_found: bool,
    pub healthy: bool,
}

pub struct HealthMonitor {
    data_root: PathBuf,
    min_free_mb: u64,
}

impl HealthMonitor {
    pub fn new(data_root: impl Into<PathBuf>, min_free_mb: u64) -> Self {
        Self {
            data_root: data_root.into(),
            min_free_mb,
        }
    }

    pub fn check(&self, sensor_available: bool, tracked_bodies: usize) -> HealthReport {
        let free_mb = self.free_space_mb();
        evaluate(free_mb, self.min_free_mb, sensor_available, tracked_bodies)
    }

    /// Free megabytes on the disk holding the data root
    pub fn free_space_mb(&self) -> Option<u64> {
        let root = self
            .data_root
            .canonicalize()
            .unwrap_or_else(|_| self.data_root.clone());

        let disks = Disks::new_with_refreshed_list();
        let mounts: Vec<(PathBuf, u64)> = disks
            .list()
            .iter()
            .map(|disk| (disk.mount_point().to_path_buf(), disk.available_space()))
            .collect();

        let free = available_bytes_for(&root, &mounts).map(|bytes| bytes / (1024 * 1024));
        debug!("Free space for {}: {:?} MB", root.display(), free);
        free
    }
}

/// Combine the individual readings into a report
pub fn evaluate(
    free_mb: Option<u64>,
    min_free_mb: u64,
    sensor_available: bool,
    tracked_bodies: usize,
) -> HealthReport {
    let disk_ok = free_mb.is_some_and(|mb| mb > min_free_mb);
    let bodies_found = tracked_bodies > 0;

    HealthReport {
        disk_ok,
        free_mb,
        sensor_available,
        bodies_found,
        healthy: disk_ok && sensor_available && bodies_found,
    }
}

/// Available bytes of the most specific mount containing `path`
pub fn available_bytes_for(path: &Path, mounts: &[(PathBuf, u64)]) -> Option<u64> {
    mounts
        .iter()
        .filter(|(mount, _)| path.starts_with(mount))
        .max_by_key(|(mount, _)| mount.components().count())
        .map(|(_, available)| *available)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_specific_mount_wins() {
        let mounts = vec![
            (PathBuf::from("/"), 10),
            (PathBuf::from("/data"), 20),
            (PathBuf::from("/data/archive"), 30),
        ];
        assert_eq!(available_bytes_for(Path::new("/data/phrases"), &mounts), Some(20));
        assert_eq!(available_bytes_for(Path::new("/home/user"), &mounts), Some(10));
        assert_eq!(available_bytes_for(Path::new("relative"), &mounts), None);
    }

    #[test]
    fn test_healthy_needs_everything() {
        assert!(evaluate(Some(2048), 1024, true, 1).healthy);
        assert!(!evaluate(Some(1024), 1024, true, 1).healthy);
        assert!(!evaluate(None, 1024, true, 1).healthy);
        assert!(!evaluate(Some(2048), 1024, false, 1).healthy);

        let report = evaluate(Some(2048), 1024, true, 0);
        assert!(!report.healthy);
        assert!(!report.bodies_found);
        assert!(report.disk_ok);
    }
}
