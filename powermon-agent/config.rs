use std::path::PathBuf;
use std::time::Duration;

use powermon_raw::msr::DEFAULT_MSR_ROOT;

use crate::error::{PowermonError, Result};

pub const DEFAULT_SYSFS_CPU_ROOT: &str = "/sys/devices/system/cpu";
pub const DEFAULT_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowermonConfig {
    /// Delay between two consecutive samples
    pub interval: Duration,
    /// Directory holding `online` and `cpu<N>/topology/physical_package_id`
    pub sysfs_cpu_root: PathBuf,
    /// Directory holding `<N>/msr` device nodes
    pub msr_root: PathBuf,
}

impl Default for PowermonConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            sysfs_cpu_root: PathBuf::from(DEFAULT_SYSFS_CPU_ROOT),
            msr_root: PathBuf::from(DEFAULT_MSR_ROOT),
        }
    }
}

impl PowermonConfig {
    /// Create a configuration sampling every `interval_ms` milliseconds
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            ..Default::default()
        }
    }

    pub fn with_sysfs_cpu_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sysfs_cpu_root = root.into();
        self
    }

    pub fn with_msr_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.msr_root = root.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(PowermonError::ConfigError(
                "sampling interval must be at least 1 ms".into(),
            ));
        }
        Ok(())
    }
}
