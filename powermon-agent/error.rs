use std::io;
use std::path::PathBuf;
use thiserror::Error;

use powermon_raw::MsrError;

#[derive(Error, Debug)]
pub enum PowermonError {
    #[error("MSR operation failed: {0}")]
    MsrError(#[from] MsrError),

    #[error("Failed to read topology from {}: {source}", .path.display())]
    TopologyIo { path: PathBuf, source: io::Error },

    #[error("Malformed topology in {}: {reason}", .path.display())]
    TopologyFormat { path: PathBuf, reason: String },

    #[error("RAPL operation failed: {0}")]
    RaplError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl PowermonError {
    /// Process exit status for this error
    ///
    /// A missing CPU and a CPU without MSR support get their own statuses so
    /// wrappers can tell host misconfiguration apart from I/O faults.
    pub fn exit_code(&self) -> i32 {
        match self {
            PowermonError::MsrError(MsrError::NoSuchCpu { .. }) => 2,
            PowermonError::MsrError(MsrError::Unsupported { .. }) => 3,
            PowermonError::ConfigError(_) => 64,
            _ => 127,
        }
    }
}

pub type Result<T> = std::result::Result<T, PowermonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let no_cpu = PowermonError::from(MsrError::NoSuchCpu { cpu: 4 });
        assert_eq!(no_cpu.exit_code(), 2);
        assert_eq!(no_cpu.to_string(), "MSR operation failed: No CPU 4");

        let unsupported = PowermonError::from(MsrError::Unsupported { cpu: 0 });
        assert_eq!(unsupported.exit_code(), 3);

        let short = PowermonError::from(MsrError::ShortRead {
            cpu: 0,
            msr: 0x611,
            len: 0,
        });
        assert_eq!(short.exit_code(), 127);

        let topology = PowermonError::TopologyFormat {
            path: PathBuf::from("/sys/devices/system/cpu/online"),
            reason: "empty".into(),
        };
        assert_eq!(topology.exit_code(), 127);
    }
}
