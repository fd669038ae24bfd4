//! MSR (Model-Specific Register) read primitives
//!
//! This module provides low-level, read-only MSR access through
//! `/dev/cpu/*/msr`. A [`MsrDevice`] keeps its file descriptor open for its
//! whole lifetime and performs positioned 8-byte reads, so a single handle can
//! be read repeatedly without seeking.

use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

/// Default location of the per-CPU MSR device nodes
pub const DEFAULT_MSR_ROOT: &str = "/dev/cpu";

pub type Result<T> = std::result::Result<T, MsrError>;

/// Errors that can occur during MSR operations
#[derive(Debug, thiserror::Error)]
pub enum MsrError {
    #[error("No CPU {cpu}")]
    NoSuchCpu { cpu: u32 },

    #[error("CPU {cpu} doesn't support MSRs")]
    Unsupported { cpu: u32 },

    #[error("Failed to open {} for CPU {cpu}: {source}", .path.display())]
    OpenFailed {
        cpu: u32,
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to read MSR 0x{msr:X} on CPU {cpu}: {source}")]
    ReadFailed {
        cpu: u32,
        msr: u64,
        source: io::Error,
    },

    #[error("Short read of MSR 0x{msr:X} on CPU {cpu}: got {len} of 8 bytes")]
    ShortRead { cpu: u32, msr: u64, len: usize },
}

impl MsrError {
    /// Classify a failed `open(2)` of an MSR device node
    ///
    /// The msr driver reports `ENXIO` for an offline or absent CPU and `EIO`
    /// when the CPU has no MSR support at all.
    pub fn from_open(cpu: u32, path: &Path, source: io::Error) -> Self {
        match source.raw_os_error() {
            Some(libc::ENXIO) => MsrError::NoSuchCpu { cpu },
            Some(libc::EIO) => MsrError::Unsupported { cpu },
            _ => MsrError::OpenFailed {
                cpu,
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// Read-only handle to one CPU's MSR device
#[derive(Debug)]
pub struct MsrDevice {
    file: File,
    cpu: u32,
}

impl MsrDevice {
    /// Open `/dev/cpu/<cpu>/msr`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The CPU does not exist ([`MsrError::NoSuchCpu`])
    /// - The CPU has no MSR support ([`MsrError::Unsupported`])
    /// - The device cannot be opened for any other reason, most commonly a
    ///   missing `msr` kernel module or lacking root/CAP_SYS_RAWIO
    pub fn open(cpu: u32) -> Result<Self> {
        Self::open_in(Path::new(DEFAULT_MSR_ROOT), cpu)
    }

    /// Open `<root>/<cpu>/msr`
    pub fn open_in(root: &Path, cpu: u32) -> Result<Self> {
        let path = root.join(cpu.to_string()).join("msr");
        let file = File::open(&path).map_err(|e| MsrError::from_open(cpu, &path, e))?;

        Ok(Self { file, cpu })
    }

    /// Read a 64-bit value from an MSR
    ///
    /// # Example
    ///
    /// ```ignore
    /// use powermon_raw::MsrDevice;
    ///
    /// let device = MsrDevice::open(0)?;
    /// let value = device.read(0x611)?;
    /// println!("MSR 0x611 = 0x{:016X}", value);
    /// ```
    pub fn read(&self, msr: u64) -> Result<u64> {
        let mut buffer = [0u8; 8];
        let len = self
            .file
            .read_at(&mut buffer, msr)
            .map_err(|e| MsrError::ReadFailed {
                cpu: self.cpu,
                msr,
                source: e,
            })?;

        if len != buffer.len() {
            return Err(MsrError::ShortRead {
                cpu: self.cpu,
                msr,
                len,
            });
        }

        Ok(u64::from_le_bytes(buffer))
    }

    pub fn cpu(&self) -> u32 {
        self.cpu
    }
}
