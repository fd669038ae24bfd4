use std::path::PathBuf;

use powermon_raw::msr::DEFAULT_MSR_ROOT;
use powermon_raw::MsrDevice;

use crate::error::Result;

/// An open register-access resource bound to one logical CPU
pub trait RegisterHandle: Send {
    /// 8-byte read at `offset`
    fn read(&self, offset: u64) -> Result<u64>;

    fn cpu_id(&self) -> u32;
}

/// Opens register handles by logical CPU id
pub trait RegisterSource {
    type Handle: RegisterHandle;

    fn open(&self, cpu: u32) -> Result<Self::Handle>;
}

pub struct MsrHandle {
    device: MsrDevice,
}

impl MsrHandle {
    pub fn new(device: MsrDevice) -> Self {
        Self { device }
    }
}

impl RegisterHandle for MsrHandle {
    fn read(&self, offset: u64) -> Result<u64> {
        let value = self.device.read(offset)?;
        tracing::debug!(
            "MSR read: CPU {} MSR 0x{:08x} = 0x{:016x}",
            self.device.cpu(),
            offset,
            value
        );
        Ok(value)
    }

    fn cpu_id(&self) -> u32 {
        self.device.cpu()
    }
}

impl Drop for MsrHandle {
    fn drop(&mut self) {
        tracing::debug!("Closing MSR handle for core {}", self.device.cpu());
    }
}

/// `/dev/cpu/<N>/msr` device nodes, opened read-only
#[derive(Debug, Clone)]
pub struct MsrRegisterSource {
    root: PathBuf,
}

impl MsrRegisterSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for MsrRegisterSource {
    fn default() -> Self {
        Self::new(DEFAULT_MSR_ROOT)
    }
}

impl RegisterSource for MsrRegisterSource {
    type Handle = MsrHandle;

    fn open(&self, cpu: u32) -> Result<MsrHandle> {
        let device = MsrDevice::open_in(&self.root, cpu)?;
        tracing::info!("Opened MSR handle for core {}", cpu);
        Ok(MsrHandle::new(device))
    }
}
