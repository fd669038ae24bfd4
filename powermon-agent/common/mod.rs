pub mod arch;
pub mod clock;
pub mod cpuid;
pub mod msr;
pub mod topology;

pub use arch::{CpuProfile, CpuidSource, UnitScale, Vendor, HOST_CPU};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use msr::{MsrHandle, MsrRegisterSource, RegisterHandle, RegisterSource};
pub use topology::{SocketCore, TopologyProbe};
