//! # powermon-raw
//!
//! RAPL (Running Average Power Limit) register definitions for Intel and AMD
//! processors.
//!
//! This crate provides the MSR addresses of the energy status counters for
//! both vendors, type-safe layouts for the unit and power-info registers, and
//! a minimal read-only handle over the Linux `msr` driver
//! (`/dev/cpu/*/msr`).
//!
//! ## Usage
//!
//! ```ignore
//! use powermon_raw::arch::intel;
//! use powermon_raw::rapl::RaplPowerUnit;
//! use powermon_raw::{MsrDevice, RegisterLayout};
//!
//! let device = MsrDevice::open(0)?;
//! let units = RaplPowerUnit::from_msr_value(device.read(intel::msr::MSR_RAPL_POWER_UNIT)?);
//! println!("1 energy tick = {} J", units.energy_unit_multiplier());
//! ```

pub mod arch;
pub mod msr;
pub mod rapl;
pub mod register;

// Re-export for convenience
pub use msr::{MsrDevice, MsrError, Result};
pub use register::RegisterLayout;
