//! Vendor-neutral RAPL register layouts
//!
//! Intel and AMD expose the same unit-register format (at different MSR
//! addresses) and 32-bit wide energy status counters.
//!
//! ## References
//!
//! - Intel® 64 and IA-32 Architectures Software Developer's Manual, Volume 3B,
//!   Section 15.10: Platform Specific Power Management Support
//! - AMD Processor Programming Reference (PPR), MSRC001_0299..MSRC001_029B

use crate::register::{bits, RegisterLayout};

/// Mask applied to every energy status read; the upper 32 bits are reserved
pub const ENERGY_COUNTER_MASK: u64 = 0xFFFF_FFFF;

/// Full-scale value of an energy status counter before it wraps
pub const ENERGY_COUNTER_MAX: u64 = u32::MAX as u64;

/// RAPL Power Unit Register layout
///
/// Defines the units for energy, power, and time measurements.
///
/// ## Register Format
///
/// | Bits   | Field        | Description                           |
/// |--------|--------------|---------------------------------------|
/// | 0-3    | power_units  | Power units (1/2^PU watts)            |
/// | 4-7    | reserved     |                                       |
/// | 8-12   | energy_units | Energy units (1/2^ESU joules)         |
/// | 13-15  | reserved     |                                       |
/// | 16-19  | time_units   | Time units (1/2^TU seconds)           |
/// | 20-63  | reserved     |                                       |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RaplPowerUnit {
    /// Power units: watts = value * (1.0 / 2^power_units)
    pub power_units: u8,

    /// Energy units: joules = value * (1.0 / 2^energy_units)
    pub energy_units: u8,

    /// Time units: seconds = value * (1.0 / 2^time_units)
    pub time_units: u8,
}

impl RegisterLayout for RaplPowerUnit {
    fn to_msr_value(&self) -> u64 {
        (self.power_units as u64 & 0x0F)
            | ((self.energy_units as u64 & 0x1F) << 8)
            | ((self.time_units as u64 & 0x0F) << 16)
    }

    fn from_msr_value(value: u64) -> Self {
        Self {
            power_units: bits(value, 0, 4) as u8,
            energy_units: bits(value, 8, 5) as u8,
            time_units: bits(value, 16, 4) as u8,
        }
    }
}

impl RaplPowerUnit {
    /// Get power unit multiplier (watts per LSB)
    pub fn power_unit_multiplier(&self) -> f64 {
        0.5f64.powi(self.power_units as i32)
    }

    /// Get energy unit multiplier (joules per LSB)
    pub fn energy_unit_multiplier(&self) -> f64 {
        0.5f64.powi(self.energy_units as i32)
    }

    /// Get time unit multiplier (seconds per LSB)
    pub fn time_unit_multiplier(&self) -> f64 {
        0.5f64.powi(self.time_units as i32)
    }
}

/// Package Power Info Register layout (Intel only)
///
/// ## Register Format
///
/// | Bits   | Field               | Description                     |
/// |--------|---------------------|---------------------------------|
/// | 0-14   | thermal_spec_power  | TDP, in power units             |
/// | 16-30  | minimum_power       | Minimum power, in power units   |
/// | 32-46  | maximum_power       | Maximum power, in power units   |
/// | 48-62  | maximum_time_window | Max time window, in time units  |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PkgPowerInfo {
    pub thermal_spec_power: u16,
    pub minimum_power: u16,
    pub maximum_power: u16,
    pub maximum_time_window: u16,
}

impl RegisterLayout for PkgPowerInfo {
    fn to_msr_value(&self) -> u64 {
        (self.thermal_spec_power as u64 & 0x7FFF)
            | ((self.minimum_power as u64 & 0x7FFF) << 16)
            | ((self.maximum_power as u64 & 0x7FFF) << 32)
            | ((self.maximum_time_window as u64 & 0x7FFF) << 48)
    }

    fn from_msr_value(value: u64) -> Self {
        Self {
            thermal_spec_power: bits(value, 0, 15) as u16,
            minimum_power: bits(value, 16, 15) as u16,
            maximum_power: bits(value, 32, 15) as u16,
            maximum_time_window: bits(value, 48, 15) as u16,
        }
    }
}
