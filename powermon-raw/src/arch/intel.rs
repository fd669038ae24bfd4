//! Intel RAPL register definitions
//!
//! PP1 and DRAM share the same physical budget on client parts; server parts
//! from the Sandy Bridge-E, Ivy Bridge-E and Broadwell-E families do not
//! expose a usable PP1 counter and report DRAM instead.

/// MSR addresses for Intel RAPL
pub mod msr {
    /// RAPL Power Unit MSR - Defines energy, power, and time units
    pub const MSR_RAPL_POWER_UNIT: u64 = 0x606;

    /// Package Energy Status - Total package energy consumption
    pub const MSR_PKG_ENERGY_STATUS: u64 = 0x611;

    /// Package Power Info - Package TDP and limits
    pub const MSR_PKG_POWER_INFO: u64 = 0x614;

    /// DRAM Energy Status - Memory controller energy consumption
    pub const MSR_DRAM_ENERGY_STATUS: u64 = 0x619;

    /// PP0 Energy Status - Core energy consumption
    pub const MSR_PP0_ENERGY_STATUS: u64 = 0x639;

    /// PP1 Energy Status - Uncore / integrated graphics energy consumption
    pub const MSR_PP1_ENERGY_STATUS: u64 = 0x641;
}

/// CPUID.1:EAX bits covering extended family, extended model, family and model
pub const SIGNATURE_MASK: u32 = 0xFFFF0;

/// CPU signatures (masked with [`SIGNATURE_MASK`])
pub mod signature {
    pub const SANDYBRIDGE_E: u32 = 0x206D0;
    pub const IVYBRIDGE_E: u32 = 0x306F0;
    pub const BROADWELL_E: u32 = 0x406F0;
}

/// Signatures on which PP1 cannot be distinguished from DRAM
pub const PP1_UNSUPPORTED_SIGNATURES: [u32; 3] = [
    signature::SANDYBRIDGE_E,
    signature::IVYBRIDGE_E,
    signature::BROADWELL_E,
];
