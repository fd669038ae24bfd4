//! AMD RAPL register definitions (Family 17h and newer)

/// MSR addresses for AMD RAPL
pub mod msr {
    /// RAPL Power Unit MSR - same field layout as Intel's 0x606
    pub const MSR_AMD_RAPL_POWER_UNIT: u64 = 0xC001_0299;

    /// Core Energy Status - per-core energy consumption
    pub const MSR_AMD_CORE_ENERGY_STATUS: u64 = 0xC001_029A;

    /// Package Energy Status - Total package energy consumption
    pub const MSR_AMD_PKG_ENERGY_STATUS: u64 = 0xC001_029B;
}

/// Vendor string returned by CPUID leaf 0 on AMD processors
pub const VENDOR_ID: &str = "AuthenticAMD";
