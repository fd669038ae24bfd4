// CPU vendor detection and per-vendor RAPL register strategy

use once_cell::sync::Lazy;
use serde::Serialize;

use powermon_raw::arch::{amd, intel};
use powermon_raw::rapl::RaplPowerUnit;
use powermon_raw::RegisterLayout;

use crate::common::cpuid;
use crate::metrics::rapl::RaplDomain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Vendor {
    Intel,
    Amd,
}

impl Vendor {
    pub fn name(&self) -> &'static str {
        match self {
            Vendor::Intel => "Intel",
            Vendor::Amd => "AMD",
        }
    }

    /// Classify a CPUID vendor string; anything that is not AMD takes the
    /// Intel-compatible path.
    pub fn from_vendor_id(vendor_id: &str) -> Self {
        if vendor_id == amd::VENDOR_ID {
            Vendor::Amd
        } else {
            Vendor::Intel
        }
    }

    pub fn strategy(&self) -> &'static VendorStrategy {
        match self {
            Vendor::Intel => &INTEL_STRATEGY,
            Vendor::Amd => &AMD_STRATEGY,
        }
    }
}

/// Unit scale factors, decoded once from the vendor's power unit register
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UnitScale {
    /// Watts per LSB
    pub power_units: f64,
    /// Joules per LSB
    pub energy_units: f64,
    /// Seconds per LSB
    pub time_units: f64,
}

impl UnitScale {
    pub const UNITY: UnitScale = UnitScale {
        power_units: 1.0,
        energy_units: 1.0,
        time_units: 1.0,
    };

    fn from_power_unit(unit: RaplPowerUnit) -> Self {
        Self {
            power_units: unit.power_unit_multiplier(),
            energy_units: unit.energy_unit_multiplier(),
            time_units: unit.time_unit_multiplier(),
        }
    }
}

fn decode_intel_units(raw: u64) -> UnitScale {
    UnitScale::from_power_unit(RaplPowerUnit::from_msr_value(raw))
}

// Family 17h+ mirrors Intel's field layout at 0xC0010299
fn decode_amd_units(raw: u64) -> UnitScale {
    UnitScale::from_power_unit(RaplPowerUnit::from_msr_value(raw))
}

/// MSR addresses of the registers one vendor exposes
#[derive(Debug, Clone, Copy)]
pub struct RegisterMap {
    pub power_unit: u64,
    pub package: u64,
    pub core: Option<u64>,
    pub uncore: Option<u64>,
    pub dram: Option<u64>,
    pub power_info: Option<u64>,
}

/// Everything that differs between vendors, selected once per process
#[derive(Debug)]
pub struct VendorStrategy {
    pub registers: RegisterMap,
    pub decode_units: fn(u64) -> UnitScale,
    /// Whether PP1 can ever be read on this vendor
    pub has_secondary_plane: bool,
}

impl VendorStrategy {
    /// Register sampled for `domain`, or `None` when the domain is pinned at 0
    ///
    /// PP1 and DRAM are mutually exclusive: `pp1_supported` selects one.
    pub fn domain_register(&self, domain: RaplDomain, pp1_supported: bool) -> Option<u64> {
        match domain {
            RaplDomain::Package => Some(self.registers.package),
            RaplDomain::Core => self.registers.core,
            RaplDomain::Uncore if pp1_supported => self.registers.uncore,
            RaplDomain::Uncore => None,
            RaplDomain::Dram if pp1_supported => None,
            RaplDomain::Dram => self.registers.dram,
        }
    }
}

static INTEL_STRATEGY: VendorStrategy = VendorStrategy {
    registers: RegisterMap {
        power_unit: intel::msr::MSR_RAPL_POWER_UNIT,
        package: intel::msr::MSR_PKG_ENERGY_STATUS,
        core: Some(intel::msr::MSR_PP0_ENERGY_STATUS),
        uncore: Some(intel::msr::MSR_PP1_ENERGY_STATUS),
        dram: Some(intel::msr::MSR_DRAM_ENERGY_STATUS),
        power_info: Some(intel::msr::MSR_PKG_POWER_INFO),
    },
    decode_units: decode_intel_units,
    has_secondary_plane: true,
};

// The per-core energy MSR is deliberately not part of the map: attribution
// is per socket only.
static AMD_STRATEGY: VendorStrategy = VendorStrategy {
    registers: RegisterMap {
        power_unit: amd::msr::MSR_AMD_RAPL_POWER_UNIT,
        package: amd::msr::MSR_AMD_PKG_ENERGY_STATUS,
        core: None,
        uncore: None,
        dram: None,
        power_info: None,
    },
    decode_units: decode_amd_units,
    has_secondary_plane: false,
};

/// Source of CPU identification data
pub trait CpuidSource {
    /// Leaf 0 vendor string, e.g. `GenuineIntel`
    fn vendor_id(&self) -> String;

    /// Leaf 1 EAX
    fn signature(&self) -> u32;
}

/// Reads identification from the executing processor
#[derive(Debug, Clone, Copy, Default)]
pub struct HostCpuid;

impl CpuidSource for HostCpuid {
    fn vendor_id(&self) -> String {
        cpuid::vendor_id()
    }

    fn signature(&self) -> u32 {
        cpuid::processor_signature()
    }
}

/// Detection result consumed by the sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CpuProfile {
    pub vendor: Vendor,
    /// CPUID.1:EAX masked to family/model
    pub signature: u32,
    pub pp1_supported: bool,
}

impl CpuProfile {
    pub fn new(vendor: Vendor, signature: u32) -> Self {
        let signature = signature & intel::SIGNATURE_MASK;
        Self {
            vendor,
            signature,
            pp1_supported: supports_secondary_plane(vendor, signature),
        }
    }
}

/// Whether PP1 is distinguishable from DRAM on this chip
pub fn supports_secondary_plane(vendor: Vendor, signature: u32) -> bool {
    if !vendor.strategy().has_secondary_plane {
        return false;
    }
    !intel::PP1_UNSUPPORTED_SIGNATURES.contains(&(signature & intel::SIGNATURE_MASK))
}

pub fn detect(source: &dyn CpuidSource) -> CpuProfile {
    let vendor_id = source.vendor_id();
    let vendor = Vendor::from_vendor_id(&vendor_id);
    if vendor == Vendor::Intel && vendor_id != "GenuineIntel" {
        tracing::warn!(
            "Unrecognized CPU vendor {:?}, assuming Intel-compatible RAPL",
            vendor_id
        );
    }

    let profile = CpuProfile::new(vendor, source.signature());

    tracing::info!(
        "CPU: vendor {} signature {:05X}, PP1 {}",
        vendor.name(),
        profile.signature,
        if profile.pp1_supported {
            "supported"
        } else {
            "unsupported (measuring DRAM)"
        }
    );

    profile
}

pub static HOST_CPU: Lazy<CpuProfile> = Lazy::new(|| detect(&HostCpuid));

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedCpuid {
        vendor: &'static str,
        eax: u32,
    }

    impl CpuidSource for FixedCpuid {
        fn vendor_id(&self) -> String {
            self.vendor.to_string()
        }

        fn signature(&self) -> u32 {
            self.eax
        }
    }

    #[test]
    fn test_amd_detection() {
        let profile = detect(&FixedCpuid {
            vendor: "AuthenticAMD",
            eax: 0x00A2_0F12,
        });
        assert_eq!(profile.vendor, Vendor::Amd);
        assert!(!profile.pp1_supported);
    }

    #[test]
    fn test_unknown_vendor_falls_back_to_intel() {
        let profile = detect(&FixedCpuid {
            vendor: "HygonGenuine",
            eax: 0x0009_06EA,
        });
        assert_eq!(profile.vendor, Vendor::Intel);
        assert!(profile.pp1_supported);
    }

    #[test]
    fn test_signature_is_masked_before_lookup() {
        // Broadwell-E stepping 1
        let profile = detect(&FixedCpuid {
            vendor: "GenuineIntel",
            eax: 0x0004_06F1,
        });
        assert_eq!(profile.signature, 0x406F0);
        assert!(!profile.pp1_supported);
    }

    #[test]
    fn test_secondary_plane_support_table() {
        assert!(!supports_secondary_plane(Vendor::Intel, 0x206D7));
        assert!(!supports_secondary_plane(Vendor::Intel, 0x306F2));
        assert!(!supports_secondary_plane(Vendor::Intel, 0x406F1));
        assert!(supports_secondary_plane(Vendor::Intel, 0x50654));
        assert!(supports_secondary_plane(Vendor::Intel, 0x906EA));
        assert!(!supports_secondary_plane(Vendor::Amd, 0x906EA));
    }

    #[test]
    fn test_domain_registers_are_mutually_exclusive() {
        let intel = Vendor::Intel.strategy();
        assert_eq!(intel.domain_register(RaplDomain::Package, true), Some(0x611));
        assert_eq!(intel.domain_register(RaplDomain::Core, false), Some(0x639));
        assert_eq!(intel.domain_register(RaplDomain::Uncore, true), Some(0x641));
        assert_eq!(intel.domain_register(RaplDomain::Dram, true), None);
        assert_eq!(intel.domain_register(RaplDomain::Uncore, false), None);
        assert_eq!(intel.domain_register(RaplDomain::Dram, false), Some(0x619));

        let amd = Vendor::Amd.strategy();
        assert_eq!(amd.domain_register(RaplDomain::Package, false), Some(0xC001_029B));
        for domain in [RaplDomain::Core, RaplDomain::Uncore, RaplDomain::Dram] {
            assert_eq!(amd.domain_register(domain, false), None);
            assert_eq!(amd.domain_register(domain, true), None);
        }
    }

    #[test]
    fn test_unit_decoding() {
        let scale = (Vendor::Intel.strategy().decode_units)(0x000A_0E03);
        assert_eq!(scale.power_units, 0.125);
        assert_eq!(scale.energy_units, 1.0 / 16384.0);
        assert_eq!(scale.time_units, 1.0 / 1024.0);

        let scale = (Vendor::Amd.strategy().decode_units)(0x000A_1003);
        assert_eq!(scale.energy_units, 1.0 / 65536.0);
    }
}
