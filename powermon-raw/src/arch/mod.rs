//! Vendor-specific register definitions
//!
//! Intel and AMD place their RAPL counters at different MSR addresses and
//! expose different sets of power domains.
//!
//! - **Intel** - package, PP0 (cores), PP1 (uncore/graphics), DRAM
//! - **AMD** (Family 17h and newer) - package and per-core energy

pub mod amd;
pub mod intel;
