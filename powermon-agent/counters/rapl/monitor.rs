use serde::Serialize;

use powermon_raw::rapl::{PkgPowerInfo, ENERGY_COUNTER_MASK};
use powermon_raw::RegisterLayout;

use crate::common::arch::{CpuProfile, UnitScale, VendorStrategy, HOST_CPU};
use crate::common::clock::{Clock, MonotonicClock};
use crate::common::msr::{MsrHandle, MsrRegisterSource, RegisterHandle, RegisterSource};
use crate::common::topology::{SocketCore, TopologyProbe};
use crate::config::PowermonConfig;
use crate::counters::rapl::snapshot::{DomainCounters, SocketReadings};
use crate::error::{PowermonError, Result};
use crate::metrics::rapl::{PowerReport, RaplDomain};

/// Identity of one sampled socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SocketInfo {
    /// Physical package id
    pub socket_id: u32,
    /// Logical CPU whose MSRs are read for this package
    pub core_id: u32,
}

/// Package power limits advertised by `MSR_PKG_POWER_INFO`, zero when the
/// vendor has no such register
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PowerInfo {
    /// Watts
    pub thermal_spec_power: f64,
    /// Watts
    pub minimum_power: f64,
    /// Watts
    pub maximum_power: f64,
    /// Seconds
    pub time_window: f64,
}

impl PowerInfo {
    fn decode(raw: u64, units: &UnitScale) -> Self {
        let info = PkgPowerInfo::from_msr_value(raw);
        Self {
            thermal_spec_power: units.power_units * info.thermal_spec_power as f64,
            minimum_power: units.power_units * info.minimum_power as f64,
            maximum_power: units.power_units * info.maximum_power as f64,
            time_window: units.time_units * info.maximum_time_window as f64,
        }
    }
}

/// Samples RAPL energy counters on every socket
///
/// Raw ticks are kept unscaled in both the snapshots and the running totals;
/// [`UnitScale`] is applied only by [`PowerReport`].
pub struct RaplSampler<H: RegisterHandle = MsrHandle> {
    profile: CpuProfile,
    strategy: &'static VendorStrategy,
    units: UnitScale,
    power_info: PowerInfo,
    sockets: Vec<SocketInfo>,
    handles: Vec<H>,
    readings: Vec<SocketReadings>,
    clock: Box<dyn Clock>,
}

impl RaplSampler<MsrHandle> {
    /// Detect the host CPU and topology, and open `/dev/cpu/<N>/msr` for the
    /// first core of every socket
    pub fn new(config: &PowermonConfig) -> Result<Self> {
        let topology = TopologyProbe::new(&config.sysfs_cpu_root).discover()?;
        Self::with_parts(
            *HOST_CPU,
            &topology,
            &MsrRegisterSource::new(&config.msr_root),
            Box::new(MonotonicClock::new()),
        )
    }
}

impl<H: RegisterHandle> RaplSampler<H> {
    pub fn with_parts<S>(
        profile: CpuProfile,
        topology: &[SocketCore],
        source: &S,
        clock: Box<dyn Clock>,
    ) -> Result<Self>
    where
        S: RegisterSource<Handle = H>,
    {
        if topology.is_empty() {
            return Err(PowermonError::RaplError("no sockets discovered".into()));
        }

        let strategy = profile.vendor.strategy();

        let mut sockets = Vec::with_capacity(topology.len());
        let mut handles = Vec::with_capacity(topology.len());
        for socket in topology {
            handles.push(source.open(socket.core_id)?);
            sockets.push(SocketInfo {
                socket_id: socket.socket_id,
                core_id: socket.core_id,
            });
        }

        let raw_units = handles[0].read(strategy.registers.power_unit)?;
        let units = (strategy.decode_units)(raw_units);
        tracing::info!(
            "RAPL units: power {} W, energy {} J, time {} s",
            units.power_units,
            units.energy_units,
            units.time_units
        );

        let power_info = match strategy.registers.power_info {
            Some(register) => PowerInfo::decode(handles[0].read(register)?, &units),
            None => PowerInfo::default(),
        };

        let mut sampler = Self {
            profile,
            strategy,
            units,
            power_info,
            readings: vec![SocketReadings::default(); sockets.len()],
            sockets,
            handles,
            clock,
        };
        sampler.reset()?;

        Ok(sampler)
    }

    /// Re-seed every socket with two real readings and zero the totals
    pub fn reset(&mut self) -> Result<()> {
        for index in 0..self.sockets.len() {
            self.sample_socket(index)?;
            self.sample_socket(index)?;

            // Accounting starts at the seed reading, not after it
            let seeded_at = self.readings[index].current().timestamp;
            self.readings[index].reset_total(seeded_at);
        }
        Ok(())
    }

    /// Take one reading on every socket
    pub fn sample(&mut self) -> Result<()> {
        for index in 0..self.sockets.len() {
            self.sample_socket(index)?;
        }
        Ok(())
    }

    /// Take one reading on the socket at `index` (discovery order)
    pub fn sample_socket(&mut self, index: usize) -> Result<()> {
        let handle = self.handles.get(index).ok_or_else(|| {
            PowermonError::RaplError(format!(
                "socket index {index} out of range ({} sockets)",
                self.sockets.len()
            ))
        })?;

        let mut counters = DomainCounters::default();
        for &domain in RaplDomain::ALL {
            if let Some(register) = self
                .strategy
                .domain_register(domain, self.profile.pp1_supported)
            {
                *counters.get_mut(domain) = handle.read(register)? & ENERGY_COUNTER_MASK;
            }
        }
        let timestamp = self.clock.now();

        self.readings[index].record(counters, timestamp);
        Ok(())
    }

    /// Domains with a backing register on this CPU
    pub fn measured_domains(&self) -> Vec<RaplDomain> {
        RaplDomain::ALL
            .iter()
            .copied()
            .filter(|&domain| {
                self.strategy
                    .domain_register(domain, self.profile.pp1_supported)
                    .is_some()
            })
            .collect()
    }

    pub fn report(&self) -> PowerReport<'_> {
        PowerReport::new(self.units, &self.readings, self.measured_domains())
    }

    pub fn units(&self) -> &UnitScale {
        &self.units
    }

    pub fn power_info(&self) -> &PowerInfo {
        &self.power_info
    }

    pub fn sockets(&self) -> &[SocketInfo] {
        &self.sockets
    }

    pub fn n_sockets(&self) -> usize {
        self.sockets.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::common::arch::Vendor;
    use crate::common::clock::ManualClock;
    use crate::common::msr::fake::FakeRegisters;
    use powermon_raw::arch::{amd, intel};

    const MAX: u64 = u32::MAX as u64;

    fn one_socket() -> Vec<SocketCore> {
        vec![SocketCore {
            socket_id: 0,
            core_id: 0,
        }]
    }

    fn intel_registers(cpu: u32) -> FakeRegisters {
        let registers = FakeRegisters::default();
        seed_intel(&registers, cpu);
        registers
    }

    fn seed_intel(registers: &FakeRegisters, cpu: u32) {
        registers.set(cpu, intel::msr::MSR_RAPL_POWER_UNIT, 0);
        registers.set(cpu, intel::msr::MSR_PKG_POWER_INFO, 0);
        for register in [
            intel::msr::MSR_PKG_ENERGY_STATUS,
            intel::msr::MSR_PP0_ENERGY_STATUS,
            intel::msr::MSR_PP1_ENERGY_STATUS,
            intel::msr::MSR_DRAM_ENERGY_STATUS,
        ] {
            registers.set(cpu, register, 0);
        }
    }

    fn intel_profile(pp1: bool) -> CpuProfile {
        // Coffee Lake keeps PP1, Broadwell-E does not
        let signature = if pp1 { 0x906EA } else { 0x406F1 };
        let profile = CpuProfile::new(Vendor::Intel, signature);
        assert_eq!(profile.pp1_supported, pp1);
        profile
    }

    fn sampler(
        profile: CpuProfile,
        topology: &[SocketCore],
        registers: &FakeRegisters,
        clock: &ManualClock,
    ) -> RaplSampler<crate::common::msr::fake::FakeHandle> {
        RaplSampler::with_parts(profile, topology, registers, Box::new(clock.clone())).unwrap()
    }

    #[test]
    fn test_reset_zeroes_totals() {
        let registers = intel_registers(0);
        registers.set(0, intel::msr::MSR_PKG_ENERGY_STATUS, 123_456);
        let clock = ManualClock::new();
        clock.set(Duration::from_secs(3));

        let sampler = sampler(intel_profile(true), &one_socket(), &registers, &clock);
        let report = sampler.report();

        for &domain in RaplDomain::ALL {
            assert_eq!(report.total_energy(domain), 0.0);
            assert_eq!(report.average_power(domain), 0.0);
            assert_eq!(report.current_power(domain), 0.0);
        }
        assert!(report.total_time() >= 0.0);
        assert_eq!(registers.opened(), vec![0]);
    }

    /// Moves forward by `step` on every read
    struct SteppingClock {
        now: parking_lot::Mutex<Duration>,
        step: Duration,
    }

    impl Clock for SteppingClock {
        fn now(&self) -> Duration {
            let mut now = self.now.lock();
            *now += self.step;
            *now
        }
    }

    #[test]
    fn test_reset_with_advancing_clock() {
        let registers = intel_registers(0);
        let clock = SteppingClock {
            now: parking_lot::Mutex::new(Duration::ZERO),
            step: Duration::from_millis(10),
        };
        let mut sampler =
            RaplSampler::with_parts(intel_profile(true), &one_socket(), &registers, Box::new(clock))
                .unwrap();

        let report = sampler.report();
        assert_eq!(report.total_time(), 0.0);
        for &domain in RaplDomain::ALL {
            let average = report.average_power(domain);
            assert!(average >= 0.0 && average.is_sign_positive());
        }

        registers.set(0, intel::msr::MSR_PKG_ENERGY_STATUS, 400);
        sampler.sample().unwrap();
        assert!(sampler.report().total_time() > 0.0);

        sampler.reset().unwrap();
        let report = sampler.report();
        assert_eq!(report.total_time(), 0.0);
        assert_eq!(report.total_energy(RaplDomain::Package), 0.0);
        for &domain in RaplDomain::ALL {
            let average = report.average_power(domain);
            assert!(average >= 0.0 && average.is_sign_positive());
        }
    }

    #[test]
    fn test_units_and_power_info_decoded_from_first_socket() {
        let registers = intel_registers(0);
        registers.set(0, intel::msr::MSR_RAPL_POWER_UNIT, 0x000A_0E03);
        registers.set(
            0,
            intel::msr::MSR_PKG_POWER_INFO,
            PkgPowerInfo {
                thermal_spec_power: 760,
                minimum_power: 400,
                maximum_power: 1600,
                maximum_time_window: 0x28,
            }
            .to_msr_value(),
        );

        let sampler = sampler(intel_profile(true), &one_socket(), &registers, &ManualClock::new());

        assert_eq!(sampler.units().energy_units, 1.0 / 16384.0);
        assert_eq!(sampler.power_info().thermal_spec_power, 95.0);
        assert_eq!(sampler.power_info().minimum_power, 50.0);
        assert_eq!(sampler.power_info().maximum_power, 200.0);
        assert_eq!(sampler.power_info().time_window, 40.0 / 1024.0);
    }

    #[test]
    fn test_wrapping_sequence_end_to_end() {
        let registers = intel_registers(0);
        let clock = ManualClock::new();
        registers.set(0, intel::msr::MSR_PKG_ENERGY_STATUS, 1000);

        let mut sampler = sampler(intel_profile(true), &one_socket(), &registers, &clock);

        clock.set(Duration::from_secs(1));
        registers.set(0, intel::msr::MSR_PKG_ENERGY_STATUS, 1500);
        sampler.sample().unwrap();

        clock.set(Duration::from_secs(2));
        registers.set(0, intel::msr::MSR_PKG_ENERGY_STATUS, 4_294_967_200);
        sampler.sample().unwrap();

        let report = sampler.report();
        // 4294967200 >= 1500, so the last step is a plain subtraction
        let last_delta = 4_294_967_200u64 - 1500;
        assert_eq!(report.total_time(), 2.0);
        assert_eq!(report.total_energy(RaplDomain::Package), (500 + last_delta) as f64);
        assert_eq!(
            report.average_power(RaplDomain::Package),
            (500 + last_delta) as f64 / 2.0
        );
        assert_eq!(report.current_time(), 1.0);
        assert_eq!(report.current_power(RaplDomain::Package), last_delta as f64);

        clock.set(Duration::from_secs(3));
        registers.set(0, intel::msr::MSR_PKG_ENERGY_STATUS, 1000);
        sampler.sample().unwrap();

        let wrapped = 1000 + (MAX - 4_294_967_200);
        let report = sampler.report();
        assert_eq!(
            report.total_energy(RaplDomain::Package),
            (500 + last_delta + wrapped) as f64
        );
        assert_eq!(report.current_power(RaplDomain::Package), wrapped as f64);
    }

    #[test]
    fn test_rollover_between_ticks() {
        let registers = intel_registers(0);
        let clock = ManualClock::new();
        registers.set(0, intel::msr::MSR_PKG_ENERGY_STATUS, 1500);

        let mut sampler = sampler(intel_profile(true), &one_socket(), &registers, &clock);

        clock.set(Duration::from_secs(1));
        registers.set(0, intel::msr::MSR_PKG_ENERGY_STATUS, 1000);
        sampler.sample().unwrap();

        let expected = 1000 + (MAX - 1500);
        let report = sampler.report();
        assert_eq!(report.total_energy(RaplDomain::Package), expected as f64);
        assert_eq!(report.average_power(RaplDomain::Package), expected as f64);
    }

    #[test]
    fn test_upper_bits_are_masked() {
        let registers = intel_registers(0);
        let clock = ManualClock::new();
        registers.set(0, intel::msr::MSR_PKG_ENERGY_STATUS, 0xABCD_0000_0000_0010);

        let mut sampler = sampler(intel_profile(true), &one_socket(), &registers, &clock);

        clock.set(Duration::from_secs(1));
        registers.set(0, intel::msr::MSR_PKG_ENERGY_STATUS, 0x1234_0000_0000_0030);
        sampler.sample().unwrap();

        assert_eq!(sampler.report().total_energy(RaplDomain::Package), 32.0);
    }

    #[test]
    fn test_uncore_total_independent_of_core() {
        let registers = intel_registers(0);
        let clock = ManualClock::new();
        let mut sampler = sampler(intel_profile(true), &one_socket(), &registers, &clock);

        clock.set(Duration::from_secs(1));
        registers.set(0, intel::msr::MSR_PP0_ENERGY_STATUS, 10_000);
        registers.set(0, intel::msr::MSR_PP1_ENERGY_STATUS, 30);
        sampler.sample().unwrap();

        clock.set(Duration::from_secs(2));
        registers.set(0, intel::msr::MSR_PP0_ENERGY_STATUS, 25_000);
        registers.set(0, intel::msr::MSR_PP1_ENERGY_STATUS, 45);
        sampler.sample().unwrap();

        let report = sampler.report();
        assert_eq!(report.total_energy(RaplDomain::Core), 25_000.0);
        assert_eq!(report.total_energy(RaplDomain::Uncore), 45.0);
        assert_eq!(report.total_energy(RaplDomain::Dram), 0.0);
    }

    #[test]
    fn test_dram_measured_without_pp1() {
        let registers = intel_registers(0);
        let clock = ManualClock::new();
        let mut sampler = sampler(intel_profile(false), &one_socket(), &registers, &clock);
        assert_eq!(
            sampler.measured_domains(),
            vec![RaplDomain::Package, RaplDomain::Core, RaplDomain::Dram]
        );

        clock.set(Duration::from_secs(1));
        registers.set(0, intel::msr::MSR_DRAM_ENERGY_STATUS, 800);
        registers.set(0, intel::msr::MSR_PP1_ENERGY_STATUS, 999);
        sampler.sample().unwrap();

        let report = sampler.report();
        assert_eq!(report.total_energy(RaplDomain::Dram), 800.0);
        assert_eq!(report.total_energy(RaplDomain::Uncore), 0.0);
    }

    #[test]
    fn test_amd_only_samples_package() {
        let registers = FakeRegisters::default();
        registers.set(0, amd::msr::MSR_AMD_RAPL_POWER_UNIT, 0);
        registers.set(0, amd::msr::MSR_AMD_PKG_ENERGY_STATUS, 0);
        // Present but must never be consumed
        registers.set(0, amd::msr::MSR_AMD_CORE_ENERGY_STATUS, 0);
        let clock = ManualClock::new();

        let profile = CpuProfile::new(Vendor::Amd, 0x00A2_0F12);
        let mut sampler = sampler(profile, &one_socket(), &registers, &clock);
        assert_eq!(sampler.measured_domains(), vec![RaplDomain::Package]);
        assert_eq!(*sampler.power_info(), PowerInfo::default());

        for tick in 1..=5u64 {
            clock.set(Duration::from_secs(tick));
            registers.set(0, amd::msr::MSR_AMD_PKG_ENERGY_STATUS, tick * 1000);
            registers.set(0, amd::msr::MSR_AMD_CORE_ENERGY_STATUS, tick * 777);
            sampler.sample().unwrap();

            let report = sampler.report();
            assert_eq!(report.total_energy(RaplDomain::Core), 0.0);
            assert_eq!(report.total_energy(RaplDomain::Uncore), 0.0);
            assert_eq!(report.total_energy(RaplDomain::Dram), 0.0);
        }
        assert_eq!(sampler.report().total_energy(RaplDomain::Package), 5000.0);
    }

    #[test]
    fn test_totals_are_summed_across_sockets() {
        let registers = intel_registers(0);
        seed_intel(&registers, 8);
        let topology = vec![
            SocketCore {
                socket_id: 0,
                core_id: 0,
            },
            SocketCore {
                socket_id: 1,
                core_id: 8,
            },
        ];
        let clock = ManualClock::new();
        let mut sampler = sampler(intel_profile(true), &topology, &registers, &clock);
        assert_eq!(registers.opened(), vec![0, 8]);
        assert_eq!(sampler.n_sockets(), 2);
        assert_eq!(
            sampler.sockets()[1],
            SocketInfo {
                socket_id: 1,
                core_id: 8
            }
        );

        clock.set(Duration::from_secs(2));
        registers.set(0, intel::msr::MSR_PKG_ENERGY_STATUS, 300);
        registers.set(8, intel::msr::MSR_PKG_ENERGY_STATUS, 500);
        sampler.sample().unwrap();

        let report = sampler.report();
        assert_eq!(report.total_energy(RaplDomain::Package), 800.0);
        assert_eq!(report.average_power(RaplDomain::Package), 400.0);
        assert_eq!(report.socket_total_energy(1, RaplDomain::Package), 500.0);
    }

    #[test]
    fn test_sample_single_socket_leaves_others_untouched() {
        let registers = intel_registers(0);
        seed_intel(&registers, 4);
        let topology = vec![
            SocketCore {
                socket_id: 0,
                core_id: 0,
            },
            SocketCore {
                socket_id: 1,
                core_id: 4,
            },
        ];
        let clock = ManualClock::new();
        let mut sampler = sampler(intel_profile(true), &topology, &registers, &clock);

        registers.set(0, intel::msr::MSR_PKG_ENERGY_STATUS, 10);
        registers.set(4, intel::msr::MSR_PKG_ENERGY_STATUS, 20);
        sampler.sample_socket(1).unwrap();

        let report = sampler.report();
        assert_eq!(report.socket_total_energy(0, RaplDomain::Package), 0.0);
        assert_eq!(report.socket_total_energy(1, RaplDomain::Package), 20.0);

        assert!(sampler.sample_socket(2).is_err());
    }

    #[test]
    fn test_read_failure_is_propagated() {
        let registers = FakeRegisters::default();
        registers.set(0, intel::msr::MSR_RAPL_POWER_UNIT, 0);
        registers.set(0, intel::msr::MSR_PKG_POWER_INFO, 0);

        let result = RaplSampler::with_parts(
            intel_profile(true),
            &one_socket(),
            &registers,
            Box::new(ManualClock::new()),
        );
        assert!(matches!(result, Err(PowermonError::MsrError(_))));
    }

    #[test]
    fn test_empty_topology_rejected() {
        let result = RaplSampler::with_parts(
            intel_profile(true),
            &[],
            &FakeRegisters::default(),
            Box::new(ManualClock::new()),
        );
        assert!(matches!(result, Err(PowermonError::RaplError(_))));
    }
}
