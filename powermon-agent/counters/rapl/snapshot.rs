use std::time::Duration;

use powermon_raw::rapl::ENERGY_COUNTER_MAX;

use crate::metrics::rapl::RaplDomain;

/// Ticks consumed between two raw counter readings
///
/// A reading lower than its predecessor means the 32-bit counter wrapped
/// once in between.
#[inline]
pub fn energy_delta(before: u64, after: u64) -> u64 {
    if after >= before {
        after - before
    } else {
        after + (ENERGY_COUNTER_MAX - before)
    }
}

/// Average power in watts between two raw readings `dt` seconds apart
///
/// A zero interval yields 0.0 instead of a division by zero.
pub fn power(energy_units: f64, before: u64, after: u64, dt: f64) -> f64 {
    if dt == 0.0 {
        return 0.0;
    }
    energy_units * energy_delta(before, after) as f64 / dt
}

/// Seconds from `begin` to `end`, negative if `end` precedes `begin`
pub fn elapsed_secs(begin: Duration, end: Duration) -> f64 {
    end.as_secs_f64() - begin.as_secs_f64()
}

/// One raw value per RAPL domain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DomainCounters {
    pub package: u64,
    pub core: u64,
    pub uncore: u64,
    pub dram: u64,
}

impl DomainCounters {
    pub fn get(&self, domain: RaplDomain) -> u64 {
        match domain {
            RaplDomain::Package => self.package,
            RaplDomain::Core => self.core,
            RaplDomain::Uncore => self.uncore,
            RaplDomain::Dram => self.dram,
        }
    }

    pub fn get_mut(&mut self, domain: RaplDomain) -> &mut u64 {
        match domain {
            RaplDomain::Package => &mut self.package,
            RaplDomain::Core => &mut self.core,
            RaplDomain::Uncore => &mut self.uncore,
            RaplDomain::Dram => &mut self.dram,
        }
    }
}

/// Raw counter values captured at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CounterSnapshot {
    pub counters: DomainCounters,
    pub timestamp: Duration,
}

/// Accumulated raw ticks since the last reset
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningTotal {
    pub counters: DomainCounters,
    pub reset_timestamp: Duration,
}

/// Role of a slot in the snapshot ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Prev = 0,
    Current = 1,
    Next = 2,
}

/// Three snapshot slots rotated in place
///
/// New readings are written into [`Slot::Next`]; [`SnapshotRing::rotate`]
/// then turns it into `Current`, the old `Current` into `Prev`, and the
/// retired `Prev` into the scratch `Next` slot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotRing {
    slots: [CounterSnapshot; 3],
    head: usize,
}

impl SnapshotRing {
    fn index(&self, slot: Slot) -> usize {
        (self.head + slot as usize) % 3
    }

    pub fn get(&self, slot: Slot) -> &CounterSnapshot {
        &self.slots[self.index(slot)]
    }

    pub fn get_mut(&mut self, slot: Slot) -> &mut CounterSnapshot {
        let index = self.index(slot);
        &mut self.slots[index]
    }

    pub fn rotate(&mut self) {
        self.head = (self.head + 1) % 3;
    }
}

/// Per-socket sampling state: snapshot ring plus running totals
#[derive(Debug, Clone, Default)]
pub struct SocketReadings {
    ring: SnapshotRing,
    total: RunningTotal,
}

impl SocketReadings {
    /// Fold a new reading into the totals and make it the current snapshot
    pub fn record(&mut self, counters: DomainCounters, timestamp: Duration) {
        let current = self.ring.get(Slot::Current).counters;
        for &domain in RaplDomain::ALL {
            *self.total.counters.get_mut(domain) +=
                energy_delta(current.get(domain), counters.get(domain));
        }

        *self.ring.get_mut(Slot::Next) = CounterSnapshot {
            counters,
            timestamp,
        };
        self.ring.rotate();
    }

    /// Zero the running totals and restart the clock at `timestamp`
    pub fn reset_total(&mut self, timestamp: Duration) {
        self.total = RunningTotal {
            counters: DomainCounters::default(),
            reset_timestamp: timestamp,
        };
    }

    pub fn previous(&self) -> &CounterSnapshot {
        self.ring.get(Slot::Prev)
    }

    pub fn current(&self) -> &CounterSnapshot {
        self.ring.get(Slot::Current)
    }

    pub fn total(&self) -> &RunningTotal {
        &self.total
    }
}
