use std::fmt;

use serde::Serialize;

use crate::common::arch::UnitScale;
use crate::counters::rapl::{elapsed_secs, power, SocketReadings};
use crate::metrics::rapl::RaplDomain;

/// Read-only power and energy queries over the sampler's committed state
///
/// Values are summed across sockets unless the method name says otherwise.
/// Socket 0 is the clock reference for elapsed-time queries.
#[derive(Debug, Clone)]
pub struct PowerReport<'a> {
    units: UnitScale,
    sockets: &'a [SocketReadings],
    domains: Vec<RaplDomain>,
}

impl<'a> PowerReport<'a> {
    pub fn new(units: UnitScale, sockets: &'a [SocketReadings], domains: Vec<RaplDomain>) -> Self {
        Self {
            units,
            sockets,
            domains,
        }
    }

    /// Power over the most recent sampling interval, in watts
    pub fn current_power(&self, domain: RaplDomain) -> f64 {
        (0..self.sockets.len())
            .map(|index| self.socket_current_power(index, domain))
            .sum()
    }

    /// Mean power since the last reset, in watts
    pub fn average_power(&self, domain: RaplDomain) -> f64 {
        let total_time = self.total_time();
        if total_time == 0.0 {
            return 0.0;
        }
        self.total_energy(domain) / total_time
    }

    /// Energy consumed since the last reset, in joules
    pub fn total_energy(&self, domain: RaplDomain) -> f64 {
        (0..self.sockets.len())
            .map(|index| self.socket_total_energy(index, domain))
            .sum()
    }

    /// Seconds between the last reset and the latest sample
    pub fn total_time(&self) -> f64 {
        self.sockets.first().map_or(0.0, |socket| {
            elapsed_secs(socket.total().reset_timestamp, socket.current().timestamp)
        })
    }

    /// Seconds between the two most recent samples
    pub fn current_time(&self) -> f64 {
        self.sockets.first().map_or(0.0, |socket| {
            elapsed_secs(socket.previous().timestamp, socket.current().timestamp)
        })
    }

    pub fn socket_current_power(&self, index: usize, domain: RaplDomain) -> f64 {
        self.sockets.get(index).map_or(0.0, |socket| {
            let previous = socket.previous();
            let current = socket.current();
            power(
                self.units.energy_units,
                previous.counters.get(domain),
                current.counters.get(domain),
                elapsed_secs(previous.timestamp, current.timestamp),
            )
        })
    }

    pub fn socket_total_energy(&self, index: usize, domain: RaplDomain) -> f64 {
        self.sockets.get(index).map_or(0.0, |socket| {
            self.units.energy_units * socket.total().counters.get(domain) as f64
        })
    }

    pub fn summary(&self) -> PowerSummary {
        PowerSummary {
            sockets: self.sockets.len(),
            total_time: self.total_time(),
            domains: self
                .domains
                .iter()
                .map(|&domain| DomainSummary {
                    domain: domain.name(),
                    description: domain.description(),
                    current_power: self.current_power(domain),
                    average_power: self.average_power(domain),
                    total_energy: self.total_energy(domain),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainSummary {
    pub domain: &'static str,
    #[serde(skip)]
    pub description: &'static str,
    /// Watts
    pub current_power: f64,
    /// Watts
    pub average_power: f64,
    /// Joules
    pub total_energy: f64,
}

/// Owned snapshot of a [`PowerReport`], detached from the sampler
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerSummary {
    pub sockets: usize,
    /// Seconds
    pub total_time: f64,
    pub domains: Vec<DomainSummary>,
}

impl PowerSummary {
    pub fn domain(&self, domain: RaplDomain) -> Option<&DomainSummary> {
        self.domains.iter().find(|d| d.domain == domain.name())
    }
}

impl fmt::Display for PowerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "CPU power over {:.3} s ({} socket{}):",
            self.total_time,
            self.sockets,
            if self.sockets == 1 { "" } else { "s" }
        )?;
        for domain in &self.domains {
            writeln!(
                f,
                "  {:<14} average {:>9.3} W   total {:>12.3} J",
                domain.description, domain.average_power, domain.total_energy
            )?;
        }
        Ok(())
    }
}
