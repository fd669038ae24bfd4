mod monitor;
mod snapshot;

pub use monitor::{PowerInfo, RaplSampler, SocketInfo};
pub use snapshot::{
    elapsed_secs, energy_delta, power, CounterSnapshot, DomainCounters, RunningTotal,
    SnapshotRing, Slot, SocketReadings,
};
