// Macros (must be first for visibility)
#[macro_use]
pub mod macros;

pub mod common;
pub mod config;
pub mod counters;
pub mod error;
pub mod metrics;
pub mod orchestrator;

pub use config::PowermonConfig;
pub use counters::rapl::{PowerInfo, RaplSampler};
pub use error::{PowermonError, Result};
pub use metrics::rapl::{PowerReport, PowerSummary, RaplDomain};
pub use orchestrator::SamplerSession;
