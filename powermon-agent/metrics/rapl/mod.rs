mod report;
mod types;

pub use report::{DomainSummary, PowerReport, PowerSummary};
pub use types::RaplDomain;
