metric_enum! {
    /// RAPL power domains, in reporting order
    pub enum RaplDomain {
        Package => "package",
        Core => "pp0",
        Uncore => "pp1",
        Dram => "dram",
    }
}

impl RaplDomain {
    pub fn description(&self) -> &'static str {
        match self {
            RaplDomain::Package => "Package",
            RaplDomain::Core => "Cores (PP0)",
            RaplDomain::Uncore => "Uncore (PP1)",
            RaplDomain::Dram => "DRAM",
        }
    }
}
