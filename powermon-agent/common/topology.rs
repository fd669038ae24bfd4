use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{PowermonError, Result};

/// A physical package and the logical CPU used to address its MSRs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SocketCore {
    /// Physical package id
    pub socket_id: u32,
    /// First online logical CPU observed on this package
    pub core_id: u32,
}

/// Discovers sockets from the sysfs CPU topology
#[derive(Debug, Clone)]
pub struct TopologyProbe {
    root: PathBuf,
}

impl TopologyProbe {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// One entry per physical package, in order of first appearance
    ///
    /// Any unreadable or malformed file aborts discovery; there is no
    /// partial result.
    pub fn discover(&self) -> Result<Vec<SocketCore>> {
        let cpus = self.online_cpus()?;

        let mut seen = HashSet::new();
        let mut sockets = Vec::new();
        for cpu in cpus {
            let package = self.package_id(cpu)?;
            if seen.insert(package) {
                tracing::debug!("Found CPU {cpu} for socket {package}");
                sockets.push(SocketCore {
                    socket_id: package,
                    core_id: cpu,
                });
            }
        }

        tracing::info!("Number of sockets: {}", sockets.len());

        Ok(sockets)
    }

    /// Parse `<root>/online`
    pub fn online_cpus(&self) -> Result<Vec<u32>> {
        let path = self.root.join("online");
        let contents = read_sysfs(&path)?;
        parse_cpu_list(&contents).map_err(|reason| PowermonError::TopologyFormat { path, reason })
    }

    fn package_id(&self, cpu: u32) -> Result<u32> {
        let path = self
            .root
            .join(format!("cpu{cpu}"))
            .join("topology")
            .join("physical_package_id");
        let contents = read_sysfs(&path)?;
        contents
            .trim()
            .parse::<u32>()
            .map_err(|e| PowermonError::TopologyFormat {
                path,
                reason: format!("invalid package id {:?}: {e}", contents.trim()),
            })
    }
}

fn read_sysfs(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| PowermonError::TopologyIo {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse CPU list like "0-3,8-11" into an ordered list of CPU ids
pub fn parse_cpu_list(s: &str) -> std::result::Result<Vec<u32>, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty CPU list".into());
    }

    let mut cpus = Vec::new();
    for part in s.split(',') {
        let part = part.trim();
        if let Some((start, end)) = part.split_once('-') {
            let start = parse_cpu_id(start)?;
            let end = parse_cpu_id(end)?;
            if start > end {
                return Err(format!("descending range {part:?}"));
            }
            cpus.extend(start..=end);
        } else {
            cpus.push(parse_cpu_id(part)?);
        }
    }
    Ok(cpus)
}

fn parse_cpu_id(s: &str) -> std::result::Result<u32, String> {
    s.trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid CPU id {s:?}: {e}"))
}
