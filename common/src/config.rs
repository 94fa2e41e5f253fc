use std::collections::HashSet;

use eyre::{Result, bail};
use serde::{Deserialize, Serialize};

pub const DEFAULT_IMAGE: &str = "ghcr.io/cirruslabs/macos-sonoma-base:latest";
pub const DEFAULT_INSTALL: &str = "brew install fio";

/// A named shell command that prints fio's JSON output to stdout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Benchmark {
    pub name: String,
    pub command: String,
}

impl Benchmark {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
        }
    }
}

/// On-disk form of a benchmark catalogue
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalogue {
    pub benchmarks: Vec<Benchmark>,
}

/// Everything a run needs, resolved once from the command line
#[derive(Debug, Clone)]
pub struct Config {
    pub benchmarks: Vec<Benchmark>,
    /// Image the VM-backed executors boot from
    pub image: String,
    /// Host-side command run before every matrix cell
    pub prepare: Option<String>,
    /// Command installing fio on a freshly created executor
    pub install: String,
    /// Executor names to keep, empty keeps all of them
    pub executors: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            benchmarks: Vec::new(),
            image: DEFAULT_IMAGE.to_owned(),
            prepare: None,
            install: DEFAULT_INSTALL.to_owned(),
            executors: Vec::new(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        validate_benchmarks(&self.benchmarks)?;
        if self.install.trim().is_empty() {
            bail!("Installation command must not be empty");
        }
        Ok(())
    }
}

pub fn validate_benchmarks(benchmarks: &[Benchmark]) -> Result<()> {
    if benchmarks.is_empty() {
        bail!("Benchmark catalogue is empty");
    }

    let mut names = HashSet::new();
    for benchmark in benchmarks {
        if benchmark.name.trim().is_empty() {
            bail!("Benchmark with command {:?} has an empty name", benchmark.command);
        }
        if benchmark.command.trim().is_empty() {
            bail!("Benchmark {:?} has an empty command", benchmark.name);
        }
        if !names.insert(benchmark.name.as_str()) {
            bail!("Duplicate benchmark name {:?}", benchmark.name);
        }
    }
    Ok(())
}
