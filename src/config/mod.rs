//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use crate::partition::PartitionPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Complete session configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub distributed: DistributedConfig,
}

impl Config {
    /// The part of the configuration every rank needs
    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            pipeline: self.pipeline.kind,
            policy: self.pipeline.policy,
        }
    }
}

/// Which analysis runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    /// Distributed sortedness check (integer input)
    Sortedness,
    /// Distributed statistics and transforms (floating-point input)
    Statistics,
}

impl Default for PipelineKind {
    fn default() -> Self {
        Self::Sortedness
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sortedness => write!(f, "sortedness"),
            Self::Statistics => write!(f, "statistics"),
        }
    }
}

/// Pipeline selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub kind: PipelineKind,
    /// Remainder distribution policy (one per session)
    #[serde(default)]
    pub policy: PartitionPolicy,
    /// Recompute each result sequentially and compare
    #[serde(default)]
    pub verify: bool,
}

/// Worker group configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of ranks including the coordinator (standalone mode)
    #[serde(default = "default_workers")]
    pub count: usize,
}

fn default_workers() -> usize {
    num_cpus::get()
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: default_workers(),
        }
    }
}

/// Where each iteration's array comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum InputConfig {
    /// Prompt for N and each element on the console
    Prompt,
    /// Fixed list of values, reused every iteration
    Values { values: Vec<String> },
    /// Whitespace or comma separated numbers, re-read every iteration
    File { path: PathBuf },
    /// Seeded random array, a fresh one every iteration
    Random {
        len: usize,
        #[serde(default = "default_random_min")]
        min: f64,
        #[serde(default = "default_random_max")]
        max: f64,
        #[serde(default)]
        seed: Option<u64>,
    },
}

fn default_random_min() -> f64 {
    0.0
}

fn default_random_max() -> f64 {
    100.0
}

impl Default for InputConfig {
    fn default() -> Self {
        Self::Prompt
    }
}

impl InputConfig {
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Prompt)
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Write every iteration's report to this JSON file
    pub json_output: Option<PathBuf>,
    /// List each rank's partition and local result
    #[serde(default)]
    pub per_worker_output: bool,
    /// Decimal places for floating-point output
    #[serde(default = "default_precision")]
    pub precision: usize,
}

fn default_precision() -> usize {
    4
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json_output: None,
            per_worker_output: false,
            precision: default_precision(),
        }
    }
}

/// Runtime behaviour
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Run exactly this many iterations instead of prompting to continue
    pub iterations: Option<u64>,
    /// Verbose diagnostics
    #[serde(default)]
    pub debug: bool,
}

/// Coordinator / node service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributedConfig {
    /// Port a node service listens on
    #[serde(default = "default_port")]
    pub listen_port: u16,
    /// Node service addresses, in rank order (rank 1 first)
    #[serde(default)]
    pub node_addresses: Vec<String>,
}

fn default_port() -> u16 {
    9999
}

impl Default for DistributedConfig {
    fn default() -> Self {
        Self {
            listen_port: default_port(),
            node_addresses: Vec::new(),
        }
    }
}

/// Session parameters shipped to every rank at connect time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub pipeline: PipelineKind,
    pub policy: PartitionPolicy,
}

impl fmt::Display for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} pipeline, {} partitions", self.pipeline, self.policy)
    }
}

impl fmt::Display for InputConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prompt => write!(f, "console prompt"),
            Self::Values { values } => write!(f, "{} literal values", values.len()),
            Self::File { path } => write!(f, "file {}", path.display()),
            Self::Random { len, min, max, seed } => {
                write!(f, "{} random values in [{}, {}]", len, min, max)?;
                if let Some(seed) = seed {
                    write!(f, " (seed {})", seed)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.pipeline.kind, PipelineKind::Sortedness);
        assert_eq!(config.pipeline.policy, PartitionPolicy::FrontLoaded);
        assert!(config.workers.count >= 1);
        assert!(config.input.is_interactive());
        assert_eq!(config.output.precision, 4);
        assert_eq!(config.distributed.listen_port, 9999);
    }

    #[test]
    fn test_session_from_config() {
        let mut config = Config::default();
        config.pipeline.kind = PipelineKind::Statistics;
        config.pipeline.policy = PartitionPolicy::BackLoaded;
        let session = config.session();
        assert_eq!(session.pipeline, PipelineKind::Statistics);
        assert_eq!(session.policy, PartitionPolicy::BackLoaded);
        assert_eq!(session.to_string(), "statistics pipeline, back-loaded partitions");
    }

    #[test]
    fn test_input_display() {
        let input = InputConfig::Random { len: 8, min: 0.0, max: 1.0, seed: Some(7) };
        assert_eq!(input.to_string(), "8 random values in [0, 1] (seed 7)");
        assert_eq!(InputConfig::Prompt.to_string(), "console prompt");
    }
}
