//! CLI to Config conversion utilities

use crate::config::{cli, InputConfig, PipelineKind};
use crate::partition::PartitionPolicy;
use anyhow::{Context, Result};
use std::path::Path;

/// Split a value list on commas and whitespace
pub fn parse_value_list(s: &str) -> Vec<String> {
    s.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Append `default_port` to an address that has none
pub fn with_default_port(addr: &str, default_port: u16) -> String {
    let addr = addr.trim();
    // Bracketed IPv6 ("[::1]:9999") or host:port
    let has_port = match addr.rfind(']') {
        Some(end) => addr[end..].contains(':'),
        None => addr.matches(':').count() == 1,
    };
    if has_port {
        addr.to_string()
    } else {
        format!("{}:{}", addr, default_port)
    }
}

/// Parse a comma-separated host list
pub fn parse_host_list(s: &str, default_port: u16) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(|h| with_default_port(h, default_port))
        .collect()
}

/// Read node addresses from a file, one per line (`#` starts a comment)
pub fn read_clients_file(path: &Path, default_port: u16) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read clients file: {}", path.display()))?;

    Ok(contents
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(|line| with_default_port(line, default_port))
        .collect())
}

/// Convert CLI PipelineArg to PipelineKind
pub fn convert_pipeline(arg: cli::PipelineArg) -> PipelineKind {
    match arg {
        cli::PipelineArg::Sortedness => PipelineKind::Sortedness,
        cli::PipelineArg::Statistics => PipelineKind::Statistics,
    }
}

/// Convert CLI PolicyArg to PartitionPolicy
pub fn convert_policy(arg: cli::PolicyArg) -> PartitionPolicy {
    match arg {
        cli::PolicyArg::FrontLoaded => PartitionPolicy::FrontLoaded,
        cli::PolicyArg::BackLoaded => PartitionPolicy::BackLoaded,
    }
}

/// Input source selected on the command line, if any
pub fn convert_input(cli: &cli::Cli) -> Option<InputConfig> {
    if let Some(values) = &cli.values {
        return Some(InputConfig::Values {
            values: parse_value_list(values),
        });
    }
    if let Some(path) = &cli.input_file {
        return Some(InputConfig::File { path: path.clone() });
    }
    cli.random_len.map(|len| InputConfig::Random {
        len,
        min: cli.random_min.unwrap_or(0.0),
        max: cli.random_max.unwrap_or(100.0),
        seed: cli.seed,
    })
}
