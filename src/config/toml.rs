//! TOML configuration file parsing
//!
//! ```toml
//! [pipeline]
//! kind = "statistics"
//! policy = "back_loaded"
//! verify = true
//!
//! [workers]
//! count = 4
//!
//! [input]
//! source = "random"
//! len = 1000
//! seed = 7
//!
//! [runtime]
//! iterations = 3
//! ```

use super::*;
use crate::config::cli::Cli;
use crate::config::cli_convert::{convert_input, convert_pipeline, convert_policy, parse_host_list, read_clients_file};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents).with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents).context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    if let Some(kind) = cli.pipeline {
        config.pipeline.kind = convert_pipeline(kind);
    }
    if let Some(policy) = cli.policy {
        config.pipeline.policy = convert_policy(policy);
    }
    if cli.verify {
        config.pipeline.verify = true;
    }

    if let Some(count) = cli.workers {
        config.workers.count = count;
    }

    if let Some(input) = convert_input(cli) {
        config.input = input;
    }

    if cli.per_worker_output {
        config.output.per_worker_output = true;
    }
    if let Some(path) = &cli.json_output {
        config.output.json_output = Some(path.clone());
    }
    if let Some(precision) = cli.precision {
        config.output.precision = precision;
    }

    if let Some(iterations) = cli.iterations {
        config.runtime.iterations = Some(iterations);
    }
    if cli.debug {
        config.runtime.debug = true;
    }

    config.distributed.listen_port = cli.listen_port;
    if let Some(hosts) = &cli.host_list {
        config.distributed.node_addresses = parse_host_list(hosts, cli.worker_port);
    } else if let Some(path) = &cli.clients_file {
        config.distributed.node_addresses = read_clients_file(path, cli.worker_port)?;
    }

    Ok(config)
}

/// Build the full configuration: TOML file (if any) overlaid with CLI flags
pub fn build_config(cli: &Cli) -> Result<Config> {
    let base = match &cli.config {
        Some(path) => parse_toml_file(path)?,
        None => Config::default(),
    };
    merge_cli_with_config(cli, base)
}
