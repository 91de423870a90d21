//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Standalone mode (default) - every rank is a thread in this process
    Standalone,
    /// Coordinator mode - rank 0, drives node services over TCP
    Coordinator,
    /// Service mode - run a node service (accepts coordinator sessions)
    Service,
}

/// Which pipeline to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PipelineArg {
    /// First-violation sortedness check over integers
    Sortedness,
    /// Mean, min/max, variance, percentages, arg-max and prefix sums over floats
    Statistics,
}

/// Remainder distribution policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Leading ranks take one extra element each
    FrontLoaded,
    /// Last rank takes the whole remainder
    BackLoaded,
}

/// splitscan - partitioned array analysis over a worker group
#[derive(Parser, Debug)]
#[command(name = "splitscan")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Execution mode: standalone, coordinator, or service
    #[arg(long, value_enum, default_value = "standalone")]
    pub mode: ExecutionMode,

    /// Port for service to listen on (service mode only)
    #[arg(long, default_value = "9999")]
    pub listen_port: u16,

    /// Comma-separated list of node addresses for coordinator mode (e.g., "10.0.1.10:9999,10.0.1.11")
    #[arg(long)]
    pub host_list: Option<String>,

    /// File containing list of node addresses (one per line, for coordinator mode)
    #[arg(long)]
    pub clients_file: Option<PathBuf>,

    /// Port used for node addresses given without one (coordinator mode only)
    #[arg(long, default_value = "9999")]
    pub worker_port: u16,

    // === Session Options ===
    /// Number of ranks including the coordinator (standalone mode; default: CPU count)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Pipeline to run
    #[arg(short = 'p', long, value_enum)]
    pub pipeline: Option<PipelineArg>,

    /// Remainder distribution policy
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,

    // === Input Options ===
    /// Array values, comma or space separated (e.g., "3,1,2")
    #[arg(long, allow_hyphen_values = true)]
    pub values: Option<String>,

    /// Read the array from a file (whitespace or comma separated)
    #[arg(long)]
    pub input_file: Option<PathBuf>,

    /// Generate a random array of this length each iteration
    #[arg(long)]
    pub random_len: Option<usize>,

    /// Lower bound for random values
    #[arg(long, allow_hyphen_values = true)]
    pub random_min: Option<f64>,

    /// Upper bound for random values
    #[arg(long, allow_hyphen_values = true)]
    pub random_max: Option<f64>,

    /// Seed for random values (default: from entropy)
    #[arg(long)]
    pub seed: Option<u64>,

    // === Run Control ===
    /// Run exactly this many iterations instead of asking after each one
    #[arg(short = 'n', long)]
    pub iterations: Option<u64>,

    /// Recompute each result sequentially and warn on any difference
    #[arg(long)]
    pub verify: bool,

    // === Output Options ===
    /// List every rank's partition and local result
    #[arg(long)]
    pub per_worker_output: bool,

    /// Write all iteration reports to a JSON file
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Decimal places for floating-point output
    #[arg(long)]
    pub precision: Option<usize>,

    // === Misc ===
    /// Load configuration from a TOML file (CLI flags take precedence)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Verbose diagnostics
    #[arg(long)]
    pub debug: bool,

    /// Validate and print the configuration, then exit
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        // Service mode takes everything from the coordinator
        if self.mode == ExecutionMode::Service {
            return Ok(());
        }

        if self.workers == Some(0) {
            anyhow::bail!("workers must be at least 1");
        }

        let sources = [
            self.values.is_some(),
            self.input_file.is_some(),
            self.random_len.is_some(),
        ];
        if sources.iter().filter(|&&x| x).count() > 1 {
            anyhow::bail!("can only specify one of: --values, --input-file, --random-len");
        }

        if self.random_len.is_none()
            && (self.random_min.is_some() || self.random_max.is_some() || self.seed.is_some())
        {
            anyhow::bail!("--random-min, --random-max and --seed require --random-len");
        }

        if self.iterations == Some(0) {
            anyhow::bail!("iterations must be at least 1");
        }

        if self.mode == ExecutionMode::Coordinator && self.host_list.is_none() && self.clients_file.is_none() {
            anyhow::bail!("coordinator mode requires --host-list or --clients-file");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("splitscan").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.mode, ExecutionMode::Standalone);
        assert_eq!(cli.listen_port, 9999);
        assert!(cli.workers.is_none());
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_session_flags() {
        let cli = parse(&[
            "-w", "4", "--pipeline", "statistics", "--policy", "back-loaded", "--values", "-1,2.5", "-n", "2",
        ]);
        assert_eq!(cli.workers, Some(4));
        assert_eq!(cli.pipeline, Some(PipelineArg::Statistics));
        assert_eq!(cli.policy, Some(PolicyArg::BackLoaded));
        assert_eq!(cli.values.as_deref(), Some("-1,2.5"));
        assert_eq!(cli.iterations, Some(2));
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_validate_workers() {
        assert!(parse(&["-w", "0"]).validate().is_err());
    }

    #[test]
    fn test_validate_single_input_source() {
        assert!(parse(&["--values", "1", "--random-len", "3"]).validate().is_err());
        assert!(parse(&["--seed", "7"]).validate().is_err());
        assert!(parse(&["--random-len", "3", "--seed", "7"]).validate().is_ok());
    }

    #[test]
    fn test_validate_coordinator_needs_nodes() {
        assert!(parse(&["--mode", "coordinator"]).validate().is_err());
        assert!(parse(&["--mode", "coordinator", "--host-list", "a:1"]).validate().is_ok());
        // Service mode skips validation
        assert!(parse(&["--mode", "service", "-w", "0"]).validate().is_ok());
    }
}
