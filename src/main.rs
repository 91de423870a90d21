//! splitscan CLI entry point

use anyhow::{Context, Result};
use splitscan::config::cli::{Cli, ExecutionMode};
use splitscan::config::{toml::build_config, validator::validate_config, Config};
use splitscan::controller::{console::Console, run_worker, Controller};
use splitscan::distributed::{DistributedCoordinator, NodeService};
use splitscan::group::local::run_local;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    cli.validate()?;
    init_logging(cli.debug);

    match cli.mode {
        ExecutionMode::Standalone => run_standalone(&cli),
        ExecutionMode::Service => run_service(&cli),
        ExecutionMode::Coordinator => run_coordinator(&cli),
    }
}

/// RUST_LOG wins; otherwise warnings, plus our own info (debug with --debug)
fn init_logging(debug: bool) {
    let default = if debug { "warn,splitscan=debug" } else { "warn,splitscan=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_banner() {
    println!("splitscan v{}", env!("CARGO_PKG_VERSION"));
    println!("Partitioned array analysis");
    println!();
}

/// Load, merge and validate configuration; prints it and reports dry runs
fn prepare(cli: &Cli) -> Result<Option<Config>> {
    let config = build_config(cli)?;
    validate_config(&config).context("Configuration validation failed")?;

    print_configuration(&config, cli.mode);

    if cli.dry_run {
        println!();
        println!("Dry run mode - configuration validated successfully");
        return Ok(None);
    }
    println!();
    Ok(Some(config))
}

/// Run in standalone mode (every rank a thread in this process)
fn run_standalone(cli: &Cli) -> Result<()> {
    print_banner();
    let Some(config) = prepare(cli)? else {
        return Ok(());
    };

    let session = config.session();
    let workers = config.workers.count;
    run_local(
        workers,
        |group| Controller::new(config, Console::stdio())?.run(group),
        |group| run_worker(group, &session),
    )?;
    Ok(())
}

/// Run in service mode (distributed node)
fn run_service(cli: &Cli) -> Result<()> {
    let service = NodeService::bind(&format!("0.0.0.0:{}", cli.listen_port)).context("Failed to create node service")?;
    println!("splitscan node service {} listening on {}", service.node_id(), service.local_addr()?);
    service.run()
}

/// Run in coordinator mode (rank 0 of a TCP group)
fn run_coordinator(cli: &Cli) -> Result<()> {
    print_banner();
    let Some(config) = prepare(cli)? else {
        return Ok(());
    };

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    let coordinator = DistributedCoordinator::new(config.session(), config.distributed.node_addresses.clone())?;
    let mut group = coordinator.connect(&runtime)?;

    Controller::new(config, Console::stdio())?.run(&mut group)?;
    Ok(())
}

fn print_configuration(config: &Config, mode: ExecutionMode) {
    println!("Configuration:");
    println!("  Pipeline: {}", config.pipeline.kind);
    println!("  Partition policy: {}", config.pipeline.policy);
    println!("  Input: {}", config.input);
    match mode {
        ExecutionMode::Coordinator => {
            println!("  Nodes: {}", config.distributed.node_addresses.join(", "));
            println!("  Workers: {}", config.distributed.node_addresses.len() + 1);
        }
        _ => println!("  Workers: {}", config.workers.count),
    }
    match config.runtime.iterations {
        Some(count) => println!("  Iterations: {}", count),
        None if config.input.is_interactive() => println!("  Iterations: until declined"),
        None => println!("  Iterations: 1"),
    }
    if config.pipeline.verify {
        println!("  Verify: sequential reference");
    }
    if let Some(ref path) = config.output.json_output {
        println!("  JSON output: {}", path.display());
    }
}
