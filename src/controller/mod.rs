//! Session controller
//!
//! Repeats the configured pipeline until the coordinator decides to stop.
//! Every iteration ends with the coordinator broadcasting a [`Decision`],
//! so all ranks agree on whether another run follows before any of them
//! starts it.
//!
//! ```text
//! rank 0 (Controller)             ranks 1..p (run_worker)
//!   barrier  <------------------->  barrier
//!   read input
//!   pipeline <------------------->  pipeline
//!   verify, print
//!   broadcast decision ---------->  continue / stop
//! ```

pub mod console;

use crate::config::{Config, PipelineKind, SessionConfig};
use crate::group::{collective, Transport};
use crate::input::{self, InputSource};
use crate::output::json::{write_json_output, JsonSessionInfo, JsonSessionOutput};
use crate::output::text;
use crate::pipeline::{self, verify, PipelineRun, Report};
use crate::Result;
use console::Console;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Continue/stop signal broadcast at the end of every iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Continue,
    Stop,
}

impl Decision {
    /// Non-zero continues, zero stops
    pub fn from_reply(reply: i64) -> Self {
        if reply != 0 {
            Decision::Continue
        } else {
            Decision::Stop
        }
    }
}

/// How the coordinator decides whether to run again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionPolicy {
    /// Ask on the console after every iteration
    Prompt,
    /// Run exactly this many iterations
    Iterations(u64),
}

impl DecisionPolicy {
    /// Fixed count if configured; otherwise prompt for interactive input
    /// and run once for every other source
    pub fn from_config(config: &Config) -> Self {
        match config.runtime.iterations {
            Some(count) => DecisionPolicy::Iterations(count),
            None if config.input.is_interactive() => DecisionPolicy::Prompt,
            None => DecisionPolicy::Iterations(1),
        }
    }
}

/// Coordinator side of a session
pub struct Controller {
    config: Config,
    console: Console,
    input: Box<dyn InputSource>,
    decisions: DecisionPolicy,
}

impl Controller {
    pub fn new(config: Config, console: Console) -> Result<Self> {
        let input = input::from_config(&config.input)?;
        let decisions = DecisionPolicy::from_config(&config);
        Ok(Self::with_input(config, console, input, decisions))
    }

    pub fn with_input(config: Config, console: Console, input: Box<dyn InputSource>, decisions: DecisionPolicy) -> Self {
        Self {
            config,
            console,
            input,
            decisions,
        }
    }

    /// Drive the session as rank 0; returns every iteration's report
    pub fn run<G: Transport + ?Sized>(&mut self, group: &mut G) -> Result<Vec<Report>> {
        collective::barrier(group)?;
        info!(workers = group.size(), session = %self.config.session(), "session started");

        let mut json = self
            .config
            .output
            .json_output
            .as_ref()
            .map(|_| JsonSessionOutput::new(JsonSessionInfo::start(&self.config, group.size())));

        let mut reports = Vec::new();
        let mut iteration = 1;
        loop {
            let report = self.run_iteration(group, iteration)?;

            let rendered = text::format_report(&report, &self.config.output);
            self.console.println(rendered.trim_end())?;

            if let Some(json) = json.as_mut() {
                json.push(report.clone());
            }
            reports.push(report);

            let decision = self.decide(iteration)?;
            collective::broadcast(group, Some(decision))?;
            debug!(iteration, ?decision, "decision broadcast");

            if decision == Decision::Stop {
                break;
            }
            iteration += 1;
        }

        if let (Some(json), Some(path)) = (json.as_mut(), self.config.output.json_output.as_ref()) {
            json.finish();
            write_json_output(path, json, true)?;
            info!(path = %path.display(), "JSON output written");
        }

        info!(iterations = reports.len(), "session finished");
        Ok(reports)
    }

    fn run_iteration<G: Transport + ?Sized>(&mut self, group: &mut G, iteration: u64) -> Result<Report> {
        let workers = group.size();
        let policy = self.config.pipeline.policy;
        let verify = self.config.pipeline.verify;

        let report = match self.config.pipeline.kind {
            PipelineKind::Sortedness => {
                let values = self.input.next_integers(&mut self.console)?;
                info!(iteration, n = values.len(), "running sortedness check");
                let run = PipelineRun::new(iteration, values, workers, policy)?;
                let report = pipeline::sortedness::run(group, Some(&run))?
                    .ok_or_else(|| anyhow::anyhow!("Coordinator received no sortedness report"))?;
                if verify {
                    self.report_mismatches(iteration, verify::check_sortedness(run.values(), &report))?;
                }
                Report::Sortedness(report)
            }
            PipelineKind::Statistics => {
                let values = self.input.next_floats(&mut self.console)?;
                info!(iteration, n = values.len(), "running statistics");
                let run = PipelineRun::new(iteration, values, workers, policy)?;
                let mut report = pipeline::statistics::run(group, Some(&run))?
                    .ok_or_else(|| anyhow::anyhow!("Coordinator received no statistics report"))?;
                if verify {
                    self.report_mismatches(iteration, verify::check_statistics(run.values(), &report)?)?;
                }
                if !self.config.output.per_worker_output {
                    report.per_rank.clear();
                }
                Report::Statistics(report)
            }
        };
        Ok(report)
    }

    fn report_mismatches(&mut self, iteration: u64, mismatches: Vec<verify::Mismatch>) -> Result<()> {
        if mismatches.is_empty() {
            debug!(iteration, "matches sequential reference");
            return Ok(());
        }
        for mismatch in &mismatches {
            warn!(iteration, %mismatch, "distributed result differs from sequential reference");
        }
        self.console.println(&format!(
            "Warning: {} field(s) differ from the sequential reference",
            mismatches.len()
        ))
    }

    fn decide(&mut self, iteration: u64) -> Result<Decision> {
        match self.decisions {
            DecisionPolicy::Iterations(count) if iteration < count => Ok(Decision::Continue),
            DecisionPolicy::Iterations(_) => Ok(Decision::Stop),
            DecisionPolicy::Prompt => {
                self.console
                    .prompt("\nDo you want to run the program again? (non-zero for yes, 0 for no): ")?;
                match self.console.next_token()? {
                    Some(token) => {
                        let reply: i64 = token
                            .parse()
                            .map_err(|e| anyhow::anyhow!("Invalid choice '{}': {}", token, e))?;
                        Ok(Decision::from_reply(reply))
                    }
                    // Closed input stops cleanly
                    None => Ok(Decision::Stop),
                }
            }
        }
    }
}

/// Worker side of a session (ranks `1..p`)
///
/// Mirrors [`Controller::run`] step for step and returns once the
/// coordinator broadcasts [`Decision::Stop`].
pub fn run_worker<G: Transport + ?Sized>(group: &mut G, session: &SessionConfig) -> Result<()> {
    collective::barrier(group)?;
    debug!(rank = group.rank(), session = %session, "worker joined session");

    let mut iterations = 0u64;
    loop {
        match session.pipeline {
            PipelineKind::Sortedness => {
                pipeline::sortedness::run(group, None)?;
            }
            PipelineKind::Statistics => {
                pipeline::statistics::run(group, None)?;
            }
        }
        iterations += 1;

        let decision: Decision = collective::broadcast(group, None)?;
        if decision == Decision::Stop {
            break;
        }
    }

    debug!(rank = group.rank(), iterations, "worker done");
    Ok(())
}
