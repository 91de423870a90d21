//! JSON output formatting
//!
//! One document per session: session information followed by every
//! iteration's report, in order.

use crate::config::{Config, PipelineKind};
use crate::partition::PartitionPolicy;
use crate::pipeline::Report;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Session information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSessionInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub start_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub pipeline: PipelineKind,
    pub policy: PartitionPolicy,
    pub workers: usize,
    pub verify: bool,
}

impl JsonSessionInfo {
    /// Stamp the start of a session
    pub fn start(config: &Config, workers: usize) -> Self {
        Self {
            hostname: hostname::get().ok().and_then(|h| h.into_string().ok()),
            start_time: chrono::Utc::now().to_rfc3339(),
            end_time: None,
            pipeline: config.pipeline.kind,
            policy: config.pipeline.policy,
            workers,
            verify: config.pipeline.verify,
        }
    }
}

/// Complete JSON output for a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSessionOutput {
    pub session: JsonSessionInfo,
    pub iterations: Vec<Report>,
}

impl JsonSessionOutput {
    pub fn new(session: JsonSessionInfo) -> Self {
        Self {
            session,
            iterations: Vec::new(),
        }
    }

    pub fn push(&mut self, report: Report) {
        self.iterations.push(report);
    }

    /// Stamp the end of the session
    pub fn finish(&mut self) {
        self.session.end_time = Some(chrono::Utc::now().to_rfc3339());
    }
}

/// Write JSON output to file
pub fn write_json_output(output_path: &Path, output: &JsonSessionOutput, pretty: bool) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON output file: {}", output_path.display()))?;
    let writer = BufWriter::new(file);

    if pretty {
        serde_json::to_writer_pretty(writer, output)?;
    } else {
        serde_json::to_writer(writer, output)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SortednessVerdict;
    use crate::pipeline::SortednessReport;

    #[test]
    fn test_write_and_read_back() {
        let config = Config::default();
        let mut output = JsonSessionOutput::new(JsonSessionInfo::start(&config, 3));
        output.push(Report::Sortedness(SortednessReport {
            iteration: 1,
            elements: 4,
            workers: 3,
            policy: PartitionPolicy::FrontLoaded,
            verdict: SortednessVerdict::violation_at(2),
            per_rank: Vec::new(),
        }));
        output.finish();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        write_json_output(&path, &output, true).unwrap();

        let value: serde_json::Value = serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(value["session"]["workers"], 3);
        assert_eq!(value["session"]["pipeline"], "sortedness");
        assert!(value["session"]["end_time"].is_string());
        assert_eq!(value["iterations"][0]["pipeline"], "sortedness");
        assert_eq!(value["iterations"][0]["verdict"]["first_violation"], 2);

        let parsed: JsonSessionOutput = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.iterations.len(), 1);
        assert_eq!(parsed.iterations[0].iteration(), 1);
    }

    #[test]
    fn test_unwritable_path() {
        let output = JsonSessionOutput::new(JsonSessionInfo::start(&Config::default(), 1));
        let err = write_json_output(Path::new("/nonexistent/dir/out.json"), &output, false).unwrap_err();
        assert!(err.to_string().contains("Failed to create JSON output file"));
    }
}
