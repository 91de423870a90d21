//! Configuration validation

use super::*;
use anyhow::Result;

/// Largest precision accepted for floating-point output
pub const MAX_PRECISION: usize = 17;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_workers(&config.workers)?;
    validate_input(&config.input)?;
    validate_output(&config.output)?;
    validate_runtime(&config.runtime)?;

    Ok(())
}

/// Validate workers configuration
pub fn validate_workers(workers: &WorkerConfig) -> Result<()> {
    if workers.count == 0 {
        anyhow::bail!("workers.count must be at least 1");
    }

    if workers.count > 1024 {
        eprintln!(
            "Warning: Very high worker count ({}), most ranks will receive empty partitions for small arrays",
            workers.count
        );
    }

    Ok(())
}

/// Validate input configuration
pub fn validate_input(input: &InputConfig) -> Result<()> {
    match input {
        InputConfig::Prompt | InputConfig::Values { .. } => {}
        InputConfig::File { path } => {
            if !path.exists() {
                anyhow::bail!("Input file does not exist: {}", path.display());
            }
        }
        InputConfig::Random { min, max, .. } => {
            if !min.is_finite() || !max.is_finite() {
                anyhow::bail!("random range must be finite, got [{}, {}]", min, max);
            }
            if min > max {
                anyhow::bail!("random min ({}) must not exceed max ({})", min, max);
            }
            if !(max - min).is_finite() {
                anyhow::bail!("random range [{}, {}] is wider than f64 can represent", min, max);
            }
        }
    }

    Ok(())
}

/// Validate output configuration
pub fn validate_output(output: &OutputConfig) -> Result<()> {
    if output.precision > MAX_PRECISION {
        anyhow::bail!("precision must be at most {}, got {}", MAX_PRECISION, output.precision);
    }

    Ok(())
}

/// Validate runtime configuration
pub fn validate_runtime(runtime: &RuntimeConfig) -> Result<()> {
    if runtime.iterations == Some(0) {
        anyhow::bail!("iterations must be greater than 0 if specified");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_workers() {
        assert!(validate_workers(&WorkerConfig { count: 0 }).is_err());
        assert!(validate_workers(&WorkerConfig { count: 1 }).is_ok());
    }

    #[test]
    fn test_validate_random_range() {
        let input = |min, max| InputConfig::Random { len: 4, min, max, seed: None };
        assert!(validate_input(&input(0.0, 1.0)).is_ok());
        assert!(validate_input(&input(3.0, 3.0)).is_ok());
        assert!(validate_input(&input(5.0, 1.0)).is_err());
        assert!(validate_input(&input(f64::NEG_INFINITY, 1.0)).is_err());
        assert!(validate_input(&input(-1e308, 1e308)).is_err());
        assert!(validate_input(&input(-1e307, 1e307)).is_ok());
    }

    #[test]
    fn test_validate_missing_file() {
        let input = InputConfig::File {
            path: PathBuf::from("/nonexistent/values.txt"),
        };
        assert!(validate_input(&input).is_err());

        let file = tempfile::NamedTempFile::new().unwrap();
        let input = InputConfig::File {
            path: file.path().to_path_buf(),
        };
        assert!(validate_input(&input).is_ok());
    }

    #[test]
    fn test_validate_precision_and_iterations() {
        let mut config = Config::default();
        config.output.precision = 40;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.runtime.iterations = Some(0);
        assert!(validate_config(&config).is_err());
    }
}
