//! Input sources
//!
//! The coordinator asks its input source for a fresh array at the start of
//! every iteration. Integer arrays feed the sortedness pipeline, float
//! arrays the statistics pipeline.
//!
//! | Source         | Each iteration                                  |
//! |----------------|-------------------------------------------------|
//! | `PromptInput`  | asks for the size, then every element           |
//! | `LiteralInput` | the same configured values                      |
//! | `FileInput`    | re-reads the file (whitespace/comma separated)  |
//! | `RandomInput`  | a new array from a seeded generator             |

use crate::config::InputConfig;
use crate::controller::console::Console;
use crate::error::try_buffer;
use crate::Result;
use anyhow::Context;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

/// Supplies the array for each iteration
pub trait InputSource {
    fn next_integers(&mut self, console: &mut Console) -> Result<Vec<i64>>;

    fn next_floats(&mut self, console: &mut Console) -> Result<Vec<f64>>;
}

/// Build the input source described by the configuration
pub fn from_config(config: &InputConfig) -> Result<Box<dyn InputSource>> {
    Ok(match config {
        InputConfig::Prompt => Box::new(PromptInput),
        InputConfig::Values { values } => Box::new(LiteralInput::new(values.clone())),
        InputConfig::File { path } => Box::new(FileInput::new(path.clone())),
        InputConfig::Random { len, min, max, seed } => Box::new(RandomInput::new(*len, *min, *max, *seed)?),
    })
}

fn parse_all<T>(tokens: &[String], origin: &str) -> Result<Vec<T>>
where
    T: FromStr,
    T::Err: Display,
{
    let mut out = try_buffer("input array", tokens.len())?;
    for (i, token) in tokens.iter().enumerate() {
        let value = token
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value '{}' at position {} in {}: {}", token, i, origin, e))?;
        out.push(value);
    }
    Ok(out)
}

/// Interactive console prompts
pub struct PromptInput;

impl PromptInput {
    fn read_array<T>(console: &mut Console, size_prompt: &str, header: Option<&str>, label: &str) -> Result<Vec<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        console.prompt(size_prompt)?;
        let n: usize = console.read("array size")?;
        if let Some(header) = header {
            console.println(header)?;
        }

        let mut values = try_buffer("input array", n)?;
        for i in 0..n {
            console.prompt(&format!("{}[{}]: ", label, i))?;
            values.push(console.read("element")?);
        }
        Ok(values)
    }
}

impl InputSource for PromptInput {
    fn next_integers(&mut self, console: &mut Console) -> Result<Vec<i64>> {
        Self::read_array(console, "Enter N: ", None, "t")
    }

    fn next_floats(&mut self, console: &mut Console) -> Result<Vec<f64>> {
        Self::read_array(
            console,
            "Enter the size of the vector (n): ",
            Some("Enter the vector elements:"),
            "X",
        )
    }
}

/// Fixed values, parsed anew for whichever pipeline asks
pub struct LiteralInput {
    tokens: Vec<String>,
}

impl LiteralInput {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }
}

impl InputSource for LiteralInput {
    fn next_integers(&mut self, _console: &mut Console) -> Result<Vec<i64>> {
        parse_all(&self.tokens, "--values")
    }

    fn next_floats(&mut self, _console: &mut Console) -> Result<Vec<f64>> {
        parse_all(&self.tokens, "--values")
    }
}

/// Numbers separated by whitespace and/or commas
pub struct FileInput {
    path: PathBuf,
}

impl FileInput {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn tokens(&self) -> Result<Vec<String>> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read input file: {}", self.path.display()))?;
        Ok(text
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect())
    }
}

impl InputSource for FileInput {
    fn next_integers(&mut self, _console: &mut Console) -> Result<Vec<i64>> {
        parse_all(&self.tokens()?, &self.path.display().to_string())
    }

    fn next_floats(&mut self, _console: &mut Console) -> Result<Vec<f64>> {
        parse_all(&self.tokens()?, &self.path.display().to_string())
    }
}

/// Uniform random values in `[min, max]`
pub struct RandomInput {
    len: usize,
    min: f64,
    max: f64,
    rng: Xoshiro256PlusPlus,
}

impl RandomInput {
    pub fn new(len: usize, min: f64, max: f64, seed: Option<u64>) -> Result<Self> {
        // Uniform sampling scales by `max - min`, which must itself be finite
        if !(max - min).is_finite() || min > max {
            anyhow::bail!("Invalid random range [{}, {}]", min, max);
        }

        let rng = match seed {
            Some(seed) => {
                info!(seed, "random input seeded");
                Xoshiro256PlusPlus::seed_from_u64(seed)
            }
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        Ok(Self { len, min, max, rng })
    }
}

impl InputSource for RandomInput {
    fn next_integers(&mut self, _console: &mut Console) -> Result<Vec<i64>> {
        let low = self.min.ceil() as i64;
        let high = self.max.floor() as i64;
        if low > high {
            anyhow::bail!("No integers in random range [{}, {}]", self.min, self.max);
        }

        let mut values = try_buffer("input array", self.len)?;
        for _ in 0..self.len {
            values.push(self.rng.gen_range(low..=high));
        }
        Ok(values)
    }

    fn next_floats(&mut self, _console: &mut Console) -> Result<Vec<f64>> {
        let mut values = try_buffer("input array", self.len)?;
        for _ in 0..self.len {
            values.push(self.rng.gen_range(self.min..=self.max));
        }
        Ok(values)
    }
}
