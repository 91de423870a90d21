//! Token-oriented console
//!
//! Prompts go to the writer, answers are read as whitespace separated
//! tokens. Extra tokens typed on one line are kept for the following reads,
//! so `3 1 2 3` answers the size prompt and all three element prompts.

use crate::Result;
use anyhow::Context;
use std::collections::VecDeque;
use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

pub struct Console {
    reader: Box<dyn BufRead>,
    writer: Box<dyn Write>,
    pending: VecDeque<String>,
}

impl Console {
    pub fn new(reader: impl BufRead + 'static, writer: impl Write + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
            pending: VecDeque::new(),
        }
    }

    /// Standard input and output
    pub fn stdio() -> Self {
        Self::new(io::BufReader::new(io::stdin()), io::stdout())
    }

    pub fn writer(&mut self) -> &mut dyn Write {
        &mut *self.writer
    }

    /// Write text and flush, without a newline
    pub fn prompt(&mut self, text: &str) -> Result<()> {
        self.writer.write_all(text.as_bytes()).context("Failed to write prompt")?;
        self.writer.flush().context("Failed to flush console")?;
        Ok(())
    }

    /// Write one line of output
    pub fn println(&mut self, text: &str) -> Result<()> {
        writeln!(self.writer, "{}", text).context("Failed to write to console")?;
        self.writer.flush().context("Failed to flush console")?;
        Ok(())
    }

    /// Next token, or `None` at end of input
    pub fn next_token(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(Some(token));
            }

            let mut line = String::new();
            let read = self.reader.read_line(&mut line).context("Failed to read from console")?;
            if read == 0 {
                return Ok(None);
            }
            self.pending
                .extend(line.split_whitespace().map(str::to_string));
        }
    }

    /// Parse the next token as `T`; end of input is an error
    pub fn read<T>(&mut self, what: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let token = self
            .next_token()?
            .ok_or_else(|| anyhow::anyhow!("Unexpected end of input while reading {}", what))?;
        token
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {} '{}': {}", what, token, e))
    }
}
