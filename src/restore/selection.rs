// docker-maintain/src/restore/selection.rs
use anyhow::{Context, Result};
use std::io::{BufRead, Write};

use super::catalog::CatalogEntry;
use crate::errors::AppError;

/// Source of the raw restore choice for a presented catalog.
pub trait SelectionProvider {
    fn choose(&mut self, entries: &[CatalogEntry]) -> Result<String>;
}

/// Prints the numbered catalog and reads one line from the terminal.
pub struct TerminalSelection<R, W> {
    input: R,
    output: W,
}

impl TerminalSelection<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalSelection<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> SelectionProvider for TerminalSelection<R, W> {
    fn choose(&mut self, entries: &[CatalogEntry]) -> Result<String> {
        for (idx, entry) in entries.iter().enumerate() {
            writeln!(self.output, "[{}] {}", idx, entry)?;
        }
        write!(self.output, "pick idx of backup to restore: ")?;
        self.output.flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        self.input
            .read_line(&mut line)
            .context("Failed to read user input")?;
        Ok(line.trim().to_string())
    }
}

/// Parses a raw choice into an index in `[0, count)`.
pub fn parse_selection(input: &str, count: usize) -> crate::errors::Result<usize> {
    let trimmed = input.trim();
    let invalid = || AppError::InvalidSelection {
        input: trimmed.to_string(),
        count,
    };
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    match trimmed.parse::<usize>() {
        Ok(idx) if idx < count => Ok(idx),
        _ => Err(invalid()),
    }
}
