//! Terminal output routing.
//!
//! The report always goes to stdout. Progress lines share stdout with a
//! text report and move to stderr when stdout carries JSON, so the JSON
//! document can be piped on its own.

use super::generator::{generate_json_report, generate_text_report, ResultReport};
use crate::cli::OutputFormat;
use anyhow::Result;
use std::fmt::Display;
use std::io::{self, Stderr, Stdout, Write};

/// Output sink for one run.
pub struct Console<O: Write, E: Write> {
    format: OutputFormat,
    out: O,
    err: E,
}

impl Console<Stdout, Stderr> {
    /// Console over the process's stdout and stderr.
    pub fn stdio(format: OutputFormat) -> Self {
        Self::new(format, io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> Console<O, E> {
    pub fn new(format: OutputFormat, out: O, err: E) -> Self {
        Self { format, out, err }
    }

    /// Print a progress line.
    pub fn status(&mut self, line: impl Display) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(self.out, "{}", line),
            OutputFormat::Json => writeln!(self.err, "{}", line),
        }
    }

    /// Print the result report in the selected format.
    pub fn report(&mut self, report: &ResultReport) -> Result<()> {
        match self.format {
            OutputFormat::Text => {
                writeln!(self.out)?;
                write!(self.out, "{}", generate_text_report(report))?;
            }
            OutputFormat::Json => writeln!(self.out, "{}", generate_json_report(report)?)?,
        }
        self.out.flush()?;
        Ok(())
    }

    #[cfg(test)]
    fn into_parts(self) -> (O, E) {
        (self.out, self.err)
    }
}
