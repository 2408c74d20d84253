//! Stage status lines.
//!
//! Every stage is rendered as `[NNN] : <STATUS> : <description>`. A stage
//! that actually runs is first announced as `[NNN] : <description> ...` and
//! then, on a styled terminal, overwritten in place with its final status.
//! In plain mode the pending and final lines are printed one after the other.

use std::fmt;
use std::io::{self, Write};

use crate::color::Colorizer;
use crate::errors::{HarnessError, Result};

/// The three possible results of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Ok,
    Ko,
    Skipped,
}

impl Outcome {
    pub fn from_success(success: bool) -> Self {
        if success {
            Outcome::Ok
        } else {
            Outcome::Ko
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Outcome::Ok => "OK",
            Outcome::Ko => "KO",
            Outcome::Skipped => "SK",
        }
    }

    /// `SK` counts as success: a skipped stage never adds to the tally.
    pub fn is_success(self) -> bool {
        !matches!(self, Outcome::Ko)
    }

    fn paint(self, colors: &Colorizer) -> String {
        match self {
            Outcome::Ok => colors.success(self.tag()),
            Outcome::Ko => colors.error(self.tag()),
            Outcome::Skipped => colors.skip(self.tag()),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Whether a stage launched a process or compared two files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Run,
    Compare,
}

/// What the harness remembers about a stage after it has been reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRecord {
    pub number: usize,
    pub kind: StageKind,
    pub description: String,
    pub outcome: Outcome,
}

/// `[001]`, `[042]`, `[1234]`: at least three digits, wider when needed.
pub fn stage_label(number: usize) -> String {
    format!("[{:03}]", number)
}

/// Writes stage lines to a sink, normally stdout.
pub struct Reporter<W: Write> {
    out: W,
    colors: Colorizer,
}

impl Reporter<io::Stdout> {
    pub fn stdout(colors: Colorizer) -> Self {
        Self::new(io::stdout(), colors)
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, colors: Colorizer) -> Self {
        Self { out, colors }
    }

    pub fn colors(&self) -> &Colorizer {
        &self.colors
    }

    /// Announces a stage that is about to run.
    pub fn begin(&mut self, number: usize, description: &str) -> Result<()> {
        let pending = format!("{} : {} ...", stage_label(number), description);
        if self.colors.is_styled() {
            write!(self.out, "{}", pending).map_err(HarnessError::Report)?;
        } else {
            writeln!(self.out, "{}", pending).map_err(HarnessError::Report)?;
        }
        self.out.flush().map_err(HarnessError::Report)
    }

    /// Prints the final status of a stage announced with [`Reporter::begin`].
    pub fn finish(&mut self, number: usize, description: &str, outcome: Outcome) -> Result<()> {
        if self.colors.is_styled() {
            write!(self.out, "\r").map_err(HarnessError::Report)?;
        }
        self.write_status(number, description, outcome)
    }

    /// Prints an `SK` line for a stage that was never started.
    pub fn skipped(&mut self, number: usize, description: &str) -> Result<()> {
        self.write_status(number, description, Outcome::Skipped)
    }

    /// Prints a free-form line (suite headings, banners).
    pub fn line(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{}", text).map_err(HarnessError::Report)
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_status(&mut self, number: usize, description: &str, outcome: Outcome) -> Result<()> {
        writeln!(
            self.out,
            "{} : {} : {}",
            stage_label(number),
            outcome.paint(&self.colors),
            description
        )
        .map_err(HarnessError::Report)?;
        self.out.flush().map_err(HarnessError::Report)
    }
}
