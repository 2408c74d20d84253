//! The composition root: runs the selected suites in order and prints the
//! final verdict.

use std::io::Write;

use tracing::info;

use crate::color::{Colorizer, Style};
use crate::config::HarnessConfig;
use crate::errors::{HarnessError, Result};
use crate::report::Reporter;
use crate::suite::{self, SuiteDef, SuiteReport};

const TITLE: &str = "=== Reduced C Compiler test suite ===";

/// Every suite report of one harness run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HarnessSummary {
    pub suites: Vec<SuiteReport>,
}

impl HarnessSummary {
    pub fn total_errors(&self) -> usize {
        self.suites.iter().map(SuiteReport::errors).sum()
    }

    pub fn passed(&self) -> bool {
        self.total_errors() == 0
    }

    /// Process exit status for this summary.
    ///
    /// By default the harness always exits 0 and only the banner tells the
    /// story; `strict` turns a non-zero tally into exit status 1.
    pub fn exit_code(&self, strict: bool) -> i32 {
        if strict && !self.passed() {
            1
        } else {
            0
        }
    }
}

/// Picks the suites to run, keeping catalog order.
///
/// Without `only`, extra suites run only when `include_extra` is set. A
/// suite named in `only` runs even when it is an extra one.
pub fn select_suites<'a>(
    catalog: &'a [SuiteDef],
    include_extra: bool,
    only: &[String],
) -> Result<Vec<&'a SuiteDef>> {
    if let Some(unknown) = only
        .iter()
        .find(|name| !catalog.iter().any(|s| &s.name == *name))
    {
        return Err(HarnessError::config(format!("unknown suite '{}'", unknown)));
    }
    if only.is_empty() {
        return Ok(catalog
            .iter()
            .filter(|s| include_extra || !s.extra)
            .collect());
    }
    Ok(catalog.iter().filter(|s| only.contains(&s.name)).collect())
}

/// `XXX 3 errors XXX` or `All tests passed`, styled.
pub fn banner(total_errors: usize, colors: &Colorizer) -> String {
    match total_errors {
        0 => colors.paint("   All tests passed", Style::BoldSuccess),
        1 => colors.paint("XXX 1 error XXX", Style::BoldError),
        n => colors.paint(&format!("XXX {} errors XXX", n), Style::BoldError),
    }
}

/// Runs the selected suites sequentially and prints the banner.
///
/// Infrastructure errors abort immediately; nothing after the failing stage
/// runs and no banner is printed.
pub fn run_harness<W: Write>(
    config: &HarnessConfig,
    catalog: &[SuiteDef],
    reporter: &mut Reporter<W>,
) -> Result<HarnessSummary> {
    let selected = select_suites(catalog, config.include_extra, &config.only)?;
    let colors = *reporter.colors();

    reporter.line(&colors.bold(TITLE))?;
    let mut summary = HarnessSummary::default();
    for suite_def in selected {
        reporter.line("")?;
        reporter.line(&colors.bold(&format!("Test {}", suite_def.name)))?;
        summary
            .suites
            .push(suite::run_suite(suite_def, config, reporter)?);
    }

    let total = summary.total_errors();
    info!(suites = summary.suites.len(), total_errors = total, "harness finished");
    reporter.line("")?;
    reporter.line(&banner(total, &colors))?;
    Ok(summary)
}
