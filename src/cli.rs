//! The rcc-harness Command-Line Interface.
//!
//! Parses arguments, installs logging, runs the driver and turns the result
//! into a process exit status.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::{
    catalog,
    color::{ColorMode, Colorizer},
    config::HarnessConfig,
    driver,
    errors::HarnessError,
    report::Reporter,
};

/// Exit status when the harness itself failed (missing fixture, unlaunchable tool, ...).
const INFRASTRUCTURE_EXIT: i32 = 2;

// ============================================================================
// CLI ARGUMENTS
// ============================================================================

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "rcc-harness",
    version,
    about = "Conformance tests for the Reduced C Compiler and the MiniStackMachine."
)]
pub struct HarnessArgs {
    /// Pass `extra` to also run the large extra suite.
    #[arg(value_parser = ["extra"])]
    pub extra: Option<String>,

    /// Path to the compiler binary.
    #[arg(long)]
    pub compiler: Option<PathBuf>,

    /// Path to the virtual machine binary.
    #[arg(long)]
    pub vm: Option<PathBuf>,

    /// Directory containing the suite fixture directories.
    #[arg(long)]
    pub fixtures: Option<PathBuf>,

    /// YAML suite table replacing the built-in catalog.
    #[arg(long)]
    pub suites: Option<PathBuf>,

    /// Run only the named suite (repeatable). Naming an extra suite selects
    /// it without the `extra` argument.
    #[arg(long = "only", value_name = "SUITE")]
    pub only: Vec<String>,

    /// When to style the output.
    #[arg(long, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    /// Exit with status 1 when any stage fails.
    #[arg(long)]
    pub strict: bool,

    /// Log every stage launch and comparison to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl HarnessArgs {
    pub fn to_config(&self) -> HarnessConfig {
        let defaults = HarnessConfig::default();
        HarnessConfig {
            compiler: self.compiler.clone().unwrap_or(defaults.compiler),
            vm: self.vm.clone().unwrap_or(defaults.vm),
            fixture_root: self.fixtures.clone().unwrap_or(defaults.fixture_root),
            log_dir_name: defaults.log_dir_name,
            color: self.color,
            include_extra: self.extra.is_some(),
            only: self.only.clone(),
            strict_exit: self.strict,
        }
    }
}

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

/// The main entry point for the CLI.
pub fn run() {
    let args = HarnessArgs::parse();
    init_logging(args.verbose);

    match execute(&args) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            process::exit(INFRASTRUCTURE_EXIT);
        }
    }
}

/// Runs the harness for already parsed arguments and returns the exit status.
pub fn execute(args: &HarnessArgs) -> Result<i32, HarnessError> {
    let config = args.to_config().resolved()?;
    let suites = match &args.suites {
        Some(path) => catalog::load_yaml(path)?,
        None => catalog::builtin(),
    };

    let mut reporter = Reporter::stdout(Colorizer::from_mode(config.color));
    let summary = driver::run_harness(&config, &suites, &mut reporter)?;
    Ok(summary.exit_code(config.strict_exit))
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // A subscriber may already be installed when embedded in tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
