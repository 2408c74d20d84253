//! Running one external process as a pipeline stage.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

use tracing::debug;

use crate::errors::{HarnessError, Result};
use crate::report::{Outcome, Reporter};

/// A fully resolved process invocation.
///
/// `stdout`, `stderr` and `stdin` are paths the harness opens itself, so they
/// must be valid from the harness's own working directory. `args` are handed
/// to the child verbatim and are interpreted relative to `working_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessStage {
    pub description: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub stdout: PathBuf,
    pub stderr: PathBuf,
    pub stdin: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

impl ProcessStage {
    /// The full argv, program first, for logging.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

/// Runs `stage` unless `skip` is set, reporting it as stage `number`.
///
/// A skipped stage touches no file and launches nothing. Otherwise the two
/// output files are truncated, the process runs to completion with its
/// streams bound to them and the outcome follows the exit status. Failing to
/// open a file or to launch the program is an error, not a KO.
pub fn run_stage<W: Write>(
    stage: &ProcessStage,
    number: usize,
    skip: bool,
    reporter: &mut Reporter<W>,
) -> Result<Outcome> {
    if skip {
        debug!(stage = number, "skipping process stage");
        reporter.skipped(number, &stage.description)?;
        return Ok(Outcome::Skipped);
    }

    reporter.begin(number, &stage.description)?;
    let status = launch(stage)?;
    let outcome = Outcome::from_success(status.success());
    debug!(stage = number, ?status, %outcome, "process stage finished");
    reporter.finish(number, &stage.description, outcome)?;
    Ok(outcome)
}

// The stage's file handles live in `command` and are closed when it drops at
// the end of this function, whatever the exit path.
fn launch(stage: &ProcessStage) -> Result<ExitStatus> {
    let stdout =
        File::create(&stage.stdout).map_err(|e| HarnessError::io("create", &stage.stdout, e))?;
    let stderr =
        File::create(&stage.stderr).map_err(|e| HarnessError::io("create", &stage.stderr, e))?;
    let stdin = match &stage.stdin {
        Some(path) => Stdio::from(File::open(path).map_err(|e| HarnessError::io("open", path, e))?),
        None => Stdio::null(),
    };

    let mut command = Command::new(&stage.program);
    command
        .args(&stage.args)
        .stdin(stdin)
        .stdout(stdout)
        .stderr(stderr);
    if let Some(dir) = &stage.working_dir {
        command.current_dir(dir);
    }

    debug!(argv = ?stage.argv(), cwd = ?stage.working_dir, "launching");
    command.status().map_err(|source| HarnessError::Spawn {
        program: stage.program.clone(),
        source,
    })
}
