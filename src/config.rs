//! Harness configuration.

use std::path::{Path, PathBuf};

use crate::color::ColorMode;
use crate::errors::{HarnessError, Result};

const DEFAULT_COMPILER: &str = "bin/ReducedCCompiler/rcc";
const DEFAULT_VM: &str = "bin/MiniStackMachine/msm";
const DEFAULT_LOG_DIR: &str = "logs";

/// Everything the driver needs besides the suite tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Path to the compiler binary.
    pub compiler: PathBuf,
    /// Path to the virtual machine binary.
    pub vm: PathBuf,
    /// Directory holding one sub-directory per suite.
    pub fixture_root: PathBuf,
    /// Name of the per-suite directory receiving `out_NNN.txt` / `err_NNN.txt`.
    pub log_dir_name: String,
    pub color: ColorMode,
    /// Also run suites flagged `extra`.
    pub include_extra: bool,
    /// When non-empty, only suites with these names run.
    pub only: Vec<String>,
    /// Exit non-zero when any stage reported KO.
    pub strict_exit: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            compiler: PathBuf::from(DEFAULT_COMPILER),
            vm: PathBuf::from(DEFAULT_VM),
            fixture_root: PathBuf::from("."),
            log_dir_name: DEFAULT_LOG_DIR.to_string(),
            color: ColorMode::Auto,
            include_extra: false,
            only: Vec::new(),
            strict_exit: false,
        }
    }
}

impl HarnessConfig {
    /// Anchors relative paths to `base`.
    ///
    /// Stages run inside their suite directory, so a relative toolchain path
    /// would otherwise be resolved against the wrong place. Bare program
    /// names such as `rcc` are left alone for `PATH` lookup.
    pub fn anchored_at(mut self, base: &Path) -> Result<Self> {
        if self.log_dir_name.is_empty() {
            return Err(HarnessError::config("log directory name must not be empty"));
        }
        self.compiler = anchor_program(&self.compiler, base);
        self.vm = anchor_program(&self.vm, base);
        if self.fixture_root.is_relative() {
            self.fixture_root = base.join(&self.fixture_root);
        }
        Ok(self)
    }

    /// [`HarnessConfig::anchored_at`] the current working directory.
    pub fn resolved(self) -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| HarnessError::io("resolve", ".", e))?;
        self.anchored_at(&cwd)
    }

    pub fn suite_dir(&self, dir: &Path) -> PathBuf {
        self.fixture_root.join(dir)
    }
}

fn anchor_program(program: &Path, base: &Path) -> PathBuf {
    if program.is_relative() && program.components().count() > 1 {
        base.join(program)
    } else {
        program.to_path_buf()
    }
}
