//! Infrastructure errors for the conformance harness.
//!
//! A stage that fails (non-zero exit, mismatching output) is *not* an error:
//! it is recorded as a KO outcome and counted. The variants below cover the
//! other category, a broken test environment: a missing fixture, an
//! unwritable log directory, a toolchain binary that cannot be launched or a
//! malformed suite table. Those abort the whole run.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

/// Every way the harness itself can fail.
#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    /// A file or directory the harness needed could not be read, created or written.
    #[error("I/O error on '{}' while trying to {action}", path.display())]
    #[diagnostic(
        code(rcc_harness::io),
        help("check that the fixture exists and the suite directory is writable")
    )]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external process could not be started at all.
    #[error("failed to launch '{}'", program.display())]
    #[diagnostic(
        code(rcc_harness::spawn),
        help("build the toolchain first or point --compiler / --vm at the binaries")
    )]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The status stream (normally stdout) rejected a write.
    #[error("failed to write stage report")]
    #[diagnostic(code(rcc_harness::report))]
    Report(#[source] std::io::Error),

    /// A suite table file could not be parsed.
    #[error("invalid suite table '{}': {message}", path.display())]
    #[diagnostic(code(rcc_harness::catalog))]
    Catalog { path: PathBuf, message: String },

    /// The harness configuration is unusable.
    #[error("invalid configuration: {message}")]
    #[diagnostic(code(rcc_harness::config))]
    Config { message: String },
}

impl HarnessError {
    pub fn io(action: &'static str, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        HarnessError::Io {
            action,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        HarnessError::Config {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;
