pub use crate::errors::{HarnessError, Result};

pub mod catalog;
pub mod cli;
pub mod color;
pub mod config;
pub mod driver;
pub mod errors;
pub mod oracle;
pub mod process;
pub mod report;
pub mod suite;
