//! Golden-file comparison.
//!
//! Both files are read in full and decoded as UTF-8. Byte sequences that are
//! not valid UTF-8 are rendered as `\xNN` escapes instead of failing, so a
//! toolchain that emits garbage still produces a comparable string. Equality
//! is exact, trailing newlines included.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::errors::{HarnessError, Result};

/// Decodes `bytes` as UTF-8, escaping every undecodable byte as `\xNN`.
pub fn decode_tolerant(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;
    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                // `None` means the input ends mid-sequence.
                let bad = e.error_len().unwrap_or(after.len());
                for byte in &after[..bad] {
                    let _ = write!(out, "\\x{:02x}", byte);
                }
                rest = &after[bad..];
            }
        }
    }
}

/// Reads a file and decodes it with [`decode_tolerant`].
///
/// A missing or unreadable file is an infrastructure error, never a mismatch.
pub fn read_decoded(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| HarnessError::io("read", path, e))?;
    Ok(decode_tolerant(&bytes))
}

/// Returns whether the decoded contents of the two files are identical.
pub fn files_match(actual: &Path, expected: &Path) -> Result<bool> {
    let actual_text = read_decoded(actual)?;
    let expected_text = read_decoded(expected)?;
    let equal = actual_text == expected_text;
    tracing::debug!(
        actual = %actual.display(),
        expected = %expected.display(),
        equal,
        "compared files"
    );
    Ok(equal)
}
