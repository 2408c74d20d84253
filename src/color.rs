//! Terminal styling for status tags and banners.
//!
//! Styling is a value, not process state: a [`Colorizer`] is built once from
//! the configured [`ColorMode`] and handed to whoever renders output. The
//! plain variant returns its input untouched.

use std::io::Write;

use termcolor::{Buffer, Color, ColorSpec, WriteColor};

/// User-facing color selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColorMode {
    /// Style only when stdout is a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// Whether this mode produces styled output in the current process.
    pub fn is_enabled(self) -> bool {
        match self {
            ColorMode::Auto => atty::is(atty::Stream::Stdout),
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

/// The handful of looks the harness uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Success,
    Error,
    Skip,
    Bold,
    BoldSuccess,
    BoldError,
}

impl Style {
    fn spec(self) -> ColorSpec {
        let mut spec = ColorSpec::new();
        match self {
            Style::Success => spec.set_fg(Some(Color::Green)),
            Style::Error => spec.set_fg(Some(Color::Red)),
            Style::Skip => spec.set_fg(Some(Color::Yellow)),
            Style::Bold => spec.set_bold(true),
            Style::BoldSuccess => spec.set_fg(Some(Color::Green)).set_bold(true),
            Style::BoldError => spec.set_fg(Some(Color::Red)).set_bold(true),
        };
        spec
    }
}

/// Wraps strings in ANSI styling, or not at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Colorizer {
    styled: bool,
}

impl Colorizer {
    pub fn ansi() -> Self {
        Self { styled: true }
    }

    pub fn plain() -> Self {
        Self { styled: false }
    }

    pub fn from_mode(mode: ColorMode) -> Self {
        Self {
            styled: mode.is_enabled(),
        }
    }

    /// True when output carries escape sequences, which also means the
    /// terminal is assumed to honour a carriage return.
    pub fn is_styled(&self) -> bool {
        self.styled
    }

    pub fn paint(&self, text: &str, style: Style) -> String {
        if !self.styled {
            return text.to_string();
        }
        let mut buf = Buffer::ansi();
        // Writes into an in-memory buffer cannot fail.
        let _ = buf.set_color(&style.spec());
        let _ = buf.write_all(text.as_bytes());
        let _ = buf.reset();
        String::from_utf8_lossy(buf.as_slice()).into_owned()
    }

    pub fn success(&self, text: &str) -> String {
        self.paint(text, Style::Success)
    }

    pub fn error(&self, text: &str) -> String {
        self.paint(text, Style::Error)
    }

    pub fn skip(&self, text: &str) -> String {
        self.paint(text, Style::Skip)
    }

    pub fn bold(&self, text: &str) -> String {
        self.paint(text, Style::Bold)
    }
}
