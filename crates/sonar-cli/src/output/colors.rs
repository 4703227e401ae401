//! Terminal color support detection and formatting.
//!
//! Respects the NO_COLOR environment variable and only colors output when
//! both stdout and stderr are terminals.

use std::env;
use std::io::{self, IsTerminal};

/// Color support detection and formatting
#[derive(Debug, Clone, Copy)]
pub struct ColorSupport {
    enabled: bool,
}

impl ColorSupport {
    /// Detect color support automatically
    pub fn detect() -> Self {
        let enabled = Self::should_use_colors();
        Self { enabled }
    }

    /// Force disable colors
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    /// Check if colors should be used
    fn should_use_colors() -> bool {
        if env::var("NO_COLOR").is_ok() {
            return false;
        }

        io::stderr().is_terminal() && io::stdout().is_terminal()
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }
}

impl ColorSupport {
    /// Format text in green
    pub fn green(&self, text: &str) -> String {
        self.paint("32", text)
    }

    /// Format text in red
    pub fn red(&self, text: &str) -> String {
        self.paint("31", text)
    }

    /// Format text in cyan
    pub fn cyan(&self, text: &str) -> String {
        self.paint("36", text)
    }

    /// Format text as dim/gray
    pub fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    pub fn bold(&self, text: &str) -> String {
        self.paint("1", text)
    }

    /// Bright white text on a colored background
    pub fn badge(&self, background: Background, text: &str) -> String {
        self.paint(&format!("97;{}", background.code()), text)
    }
}

/// Background colors used for the Sonar badge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Background {
    Blue,
    Red,
    Cyan,
    Green,
}

impl Background {
    fn code(self) -> u8 {
        match self {
            Background::Blue => 44,
            Background::Red => 41,
            Background::Cyan => 46,
            Background::Green => 42,
        }
    }
}
