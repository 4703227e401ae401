//! Terminal output formatting and utilities.
//!
//! Every user-facing line is prefixed with the Sonar badge; the badge color
//! tells a plain log line from a success, warning or error banner.

pub mod colors;
pub mod errors;
pub mod progress;
pub mod prompt;
pub mod report;

use colors::{Background, ColorSupport};

/// One line of a rendered report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Title(String),
    Log(String),
}

/// Closing verdict of a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Banner {
    Success(String),
    Warning(String),
    Error(String),
}

/// Output handler for consistent terminal formatting
pub struct OutputHandler {
    colors: ColorSupport,
}

impl OutputHandler {
    /// Create a new output handler
    pub fn new() -> Self {
        Self {
            colors: ColorSupport::detect(),
        }
    }

    fn badge(&self, background: Background) -> String {
        self.colors.badge(background, " Sonar ")
    }

    /// Print a plain log line
    pub fn log(&self, message: &str) {
        println!("{} {}", self.badge(Background::Blue), message);
    }

    /// Print a section title
    pub fn title(&self, message: &str) {
        println!("\n{} {}", self.badge(Background::Blue), self.colors.bold(message));
    }

    /// Print a `label: value` settings line
    pub fn setting(&self, label: &str, value: impl std::fmt::Display) {
        self.log(&format!("{} {}", self.colors.bold(label), value));
    }

    /// Print a horizontal rule
    pub fn rule(&self) {
        self.log("------------");
    }

    pub fn success(&self, message: &str) {
        println!("\n{} {}\n", self.badge(Background::Green), self.colors.green(message));
    }

    pub fn warning(&self, message: &str) {
        eprintln!("\n{} {}\n", self.badge(Background::Cyan), self.colors.cyan(message));
    }

    pub fn error(&self, message: &str) {
        eprintln!("\n{} {}\n", self.badge(Background::Red), self.colors.red(message));
    }

    pub fn banner(&self, banner: &Banner) {
        match banner {
            Banner::Success(message) => self.success(message),
            Banner::Warning(message) => self.warning(message),
            Banner::Error(message) => self.error(message),
        }
    }

    pub fn lines(&self, lines: &[Line]) {
        for line in lines {
            match line {
                Line::Title(text) => self.title(text),
                Line::Log(text) => self.log(text),
            }
        }
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Join items as English prose: `a, b and c`
pub fn listify(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}
