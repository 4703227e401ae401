//! Progress bar for registry lookups and package scans.

use std::io::{self, IsTerminal, Write};
use std::time::{Duration, Instant};

const WIDTH: u64 = 30;

/// Single-line progress bar drawn on stderr when it is a terminal
pub struct ProgressBar {
    total: u64,
    current: u64,
    last_update: Option<Instant>,
    message: String,
    enabled: bool,
}

impl ProgressBar {
    /// Create a new progress bar
    pub fn new(total: usize, message: impl Into<String>) -> Self {
        Self {
            total: total as u64,
            current: 0,
            last_update: None,
            message: message.into(),
            enabled: io::stderr().is_terminal(),
        }
    }

    /// Advance by one
    pub fn tick(&mut self) {
        self.current = (self.current + 1).min(self.total);
        let now = Instant::now();

        // Redraw at most every 100ms to avoid flickering
        let due = self
            .last_update
            .map_or(true, |last| now.duration_since(last) > Duration::from_millis(100));
        if due || self.current == self.total {
            self.display();
            self.last_update = Some(now);
        }
    }

    /// Remove the bar from the terminal
    pub fn finish(&self) {
        if self.enabled {
            let mut stderr = io::stderr();
            let _ = write!(stderr, "\r\x1b[2K");
            let _ = stderr.flush();
        }
    }

    fn render(&self) -> String {
        let (filled, percentage) = if self.total > 0 {
            (self.current * WIDTH / self.total, self.current * 100 / self.total)
        } else {
            (WIDTH, 100)
        };
        format!(
            "{} [{}{}] {}%",
            self.message,
            "=".repeat(filled as usize),
            " ".repeat((WIDTH - filled) as usize),
            percentage
        )
    }

    fn display(&self) {
        if !self.enabled {
            return;
        }
        let mut stderr = io::stderr();
        let _ = write!(stderr, "\r{}", self.render());
        let _ = stderr.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let mut bar = ProgressBar::new(4, "Checking dependency versions");
        assert_eq!(bar.render(), format!("Checking dependency versions [{}] 0%", " ".repeat(30)));

        bar.tick();
        bar.tick();
        assert_eq!(
            bar.render(),
            format!("Checking dependency versions [{}{}] 50%", "=".repeat(15), " ".repeat(15))
        );

        for _ in 0..5 {
            bar.tick();
        }
        assert!(bar.render().ends_with("] 100%"));
    }
}
