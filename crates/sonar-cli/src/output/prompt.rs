//! Interactive choices.
//!
//! Prompts are awaited one at a time by the commands; nothing here queues.

use sonar_core::error::{SonarError, SonarResult};
use std::future::Future;
use std::io::{self, Write};

/// One selectable answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub label: String,
    pub value: String,
}

impl Candidate {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Asks the user to pick between candidates
pub trait Choose: Send + Sync {
    /// Value of the chosen candidate
    fn choose(&self, prompt: &str, candidates: &[Candidate]) -> impl Future<Output = SonarResult<String>> + Send;

    fn confirm(&self, prompt: &str) -> impl Future<Output = SonarResult<bool>> + Send;
}

/// Numbered-list chooser on stdin/stdout.
///
/// With `assume_yes` nothing is asked: the first candidate wins and every
/// confirmation is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalChooser {
    assume_yes: bool,
}

impl TerminalChooser {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Choose for TerminalChooser {
    async fn choose(&self, prompt: &str, candidates: &[Candidate]) -> SonarResult<String> {
        let first = candidates.first().ok_or_else(|| SonarError::Prompt {
            message: format!("Nothing to choose from for: {prompt}"),
        })?;
        if self.assume_yes {
            return Ok(first.value.clone());
        }

        let mut menu = format!("? {prompt}\n");
        for (index, candidate) in candidates.iter().enumerate() {
            menu.push_str(&format!("  {}) {}\n", index + 1, candidate.label));
        }
        menu.push_str(&format!("Answer [1-{}, default 1]: ", candidates.len()));

        loop {
            let answer = ask(&menu).await?;
            match parse_selection(&answer, candidates.len()) {
                Some(index) => return Ok(candidates[index].value.clone()),
                None => println!("Please enter a number between 1 and {}", candidates.len()),
            }
        }
    }

    async fn confirm(&self, prompt: &str) -> SonarResult<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        let answer = ask(&format!("? {prompt} (y/N) ")).await?;
        Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

/// Zero-based index for a typed answer; empty means the first candidate
fn parse_selection(answer: &str, count: usize) -> Option<usize> {
    let answer = answer.trim();
    if answer.is_empty() {
        return Some(0);
    }
    answer
        .parse::<usize>()
        .ok()
        .filter(|number| (1..=count).contains(number))
        .map(|number| number - 1)
}

async fn ask(question: &str) -> SonarResult<String> {
    print!("{question}");
    io::stdout()
        .flush()
        .map_err(|e| SonarError::io("Failed to write prompt".to_string(), e))?;

    // std's stdin keeps one shared buffer, so piped answers survive between prompts
    let (read, line) = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        io::stdin().read_line(&mut line).map(|read| (read, line))
    })
    .await
    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    .and_then(|result| result)
    .map_err(|e| SonarError::io("Failed to read answer".to_string(), e))?;
    if read == 0 {
        return Err(SonarError::Prompt {
            message: "Input closed before an answer was given, use --yes to run unattended".to_string(),
        });
    }
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("\n", 3), Some(0));
        assert_eq!(parse_selection(" 2 \n", 3), Some(1));
        assert_eq!(parse_selection("3", 3), Some(2));
        assert_eq!(parse_selection("0", 3), None);
        assert_eq!(parse_selection("4", 3), None);
        assert_eq!(parse_selection("two", 3), None);
    }

    #[test]
    fn test_assume_yes_takes_first() {
        let chooser = TerminalChooser::new(true);
        let candidates = vec![
            Candidate::new("1.2.0 (Workspace Version)", "1.2.0"),
            Candidate::new("^1.0.0 (3 usages)", "^1.0.0"),
        ];

        assert_eq!(
            tokio_test::block_on(chooser.choose("Which version?", &candidates)).unwrap(),
            "1.2.0"
        );
        assert!(tokio_test::block_on(chooser.confirm("Are you sure?")).unwrap());
        assert!(matches!(
            tokio_test::block_on(chooser.choose("Which version?", &[])),
            Err(SonarError::Prompt { .. })
        ));
    }
}
