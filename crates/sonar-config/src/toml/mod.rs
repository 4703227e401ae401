//! sonar.toml parsing
//!
//! Syntax errors are reported through `toml_edit` so the message carries a
//! line and column; the document is then deserialized with `toml` + serde.

use crate::{ConfigResult, SonarConfig};
use sonar_core::error::SonarError;

/// Parse TOML text into a validated configuration
pub fn parse_sonar_toml(content: &str) -> ConfigResult<SonarConfig> {
    content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| syntax_error(content, e.message(), e.span()))?;

    let config: SonarConfig = toml::from_str(content)
        .map_err(|e| syntax_error(content, e.message(), e.span()))?;

    config.validate()?;
    Ok(config)
}

/// Serialize a configuration to TOML
pub fn serialize_sonar_toml(config: &SonarConfig) -> ConfigResult<String> {
    toml::to_string_pretty(config).map_err(|e| SonarError::TomlParse {
        message: format!("TOML serialization error: {}", e),
        line: 0,
        column: 0,
    })
}

/// Load and parse sonar.toml from file path
pub async fn load_from_file(path: &camino::Utf8Path) -> ConfigResult<SonarConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SonarError::io(format!("Failed to read {}", path), e))?;

    parse_sonar_toml(&content)
}

fn syntax_error(content: &str, message: &str, span: Option<std::ops::Range<usize>>) -> SonarError {
    let (line, column) = span
        .map(|span| line_column(content, span.start))
        .unwrap_or((0, 0));
    SonarError::TomlParse {
        message: message.trim().to_string(),
        line,
        column,
    }
}

/// One-based line and column of a byte offset
fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let before = &content[..offset.min(content.len())];
    let line = before.matches('\n').count() + 1;
    let column = before
        .rfind('\n')
        .map_or(before.chars().count(), |nl| before[nl + 1..].chars().count())
        + 1;
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config = parse_sonar_toml("concurrency = 4\n").unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.folder, ".");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
folder = "repo"
internal-scopes = ["@acme"]
devPatterns = ["*.test.js", "tests"]

[groups]
lint = "^eslint"

[usage]
ignoreMatches = ["jest-junit"]
"#;
        let config = parse_sonar_toml(toml).unwrap();
        assert_eq!(config.folder, "repo");
        assert_eq!(config.internal_scopes, vec!["@acme"]);
        assert_eq!(config.group("lint"), Some("^eslint"));
        assert_eq!(config.usage.ignore_matches, vec!["jest-junit"]);
    }

    #[test]
    fn test_syntax_error_has_location() {
        let err = parse_sonar_toml("folder = \"a\"\nconcurrency = = 3\n").unwrap_err();
        match err {
            SonarError::TomlParse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_value_is_rejected() {
        assert!(parse_sonar_toml("concurrency = 0\n").is_err());
        assert!(parse_sonar_toml("concurrency = \"many\"\n").is_err());
    }

    #[test]
    fn test_round_trip_serialization() {
        let mut config = SonarConfig::default();
        config.ignore_scopes.push("@private".to_string());
        let text = serialize_sonar_toml(&config).unwrap();
        assert_eq!(parse_sonar_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_line_column() {
        assert_eq!(line_column("ab\ncd", 4), (2, 2));
        assert_eq!(line_column("abc", 0), (1, 1));
    }
}
