//! Configuration discovery, layering and environment overrides
//!
//! Precedence, lowest first: defaults, config file, `SONAR_*` environment
//! variables, CLI flags.

use crate::{ConfigResult, SonarConfig};
use camino::{Utf8Path, Utf8PathBuf};
use sonar_core::error::SonarError;
use std::collections::HashMap;
use tracing::debug;

/// Config file names, in lookup order within one directory
pub const CONFIG_FILES: [&str; 3] = [".sonarrc", ".sonar.json", "sonar.toml"];

/// Main configuration loading interface
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
}

/// Configuration layering and merging
pub struct ConfigLayering;

/// Where the file layer came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// `.sonarrc` or `.sonar.json`
    Json(Utf8PathBuf),
    /// `sonar.toml`
    Toml(Utf8PathBuf),
    /// `"sonar"` key of a package.json
    PackageJson(Utf8PathBuf),
    /// `~/.sonarrc`
    Global(Utf8PathBuf),
    /// No file found
    Defaults,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub folder: Option<String>,
    pub concurrency: Option<usize>,
    pub registry: Option<String>,
    pub internal_scopes: Option<Vec<String>>,
    pub ignore_scopes: Option<Vec<String>>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self { cwd }
    }

    /// Load the file layer: an explicit path, else the nearest config file
    /// walking up from the working directory, else `~/.sonarrc`
    pub async fn load_file_config(
        &self,
        explicit: Option<&Utf8Path>,
    ) -> ConfigResult<(SonarConfig, ConfigSource)> {
        if let Some(path) = explicit {
            let path = self.cwd.join(path);
            return load_path(&path).await;
        }

        let mut current = Some(self.cwd.as_path());
        while let Some(dir) = current {
            for name in CONFIG_FILES {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    debug!(path = %candidate, "Using config file");
                    return load_path(&candidate).await;
                }
            }

            let manifest = dir.join("package.json");
            if manifest.is_file() {
                let package_json = crate::json::load_from_file(manifest.as_std_path()).await?;
                if let Some(section) = package_json.sonar_section() {
                    debug!(path = %manifest, "Using \"sonar\" key of package.json");
                    let config = SonarConfig::from_json_value(section.clone())?;
                    return Ok((config, ConfigSource::PackageJson(manifest)));
                }
            }

            current = dir.parent();
        }

        if let Some(global) = self.global_config_path() {
            if global.is_file() {
                let (config, _) = load_path(&global).await?;
                return Ok((config, ConfigSource::Global(global)));
            }
        }

        Ok((SonarConfig::default(), ConfigSource::Defaults))
    }

    /// Find a file in the working directory or its ancestors
    pub fn resolve_config_path(&self, filename: &str) -> Option<Utf8PathBuf> {
        self.cwd
            .ancestors()
            .map(|dir| dir.join(filename))
            .find(|path| path.exists())
    }

    fn global_config_path(&self) -> Option<Utf8PathBuf> {
        let home = dirs::home_dir()?;
        let home = Utf8PathBuf::try_from(home).ok()?;
        Some(home.join(".sonarrc"))
    }
}

async fn load_path(path: &Utf8Path) -> ConfigResult<(SonarConfig, ConfigSource)> {
    if path.extension() == Some("toml") {
        let config = crate::toml::load_from_file(path).await?;
        return Ok((config, ConfigSource::Toml(path.to_path_buf())));
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SonarError::io(format!("Failed to read {}", path), e))?;

    let config = if path.file_name() == Some("package.json") {
        let package_json = crate::json::parse_package_json(&content)?;
        match package_json.sonar_section() {
            Some(section) => SonarConfig::from_json_value(section.clone())?,
            None => SonarConfig::default(),
        }
    } else {
        SonarConfig::from_json_str(&content).map_err(|e| match e {
            SonarError::JsonParse { message } => SonarError::JsonParse {
                message: format!("In file {}: {}", path, message),
            },
            other => other,
        })?
    };
    Ok((config, ConfigSource::Json(path.to_path_buf())))
}

impl ConfigLayering {
    /// Apply environment and CLI layers on top of the file layer
    pub fn merge_configs(
        file_config: SonarConfig,
        env_overrides: &HashMap<String, String>,
        cli_overrides: &ConfigOverrides,
    ) -> ConfigResult<SonarConfig> {
        let mut merged = file_config;

        Self::apply_env_overrides(&mut merged, env_overrides)?;
        Self::apply_cli_overrides(&mut merged, cli_overrides);

        merged.validate()?;
        Ok(merged)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(
        config: &mut SonarConfig,
        overrides: &HashMap<String, String>,
    ) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "SONAR_FOLDER" => {
                    config.folder = value.clone();
                },
                "SONAR_CONCURRENCY" => {
                    config.concurrency =
                        value.parse().map_err(|_| SonarError::ConfigValidation {
                            field: "SONAR_CONCURRENCY".to_string(),
                            reason: format!("'{}' is not a positive integer", value),
                        })?;
                },
                "SONAR_REGISTRY" => {
                    config.registry = value.trim_end_matches('/').to_string();
                },
                "SONAR_REGISTRY_TOKEN" => {
                    config.registry_token = Some(value.clone());
                },
                _ => {
                    // Unknown environment variable, ignore
                },
            }
        }

        Ok(())
    }

    /// Apply CLI flag overrides
    fn apply_cli_overrides(config: &mut SonarConfig, overrides: &ConfigOverrides) {
        if let Some(folder) = &overrides.folder {
            config.folder = folder.clone();
        }
        if let Some(concurrency) = overrides.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(registry) = &overrides.registry {
            config.registry = registry.trim_end_matches('/').to_string();
        }
        if let Some(scopes) = &overrides.internal_scopes {
            config.internal_scopes = scopes.clone();
        }
        if let Some(scopes) = &overrides.ignore_scopes {
            config.ignore_scopes = scopes.clone();
        }
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with("SONAR_"))
            .collect()
    }
}
