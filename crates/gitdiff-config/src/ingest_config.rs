//! Ingestion configuration
//!
//! Configuration loaded from `.gitdiff.toml`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors reported by [`IngestConfig::validated`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("git_binary must not be empty")]
    EmptyGitBinary,

    #[error("difftastic_binary must not be empty")]
    EmptyDifftasticBinary,

    #[error("mydt_subcommand must not be empty")]
    EmptyMydtSubcommand,

    #[error("timeout_secs must be greater than zero")]
    ZeroTimeout,
}

/// The external tool that produces the line-delimited JSON diff
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiffTool {
    /// difftastic, driven through `GIT_EXTERNAL_DIFF`
    Difftastic,
    /// a git subcommand emitting unified hunks as JSON
    #[default]
    Mydt,
}

/// How whitespace-only changes are treated by git
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WhitespaceBehavior {
    #[default]
    ShowAll,
    IgnoreAll,
    IgnoreChange,
    IgnoreEol,
}

impl WhitespaceBehavior {
    /// Flags passed to the git diff command
    pub fn args(&self) -> &'static [&'static str] {
        match self {
            WhitespaceBehavior::ShowAll => &[],
            WhitespaceBehavior::IgnoreAll => &["-w"],
            WhitespaceBehavior::IgnoreChange => &["-b"],
            WhitespaceBehavior::IgnoreEol => &["--ignore-space-at-eol"],
        }
    }
}

/// Truncation limits; 0 means unlimited
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LimitsConfig {
    /// Maximum content lines kept per file
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,

    /// Maximum characters kept per line
    #[serde(default = "default_max_line_characters")]
    pub max_line_characters: usize,

    /// Maximum number of files in one diff
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

fn default_max_lines() -> usize {
    1000
}

fn default_max_line_characters() -> usize {
    5000
}

fn default_max_files() -> usize {
    100
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_lines: default_max_lines(),
            max_line_characters: default_max_line_characters(),
            max_files: default_max_files(),
        }
    }
}

/// Ingestion configuration loaded from `.gitdiff.toml`
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IngestConfig {
    /// The git executable
    #[serde(default = "default_git_binary")]
    pub git_binary: String,

    /// Wall-clock limit for one diff subprocess
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// External diff driver used for difftastic output
    #[serde(default = "default_difftastic_binary")]
    pub difftastic_binary: String,

    /// git subcommand producing the hunk-based JSON output
    #[serde(default = "default_mydt_subcommand")]
    pub mydt_subcommand: String,

    /// Tool used when the caller does not choose one
    #[serde(default)]
    pub default_tool: DiffTool,

    /// Whitespace handling used when the caller does not choose one
    #[serde(default)]
    pub whitespace: WhitespaceBehavior,

    #[serde(default)]
    pub limits: LimitsConfig,
}

fn default_git_binary() -> String {
    "git".to_string()
}

fn default_timeout_secs() -> u64 {
    360
}

fn default_difftastic_binary() -> String {
    "difft".to_string()
}

fn default_mydt_subcommand() -> String {
    "mydt".to_string()
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            git_binary: default_git_binary(),
            timeout_secs: default_timeout_secs(),
            difftastic_binary: default_difftastic_binary(),
            mydt_subcommand: default_mydt_subcommand(),
            default_tool: DiffTool::default(),
            whitespace: WhitespaceBehavior::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl IngestConfig {
    /// Load config from CWD first, then home directory, or use defaults
    pub fn load() -> Self {
        if let Some(content) = crate::load_config_file() {
            match toml::from_str(&content) {
                Ok(config) => {
                    log::info!("Loaded gitdiff config from file");
                    return config;
                }
                Err(e) => {
                    log::warn!("Failed to parse config file: {}", e);
                }
            }
        }

        log::debug!("Using default gitdiff config");
        Self::default()
    }

    /// Check the values that would otherwise only fail once a diff is requested
    pub fn validated(self) -> Result<Self, ConfigError> {
        if self.git_binary.trim().is_empty() {
            return Err(ConfigError::EmptyGitBinary);
        }
        if self.difftastic_binary.trim().is_empty() {
            return Err(ConfigError::EmptyDifftasticBinary);
        }
        if self.mydt_subcommand.trim().is_empty() {
            return Err(ConfigError::EmptyMydtSubcommand);
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IngestConfig::default();
        assert_eq!(config.git_binary, "git");
        assert_eq!(config.timeout_secs, 360);
        assert_eq!(config.difftastic_binary, "difft");
        assert_eq!(config.mydt_subcommand, "mydt");
        assert_eq!(config.default_tool, DiffTool::Mydt);
        assert_eq!(config.whitespace, WhitespaceBehavior::ShowAll);
        assert_eq!(config.limits.max_files, 100);
    }

    #[test]
    fn test_config_deserialize_partial() {
        let toml = r#"
            default_tool = "difftastic"
            whitespace = "ignore-eol"

            [limits]
            max_files = 5
        "#;
        let config: IngestConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.default_tool, DiffTool::Difftastic);
        assert_eq!(config.whitespace, WhitespaceBehavior::IgnoreEol);
        assert_eq!(config.limits.max_files, 5);
        // Other fields should use defaults
        assert_eq!(config.limits.max_lines, 1000);
        assert_eq!(config.git_binary, "git");
    }

    #[test]
    fn test_validated_rejects_empty_git_binary() {
        let config = IngestConfig {
            git_binary: "  ".to_string(),
            ..IngestConfig::default()
        };
        assert_eq!(config.validated().unwrap_err(), ConfigError::EmptyGitBinary);
    }

    #[test]
    fn test_validated_rejects_zero_timeout() {
        let config = IngestConfig {
            timeout_secs: 0,
            ..IngestConfig::default()
        };
        assert_eq!(config.validated().unwrap_err(), ConfigError::ZeroTimeout);
    }

    #[test]
    fn test_whitespace_args() {
        assert!(WhitespaceBehavior::ShowAll.args().is_empty());
        assert_eq!(WhitespaceBehavior::IgnoreAll.args(), &["-w"]);
        assert_eq!(WhitespaceBehavior::IgnoreChange.args(), &["-b"]);
        assert_eq!(
            WhitespaceBehavior::IgnoreEol.args(),
            &["--ignore-space-at-eol"]
        );
    }
}
