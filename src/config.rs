use std::{env, fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variables consulted when building a `Config`. Explicit CLI
/// flags take precedence over these; these take precedence over defaults.
pub const ENV_REGION: &str = "AWS_REGION";
pub const ENV_PROFILE: &str = "AWS_PROFILE";
pub const ENV_OUTPUT_DIR: &str = "AWS_SSO_AUDITOR_OUTPUT_DIR";
pub const ENV_DEBUG: &str = "AWS_SSO_AUDITOR_DEBUG";
pub const ENV_QUIET: &str = "AWS_SSO_AUDITOR_QUIET";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid output format: `{0}` (expected `json` or `yaml`)")]
    InvalidOutputFormat(String),

    #[error("timeout must be greater than 0")]
    InvalidTimeout,
}

/// A single on-disk report format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            other => Err(ConfigError::InvalidOutputFormat(other.to_string())),
        }
    }
}

/// Resolved runtime configuration for one audit run.
#[derive(Clone, Debug)]
pub struct Config {
    pub aws_region: String,
    pub aws_profile: Option<String>,
    pub timeout_secs: u64,

    pub output_formats: Vec<OutputFormat>,
    pub output_directory: PathBuf,
    pub include_timestamp: bool,

    pub debug: bool,
    pub quiet: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aws_region: DEFAULT_REGION.to_string(),
            aws_profile: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            output_formats: vec![OutputFormat::Json, OutputFormat::Yaml],
            output_directory: PathBuf::from("."),
            include_timestamp: true,
            debug: false,
            quiet: false,
        }
    }
}

impl Config {
    /// Builds a configuration from defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(region) = env::var(ENV_REGION) {
            config.aws_region = region;
        }
        if let Ok(profile) = env::var(ENV_PROFILE) {
            config.aws_profile = Some(profile);
        }
        if let Ok(dir) = env::var(ENV_OUTPUT_DIR) {
            config.output_directory = PathBuf::from(dir);
        }
        if env_flag(ENV_DEBUG) {
            config.debug = true;
        }
        if env_flag(ENV_QUIET) {
            config.quiet = true;
        }
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }
}

/// Returns true when the named environment variable is set to `true`
/// (case-insensitive).
pub fn env_flag(name: &str) -> bool {
    matches!(env::var(name), Ok(v) if v.eq_ignore_ascii_case("true"))
}
