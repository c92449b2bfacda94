use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{Config, ConfigError, OutputFormat};

/// Audit AWS Identity Center (SSO) groups and permission sets for an account
#[derive(Parser, Debug)]
#[command(name = "aws-sso-auditor", version)]
pub struct CommandLineArgs {
    /// AWS account ID to audit (12 digits)
    #[arg(value_name = "ACCOUNT_ID")]
    pub account_id: String,

    /// Report format(s) to write
    #[arg(long, value_enum, value_name = "FORMAT", default_value = "both")]
    pub output_format: OutputSelection,

    /// Directory report files are written to
    #[arg(long, value_name = "PATH")]
    pub output_dir: Option<PathBuf>,

    /// AWS region
    #[arg(long, value_name = "REGION")]
    pub aws_region: Option<String>,

    /// AWS profile to use
    #[arg(long, value_name = "NAME")]
    pub aws_profile: Option<String>,

    /// Suppress console output, only save files
    #[arg(long, short)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Don't include a timestamp in report filenames
    #[arg(long)]
    pub no_timestamp: bool,
}

impl CommandLineArgs {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Resolves the effective configuration: explicit flags beat environment
    /// variables beat defaults.
    pub fn to_config(&self) -> Result<Config, ConfigError> {
        let env = Config::from_env();
        let config = Config {
            aws_region: self.aws_region.clone().unwrap_or(env.aws_region),
            aws_profile: self.aws_profile.clone().or(env.aws_profile),
            timeout_secs: env.timeout_secs,
            output_formats: self.output_format.formats(),
            output_directory: self.output_dir.clone().unwrap_or(env.output_directory),
            include_timestamp: !self.no_timestamp,
            debug: self.debug || env.debug,
            quiet: self.quiet || env.quiet,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Output format selection as exposed on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputSelection {
    Json,
    Yaml,
    Both,
}

impl OutputSelection {
    /// Expands the selection into the concrete formats to write.
    pub fn formats(self) -> Vec<OutputFormat> {
        match self {
            OutputSelection::Json => vec![OutputFormat::Json],
            OutputSelection::Yaml => vec![OutputFormat::Yaml],
            OutputSelection::Both => vec![OutputFormat::Json, OutputFormat::Yaml],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CommandLineArgs {
        CommandLineArgs::try_parse_from(args).expect("arguments should parse")
    }

    #[test]
    fn test_account_id_is_required() {
        assert!(CommandLineArgs::try_parse_from(["aws-sso-auditor"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["aws-sso-auditor", "123456789012"]);
        assert_eq!(args.account_id, "123456789012");
        assert_eq!(args.output_format, OutputSelection::Both);
        assert!(args.output_dir.is_none());
        assert!(!args.quiet);
        assert!(!args.debug);
        assert!(!args.no_timestamp);
    }

    #[test]
    fn test_flags_parse() {
        let args = parse(&[
            "aws-sso-auditor",
            "123456789012",
            "--output-format",
            "json",
            "--output-dir",
            "/tmp/reports",
            "--aws-region",
            "eu-west-1",
            "--aws-profile",
            "audit",
            "-q",
            "--debug",
            "--no-timestamp",
        ]);
        assert_eq!(args.output_format, OutputSelection::Json);
        assert_eq!(args.output_dir.as_deref(), Some(std::path::Path::new("/tmp/reports")));
        assert_eq!(args.aws_region.as_deref(), Some("eu-west-1"));
        assert_eq!(args.aws_profile.as_deref(), Some("audit"));
        assert!(args.quiet && args.debug && args.no_timestamp);
    }

    #[test]
    fn test_invalid_output_format_is_rejected() {
        assert!(CommandLineArgs::try_parse_from([
            "aws-sso-auditor",
            "123456789012",
            "--output-format",
            "xml",
        ])
        .is_err());
    }

    #[test]
    fn test_output_selection_expansion() {
        assert_eq!(OutputSelection::Json.formats(), vec![OutputFormat::Json]);
        assert_eq!(OutputSelection::Yaml.formats(), vec![OutputFormat::Yaml]);
        assert_eq!(
            OutputSelection::Both.formats(),
            vec![OutputFormat::Json, OutputFormat::Yaml]
        );
    }

    // Environment handling is process-global, so every env-sensitive
    // assertion lives in this single test.
    #[test]
    fn test_env_and_flag_precedence() {
        use crate::config::{ENV_DEBUG, ENV_OUTPUT_DIR, ENV_PROFILE, ENV_QUIET, ENV_REGION};

        for var in [ENV_REGION, ENV_PROFILE, ENV_OUTPUT_DIR, ENV_DEBUG, ENV_QUIET] {
            std::env::remove_var(var);
        }

        let bare = parse(&["aws-sso-auditor", "123456789012"]);
        let config = bare.to_config().unwrap();
        assert_eq!(config.aws_region, crate::config::DEFAULT_REGION);
        assert_eq!(config.output_directory, PathBuf::from("."));
        assert!(!config.debug && !config.quiet);

        std::env::set_var(ENV_REGION, "ap-southeast-2");
        std::env::set_var(ENV_OUTPUT_DIR, "/tmp/audits");
        std::env::set_var(ENV_QUIET, "true");

        // Environment beats defaults.
        let config = bare.to_config().unwrap();
        assert_eq!(config.aws_region, "ap-southeast-2");
        assert_eq!(config.output_directory, PathBuf::from("/tmp/audits"));
        assert!(config.quiet);

        // Explicit flags beat the environment.
        let flagged = parse(&[
            "aws-sso-auditor",
            "123456789012",
            "--aws-region",
            "eu-central-1",
            "--output-dir",
            "/tmp/other",
        ]);
        let config = flagged.to_config().unwrap();
        assert_eq!(config.aws_region, "eu-central-1");
        assert_eq!(config.output_directory, PathBuf::from("/tmp/other"));

        for var in [ENV_REGION, ENV_PROFILE, ENV_OUTPUT_DIR, ENV_DEBUG, ENV_QUIET] {
            std::env::remove_var(var);
        }
    }
}
