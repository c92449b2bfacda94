use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;

use crate::{
    auditor::Report,
    config::{Config, OutputFormat},
    util,
};

mod json_format;
mod pretty_format;
mod yaml_format;

pub use pretty_format::format_summary;

/// Writes audit reports to disk and to the console, following the
/// configured formats, directory, and verbosity.
pub struct ReportWriter<'a> {
    config: &'a Config,
}

impl<'a> ReportWriter<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Writes the report once per configured format, creating the output
    /// directory if needed. Returns the written paths in format order.
    ///
    /// Writes are not transactional: a failure partway leaves earlier files
    /// in place.
    pub fn save(&self, report: &Report, account_id: &str) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.config.output_directory).with_context(|| {
            format!("creating output directory {}", self.config.output_directory.display())
        })?;

        let timestamp =
            self.config.include_timestamp.then(|| util::filename_timestamp(Local::now()));

        let mut saved = Vec::new();
        for format in &self.config.output_formats {
            let path = self.output_path(account_id, timestamp.as_deref(), *format);
            match format {
                OutputFormat::Json => self.save_json(report, &path)?,
                OutputFormat::Yaml => self.save_yaml(report, &path)?,
            }
            info!(
                "{} results saved to: {}",
                format.extension().to_uppercase(),
                path.display()
            );
            saved.push(path);
        }
        Ok(saved)
    }

    fn output_path(
        &self,
        account_id: &str,
        timestamp: Option<&str>,
        format: OutputFormat,
    ) -> PathBuf {
        let mut name = format!("aws_sso_audit_{account_id}");
        if let Some(ts) = timestamp {
            name.push('_');
            name.push_str(ts);
        }
        name.push('.');
        name.push_str(format.extension());
        self.config.output_directory.join(name)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::auditor::{EchoedConfig, Report, ReportMetadata, Summary};

    fn sample_report() -> Report {
        Report {
            metadata: ReportMetadata {
                generated_at: "2024-03-07T09:05:42+00:00".to_string(),
                account_id: "123456789012".to_string(),
                sso_instance_arn: "arn:aws:sso:::instance/ssoins-123456789".to_string(),
                identity_store_id: "d-123456789".to_string(),
                auditor_version: env!("CARGO_PKG_VERSION").to_string(),
                config: EchoedConfig {
                    aws_region: "us-east-1".to_string(),
                    output_formats: vec![OutputFormat::Json, OutputFormat::Yaml],
                },
            },
            sso_groups_summary: vec!["Platform Team".to_string()],
            sso_permission_sets_summary: vec!["AdminAccess".to_string()],
            sso_groups: Vec::new(),
            permission_sets: Vec::new(),
            summary: Summary { total_groups: 1, total_permission_sets: 1, total_assignments: 1 },
        }
    }

    fn config_in(dir: &TempDir, formats: Vec<OutputFormat>, timestamp: bool) -> Config {
        Config {
            output_directory: dir.path().to_path_buf(),
            output_formats: formats,
            include_timestamp: timestamp,
            ..Config::default()
        }
    }

    #[test]
    fn save_writes_one_file_per_format_without_timestamp() -> Result<()> {
        let dir = TempDir::new()?;
        let config = config_in(&dir, vec![OutputFormat::Json, OutputFormat::Yaml], false);
        let writer = ReportWriter::new(&config);

        let saved = writer.save(&sample_report(), "123456789012")?;

        assert_eq!(
            saved,
            vec![
                dir.path().join("aws_sso_audit_123456789012.json"),
                dir.path().join("aws_sso_audit_123456789012.yaml"),
            ]
        );
        for path in &saved {
            assert!(path.exists(), "{} should exist", path.display());
        }
        Ok(())
    }

    #[test]
    fn save_includes_timestamp_in_filenames() -> Result<()> {
        let dir = TempDir::new()?;
        let config = config_in(&dir, vec![OutputFormat::Json], true);
        let writer = ReportWriter::new(&config);

        let saved = writer.save(&sample_report(), "123456789012")?;

        assert_eq!(saved.len(), 1);
        let name = saved[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("aws_sso_audit_123456789012_"), "unexpected name {name}");
        assert!(name.ends_with(".json"));
        // aws_sso_audit_<12 digits>_<YYYYMMDD_HHMMSS>.json
        assert_eq!(name.len(), "aws_sso_audit_123456789012_20240307_090542.json".len());
        Ok(())
    }

    #[test]
    fn save_creates_missing_output_directory() -> Result<()> {
        let dir = TempDir::new()?;
        let nested = dir.path().join("reports").join("sso");
        let config = Config {
            output_directory: nested.clone(),
            output_formats: vec![OutputFormat::Json],
            include_timestamp: false,
            ..Config::default()
        };
        let writer = ReportWriter::new(&config);

        let saved = writer.save(&sample_report(), "123456789012")?;
        assert!(nested.is_dir());
        assert!(saved[0].exists());
        Ok(())
    }

    #[test]
    fn saved_json_parses_back_to_the_same_report() -> Result<()> {
        let dir = TempDir::new()?;
        let config = config_in(&dir, vec![OutputFormat::Json], false);
        let writer = ReportWriter::new(&config);
        let report = sample_report();

        let saved = writer.save(&report, "123456789012")?;
        let parsed: Report = serde_json::from_str(&fs::read_to_string(&saved[0])?)?;

        assert_eq!(parsed.summary, report.summary);
        assert_eq!(parsed.metadata.account_id, report.metadata.account_id);
        assert_eq!(parsed.sso_groups_summary, report.sso_groups_summary);
        Ok(())
    }

    #[test]
    fn saved_yaml_preserves_key_order() -> Result<()> {
        let dir = TempDir::new()?;
        let config = config_in(&dir, vec![OutputFormat::Yaml], false);
        let writer = ReportWriter::new(&config);

        let saved = writer.save(&sample_report(), "123456789012")?;
        let text = fs::read_to_string(&saved[0])?;

        // Top-level keys appear in declaration order.
        let metadata_pos = text.find("metadata:").unwrap();
        let groups_pos = text.find("sso_groups_summary:").unwrap();
        let summary_pos = text.find("\nsummary:").unwrap();
        assert!(metadata_pos < groups_pos && groups_pos < summary_pos);

        let parsed: Report = serde_yaml::from_str(&text)?;
        assert_eq!(parsed.summary.total_assignments, 1);
        Ok(())
    }
}
