use std::io::Write;

use anyhow::Result;

use super::ReportWriter;
use crate::auditor::Report;

impl<'a> ReportWriter<'a> {
    /// Prints the full report to stdout as pretty JSON under a banner.
    /// No-op in quiet mode.
    pub fn display(&self, report: &Report) -> Result<()> {
        if self.config.quiet {
            return Ok(());
        }
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        writeln!(out)?;
        writeln!(out, "{}", "=".repeat(80))?;
        writeln!(out, "AWS SSO AUDIT RESULTS")?;
        writeln!(out, "{}", "=".repeat(80))?;
        serde_json::to_writer_pretty(&mut out, report)?;
        writeln!(out)?;
        Ok(())
    }
}

/// Renders the one-screen summary block shown after a successful run.
pub fn format_summary(report: &Report) -> String {
    [
        "📊 AWS SSO Audit Summary".to_string(),
        format!("🆔 Account: {}", report.metadata.account_id),
        format!("📅 Generated: {}", report.metadata.generated_at),
        format!("👥 Groups: {}", report.summary.total_groups),
        format!("🔐 Permission Sets: {}", report.summary.total_permission_sets),
        format!("🔗 Assignments: {}", report.summary.total_assignments),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auditor::{EchoedConfig, ReportMetadata, Summary},
        config::OutputFormat,
    };

    #[test]
    fn test_format_summary_lines() {
        let report = Report {
            metadata: ReportMetadata {
                generated_at: "2024-03-07T09:05:42+00:00".to_string(),
                account_id: "123456789012".to_string(),
                sso_instance_arn: "arn:aws:sso:::instance/ssoins-123456789".to_string(),
                identity_store_id: "d-123456789".to_string(),
                auditor_version: "1.0.0".to_string(),
                config: EchoedConfig {
                    aws_region: "us-east-1".to_string(),
                    output_formats: vec![OutputFormat::Json],
                },
            },
            sso_groups_summary: Vec::new(),
            sso_permission_sets_summary: Vec::new(),
            sso_groups: Vec::new(),
            permission_sets: Vec::new(),
            summary: Summary { total_groups: 3, total_permission_sets: 5, total_assignments: 11 },
        };

        let summary = format_summary(&report);
        assert!(summary.contains("Account: 123456789012"));
        assert!(summary.contains("Groups: 3"));
        assert!(summary.contains("Permission Sets: 5"));
        assert!(summary.contains("Assignments: 11"));
    }
}
