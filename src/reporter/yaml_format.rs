use std::{fs, path::Path};

use anyhow::{Context, Result};

use super::ReportWriter;
use crate::auditor::Report;

impl<'a> ReportWriter<'a> {
    pub(super) fn save_yaml(&self, report: &Report, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(report).context("serialize report yaml")?;
        fs::write(path, data).with_context(|| format!("writing {}", path.display()))
    }
}
