use std::{
    fs,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};

use super::ReportWriter;
use crate::auditor::Report;

impl<'a> ReportWriter<'a> {
    pub(super) fn save_json(&self, report: &Report, path: &Path) -> Result<()> {
        let file =
            fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, report)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}
