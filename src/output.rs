// ==============================================================================
// output.rs - Atomic Output Files
// ==============================================================================
// Description: Write-then-persist output for delimited tables and images
// Author: Matt Barham
// Created: 2026-10-13
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Every artifact is written to a temporary file inside the destination
// directory and renamed onto its final name only once fully flushed. A run
// that fails part-way leaves no file under the final name.
// ==============================================================================

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Output file being assembled under a temporary name
pub struct AtomicOutput {
    temp: NamedTempFile,
    final_path: PathBuf,
}

impl AtomicOutput {
    /// Create the destination directory if needed and open a temporary file
    /// next to `final_path`. `suffix` keeps the extension for writers that
    /// infer the format from the file name.
    pub fn create(final_path: impl Into<PathBuf>, suffix: &str) -> Result<Self> {
        let final_path = final_path.into();
        let dir = final_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {:?}", dir))?;

        let temp = tempfile::Builder::new()
            .prefix(".gwas-prep-")
            .suffix(suffix)
            .tempfile_in(dir)
            .with_context(|| format!("Failed to create temporary file in {:?}", dir))?;

        debug!("Staging {:?} at {:?}", final_path, temp.path());

        Ok(Self { temp, final_path })
    }

    /// Path of the temporary file
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    pub fn file_mut(&mut self) -> &mut std::fs::File {
        self.temp.as_file_mut()
    }

    /// Flush, sync and rename onto the final name
    pub fn commit(mut self) -> Result<PathBuf> {
        self.temp.as_file_mut().flush()?;
        self.temp
            .as_file()
            .sync_all()
            .context("Failed to sync output file")?;

        self.temp
            .persist(&self.final_path)
            .with_context(|| format!("Failed to persist output file {:?}", self.final_path))?;

        Ok(self.final_path)
    }
}

/// Write a space-delimited table atomically, with or without a header row
pub fn write_delimited<I>(path: impl Into<PathBuf>, header: Option<&[String]>, rows: I) -> Result<PathBuf>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut output = AtomicOutput::create(path, ".tmp")?;
    let mut count = 0usize;

    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b' ')
            .has_headers(false)
            .from_writer(output.file_mut());

        if let Some(header) = header {
            writer.write_record(header)?;
        }

        for row in rows {
            writer.write_record(&row)?;
            count += 1;
        }

        writer.flush()?;
    }

    let path = output.commit()?;
    debug!("Wrote {} rows to {:?}", count, path);
    Ok(path)
}

/// `<stem>_<YYYY-MM-DD>.txt`
pub fn dated_filename(stem: &str, date_stamp: &str) -> String {
    format!("{}_{}.txt", stem, date_stamp)
}
