// ==============================================================================
// config.rs - Study Configuration
// ==============================================================================
// Description: Explicit run configuration (directories, field-file layout, date)
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Defaults follow the UK Biobank field-split layout:
//   fid31.csv     eid,31-0.0      (self-reported sex, also the subject roster)
//   fid21000.csv  eid,21000-0.0   (self-reported ethnic background)
//   fid21003.csv  eid,21003-0.0   (age at assessment)
//   fid22001.csv  eid,22001-0.0   (genetic sex)
//   fid22006.csv  eid,22006-0.0   (genetic ethnic grouping)
//   fid22009.csv  eid,22009-0.1..22009-0.40 (genetic principal components)
// ==============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::parsers::ReadOptions;

/// Configuration errors, detected before any output file is opened
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unrecognized sex filter '{0}' (expected male, female or all)")]
    UnknownSexFilter(String),

    #[error("Unsupported ancestry '{0}' (only white_british has a QC definition)")]
    UnsupportedAncestry(String),

    #[error("Only one of --p ('{p}') or --neglog10p ('{neglog10p}') may be specified")]
    BothSignificanceColumns { p: String, neglog10p: String },

    #[error("Either --p or --neglog10p must be specified")]
    NoSignificanceColumn,

    #[error("Invalid value for {option}: {reason}")]
    InvalidOption { option: &'static str, reason: String },

    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A single-field table: file name (relative to the input directory) and the
/// value column of interest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSource {
    pub file: String,
    pub column: String,
}

impl FieldSource {
    pub fn new(file: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            column: column.into(),
        }
    }
}

/// Layout of the per-field input tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableLayout {
    /// Identifier column shared by every field table
    pub id_column: String,
    /// Field delimiter of the input tables
    pub delimiter: char,
    /// Tokens treated as missing values
    pub missing_values: Vec<String>,
    /// Subject roster (only the identifier column is used)
    pub roster: String,
    pub genetic_ancestry: FieldSource,
    pub reported_ancestry: FieldSource,
    pub genetic_sex: FieldSource,
    pub reported_sex: FieldSource,
    /// Principal components table: identifier plus 40 value columns
    pub principal_components: String,
    pub age: FieldSource,
    /// Sex column written as the SEX covariate
    pub covariate_sex: FieldSource,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            id_column: "eid".to_string(),
            delimiter: ',',
            missing_values: vec![
                String::new(),
                "NA".to_string(),
                "NaN".to_string(),
                "nan".to_string(),
            ],
            roster: "fid31.csv".to_string(),
            genetic_ancestry: FieldSource::new("fid22006.csv", "22006-0.0"),
            reported_ancestry: FieldSource::new("fid21000.csv", "21000-0.0"),
            genetic_sex: FieldSource::new("fid22001.csv", "22001-0.0"),
            reported_sex: FieldSource::new("fid31.csv", "31-0.0"),
            principal_components: "fid22009.csv".to_string(),
            age: FieldSource::new("fid21003.csv", "21003-0.0"),
            covariate_sex: FieldSource::new("fid31.csv", "31-0.0"),
        }
    }
}

impl TableLayout {
    /// Reader options for the field tables
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            // validate() guarantees an ASCII delimiter
            delimiter: self.delimiter as u8,
            has_headers: true,
            missing_values: self.missing_values.clone(),
        }
    }
}

/// Explicit per-run configuration passed to every pipeline entry point
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Directory holding the field tables
    pub input_dir: PathBuf,
    /// Directory receiving the generated files
    pub output_dir: PathBuf,
    pub layout: TableLayout,
    /// Date stamped into output file names
    pub run_date: NaiveDate,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("../"),
            output_dir: PathBuf::from("../GWAS_INPUT/"),
            layout: TableLayout::default(),
            run_date: chrono::Local::now().date_naive(),
        }
    }
}

impl StudyConfig {
    /// Load a configuration from a JSON file; absent keys take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: StudyConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.layout.delimiter.is_ascii() {
            return Err(ConfigError::InvalidOption {
                option: "layout.delimiter",
                reason: format!("'{}' is not an ASCII character", self.layout.delimiter),
            });
        }

        if self.layout.id_column.trim().is_empty() {
            return Err(ConfigError::InvalidOption {
                option: "layout.id_column",
                reason: "identifier column name is empty".to_string(),
            });
        }

        Ok(())
    }

    /// Resolve a field-table file name against the input directory
    pub fn input_path(&self, file: &str) -> PathBuf {
        self.input_dir.join(file)
    }

    /// Date stamp used in output file names (YYYY-MM-DD)
    pub fn date_stamp(&self) -> String {
        self.run_date.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_layout() {
        let layout = TableLayout::default();
        assert_eq!(layout.id_column, "eid");
        assert_eq!(layout.roster, "fid31.csv");
        assert_eq!(layout.genetic_ancestry.column, "22006-0.0");
        assert_eq!(layout.read_options().delimiter, b',');
    }

    #[test]
    fn test_date_stamp() {
        let config = StudyConfig {
            run_date: NaiveDate::from_ymd_opt(2024, 9, 25).unwrap(),
            ..StudyConfig::default()
        };
        assert_eq!(config.date_stamp(), "2024-09-25");
    }

    #[test]
    fn test_from_json_partial() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"input_dir": "/data/pheno", "run_date": "2024-01-19", "layout": {{"delimiter": "\t"}}}}"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = StudyConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.input_dir, PathBuf::from("/data/pheno"));
        assert_eq!(config.layout.delimiter, '\t');
        // Unspecified keys fall back to defaults
        assert_eq!(config.layout.age.file, "fid21003.csv");
        assert_eq!(config.input_path("fid31.csv"), PathBuf::from("/data/pheno/fid31.csv"));
    }

    #[test]
    fn test_rejects_non_ascii_delimiter() {
        let mut config = StudyConfig::default();
        config.layout.delimiter = '§';
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOption { option: "layout.delimiter", .. })
        ));
    }

    #[test]
    fn test_missing_config_file() {
        assert!(matches!(
            StudyConfig::from_json_file("/nonexistent/study.json"),
            Err(ConfigError::Read { .. })
        ));
    }
}
