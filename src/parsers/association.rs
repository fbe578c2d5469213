// ==============================================================================
// association.rs - GWAS Summary Statistics Parser
// ==============================================================================
// Description: Reads per-variant association results for Manhattan plotting
// Author: Matt Barham
// Created: 2026-10-14
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Format: delimited text with header (REGENIE step 2 output by default)
// Example:
//   CHROM GENPOS ID ALLELE0 ALLELE1 A1FREQ N TEST BETA SE CHISQ LOG10P
//   1 55326 rs3107975 T C 0.0108 3000 ADD 0.104 0.199 0.273 0.2
//   X 2699555 rs311165 C T 0.4421 3000 ADD -0.01 0.027 0.141 0.15
// ==============================================================================

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use super::{csv_reader, open_table, ReadOptions};
use crate::models::{Chromosome, SignificanceColumn, VariantRecord};

/// Errors that can occur while reading association results
#[derive(Error, Debug)]
pub enum AssociationError {
    #[error("Input file not found: {0:?}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Column '{0}' not found in association results")]
    MissingColumn(String),

    #[error("Invalid chromosome '{value}' at line {line}")]
    InvalidChromosome { line: u64, value: String },

    #[error("Invalid position '{value}' at line {line}")]
    InvalidPosition { line: u64, value: String },

    #[error("Invalid significance value '{value}' in column '{column}' at line {line}: {reason}")]
    InvalidSignificance {
        line: u64,
        column: String,
        value: String,
        reason: &'static str,
    },

    #[error("Association results contain no plottable variants")]
    EmptyFile,
}

/// Reader for summary statistics with configurable column names
#[derive(Debug, Clone)]
pub struct AssociationReader {
    pub chromosome_column: String,
    pub position_column: String,
    pub significance: SignificanceColumn,
    pub options: ReadOptions,
}

impl AssociationReader {
    pub fn new(
        chromosome_column: impl Into<String>,
        position_column: impl Into<String>,
        significance: SignificanceColumn,
        delimiter: u8,
    ) -> Self {
        Self {
            chromosome_column: chromosome_column.into(),
            position_column: position_column.into(),
            significance,
            options: ReadOptions::default().with_delimiter(delimiter),
        }
    }

    /// Parse all variants. Rows with a missing significance value are kept
    /// with no value; a missing or malformed chromosome or position is an
    /// error.
    pub fn read(&self, path: impl AsRef<Path>) -> Result<Vec<VariantRecord>, AssociationError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AssociationError::NotFound(path.to_path_buf()));
        }

        let mut reader = csv_reader(open_table(path)?, &self.options);
        let headers = reader.headers()?.clone();

        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| AssociationError::MissingColumn(name.to_string()))
        };
        let chr_idx = find(&self.chromosome_column)?;
        let pos_idx = find(&self.position_column)?;
        let sig_idx = find(self.significance.column())?;

        let mut variants = Vec::new();
        let mut missing = 0usize;

        for result in reader.records() {
            let record = result?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let field = |idx: usize| record.get(idx).unwrap_or("");

            let chromosome = Chromosome::parse(field(chr_idx)).ok_or_else(|| {
                AssociationError::InvalidChromosome {
                    line,
                    value: field(chr_idx).to_string(),
                }
            })?;

            let position = parse_position(field(pos_idx)).ok_or_else(|| {
                AssociationError::InvalidPosition {
                    line,
                    value: field(pos_idx).to_string(),
                }
            })?;

            let neglog10_p = match self.options.value(field(sig_idx)) {
                Some(raw) => Some(self.neglog10(&raw).map_err(|reason| {
                    AssociationError::InvalidSignificance {
                        line,
                        column: self.significance.column().to_string(),
                        value: raw.clone(),
                        reason,
                    }
                })?),
                None => {
                    missing += 1;
                    None
                }
            };

            variants.push(VariantRecord {
                chromosome,
                position,
                neglog10_p,
            });
        }

        if missing > 0 {
            debug!("{} variants have no significance value and will not be drawn", missing);
        }

        if variants.iter().all(|v| v.neglog10_p.is_none()) {
            return Err(AssociationError::EmptyFile);
        }

        Ok(variants)
    }

    /// Convert a raw significance value to the -log10 scale
    fn neglog10(&self, raw: &str) -> Result<f64, &'static str> {
        let value: f64 = raw.parse().map_err(|_| "not a number")?;

        match self.significance {
            SignificanceColumn::PValue(_) => {
                if !(value > 0.0 && value <= 1.0) {
                    return Err("p-value must be in (0, 1]");
                }
                Ok(-value.log10())
            }
            SignificanceColumn::NegLog10P(_) => {
                if !value.is_finite() || value < 0.0 {
                    return Err("-log10(p) must be finite and non-negative");
                }
                Ok(value)
            }
        }
    }
}

/// Base-pair position: a non-negative integer, also accepted as "1234.0"
fn parse_position(value: &str) -> Option<u64> {
    let value = value.trim();
    if let Ok(pos) = value.parse::<u64>() {
        return Some(pos);
    }

    match value.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v >= 0.0 && v < u64::MAX as f64 => Some(v as u64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_results(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_read_p_values() {
        let file = write_results(&[
            "CHROM GENPOS P",
            "1 100 1e-9",
            "1 500 0.5",
            "X 50 1e-10",
        ]);

        let reader = AssociationReader::new(
            "CHROM",
            "GENPOS",
            SignificanceColumn::PValue("P".into()),
            b' ',
        );
        let variants = reader.read(file.path()).unwrap();

        assert_eq!(variants.len(), 3);
        assert_eq!(variants[2].chromosome, Chromosome::new(23));
        assert_eq!(variants[2].position, 50);
        assert!((variants[0].neglog10_p.unwrap() - 9.0).abs() < 1e-9);
        assert!((variants[2].neglog10_p.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_read_neglog10_with_custom_columns() {
        let file = write_results(&["chr\tbp\tLOG10P", "2\t10\t3.5", "2\t20\tNA"]);

        let reader = AssociationReader::new(
            "chr",
            "bp",
            SignificanceColumn::NegLog10P("LOG10P".into()),
            b'\t',
        );
        let variants = reader.read(file.path()).unwrap();

        // The NA row keeps its position but has no value
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].neglog10_p, Some(3.5));
        assert_eq!(variants[1].position, 20);
        assert_eq!(variants[1].neglog10_p, None);
    }

    #[test]
    fn test_invalid_chromosome_aborts() {
        let file = write_results(&["CHROM GENPOS P", "1 100 0.1", "chrY 5 0.2"]);
        let reader = AssociationReader::new(
            "CHROM",
            "GENPOS",
            SignificanceColumn::PValue("P".into()),
            b' ',
        );

        assert!(matches!(
            reader.read(file.path()),
            Err(AssociationError::InvalidChromosome { line: 3, .. })
        ));
    }

    #[test]
    fn test_out_of_range_p_value() {
        let file = write_results(&["CHROM GENPOS P", "1 100 0"]);
        let reader = AssociationReader::new(
            "CHROM",
            "GENPOS",
            SignificanceColumn::PValue("P".into()),
            b' ',
        );

        assert!(matches!(
            reader.read(file.path()),
            Err(AssociationError::InvalidSignificance { .. })
        ));
    }

    #[test]
    fn test_missing_significance_column() {
        let file = write_results(&["CHROM GENPOS P", "1 100 0.1"]);
        let reader = AssociationReader::new(
            "CHROM",
            "GENPOS",
            SignificanceColumn::NegLog10P("LOG10P".into()),
            b' ',
        );

        assert!(matches!(
            reader.read(file.path()),
            Err(AssociationError::MissingColumn(c)) if c == "LOG10P"
        ));
    }

    #[test]
    fn test_all_missing_significance_is_empty() {
        let file = write_results(&["CHROM GENPOS P", "1 100 NA", "2 5 NA"]);
        let reader = AssociationReader::new(
            "CHROM",
            "GENPOS",
            SignificanceColumn::PValue("P".into()),
            b' ',
        );

        assert!(matches!(reader.read(file.path()), Err(AssociationError::EmptyFile)));
    }

    #[test]
    fn test_parse_position() {
        assert_eq!(parse_position("12345"), Some(12345));
        assert_eq!(parse_position("12345.0"), Some(12345));
        assert_eq!(parse_position("-5"), None);
        assert_eq!(parse_position("12.5"), None);
    }
}
