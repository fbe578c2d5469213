// ==============================================================================
// parsers/mod.rs - Table parser modules
// ==============================================================================
// Description: Parsers for study field tables, identifier lists and GWAS results
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

pub mod association;
pub mod field_table;
pub mod id_list;

pub use association::{AssociationError, AssociationReader};
pub use field_table::{FieldRow, FieldTable, TableError};

use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Options shared by every delimited-table reader
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOptions {
    pub delimiter: u8,
    pub has_headers: bool,
    /// Tokens (after trimming) treated as missing values
    pub missing_values: Vec<String>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_headers: true,
            missing_values: vec![
                String::new(),
                "NA".to_string(),
                "NaN".to_string(),
                "nan".to_string(),
            ],
        }
    }
}

impl ReadOptions {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn headerless(mut self) -> Self {
        self.has_headers = false;
        self
    }

    /// Trimmed value, or `None` when it is a missing-value token
    pub fn value(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if self.missing_values.iter().any(|m| m == trimmed) {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// Parse a numeric code the way the study tables store them ("1", "1.0")
pub fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Open a table for reading, transparently decompressing `.gz` files
pub(crate) fn open_table(path: &Path) -> std::io::Result<Box<dyn Read>> {
    let file = File::open(path)?;
    let is_gzip = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);

    if is_gzip {
        Ok(Box::new(MultiGzDecoder::new(BufReader::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Build a csv reader over an opened table
pub(crate) fn csv_reader<R: Read>(reader: R, options: &ReadOptions) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(options.has_headers)
        .trim(csv::Trim::All)
        .from_reader(reader)
}
