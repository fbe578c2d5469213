// ==============================================================================
// phenotype.rs - Binary Phenotype Labels
// ==============================================================================
// Description: Maps a diagnosis code column to a case/control label file
// Author: Matt Barham
// Created: 2026-10-15
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Output (space-delimited, header):
//   FID IID Breast_cancer
//   1000001 1000001 0
//   1000002 1000002 1
// ==============================================================================

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::models::SubjectId;
use crate::output;
use crate::parsers::{parse_number, FieldTable, ReadOptions, TableError};
use crate::validator::InputValidator;

/// Which diagnosis column defines the phenotype and how cases are coded
#[derive(Debug, Clone, PartialEq)]
pub struct PhenotypeDefinition {
    pub diagnosis_file: PathBuf,
    pub id_column: String,
    pub diagnosis_column: String,
    pub case_code: String,
    pub label_name: String,
    pub output_name: String,
    pub delimiter: u8,
}

impl Default for PhenotypeDefinition {
    fn default() -> Self {
        Self {
            diagnosis_file: PathBuf::from("binary_ICD_011924.txt"),
            id_column: "Patient EID".to_string(),
            diagnosis_column: "C50".to_string(),
            case_code: "1".to_string(),
            label_name: "Breast_cancer".to_string(),
            output_name: "BC_pheno.txt".to_string(),
            delimiter: b' ',
        }
    }
}

/// `true` when the diagnosis value equals the case code. Numeric codes
/// compare by value so "1.0" matches "1".
pub fn is_case(value: &str, case_code: &str) -> bool {
    match (parse_number(value), parse_number(case_code)) {
        (Some(v), Some(code)) => v == code,
        _ => value.trim() == case_code.trim(),
    }
}

/// Label every subject with a non-missing diagnosis value: 1 for a case,
/// 0 otherwise
pub fn label_subjects(
    table: &FieldTable,
    diagnosis_column: &str,
    case_code: &str,
) -> Result<Vec<(SubjectId, u8)>, TableError> {
    let selected = table
        .select(&[(diagnosis_column, diagnosis_column)])?
        .drop_incomplete();

    let labels = selected
        .rows()
        .iter()
        .filter_map(|row| {
            let value = row.values[0].as_deref()?;
            Some((row.id.clone(), u8::from(is_case(value, case_code))))
        })
        .collect();

    Ok(labels)
}

pub struct PhenotypeLabeler {
    definition: PhenotypeDefinition,
}

impl PhenotypeLabeler {
    pub fn new(definition: PhenotypeDefinition) -> Self {
        Self { definition }
    }

    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(&self.definition.output_name)
    }

    pub fn run(&self, output_dir: &Path) -> Result<PathBuf> {
        let def = &self.definition;
        info!(
            "Labelling {} (case code {}) from {:?}",
            def.diagnosis_column, def.case_code, def.diagnosis_file
        );

        InputValidator::new()
            .validate(&def.diagnosis_file)
            .context("Diagnosis input validation failed")?;

        let options = ReadOptions::default().with_delimiter(def.delimiter);
        let table = FieldTable::read(&def.diagnosis_file, &def.id_column, &options)
            .with_context(|| format!("Failed to load {:?}", def.diagnosis_file))?;
        debug!("Loaded diagnosis table: {} rows", table.len());

        let labels = label_subjects(&table, &def.diagnosis_column, &def.case_code)?;
        let cases = labels.iter().filter(|(_, label)| *label == 1).count();

        let header = vec![
            "FID".to_string(),
            "IID".to_string(),
            def.label_name.clone(),
        ];
        let rows = labels
            .iter()
            .map(|(id, label)| vec![id.to_string(), id.to_string(), label.to_string()]);

        let path = output::write_delimited(self.output_path(output_dir), Some(&header), rows)
            .context("Failed to write phenotype file")?;

        info!(
            "Phenotype file created: {:?} ({} cases, {} controls)",
            path,
            cases,
            labels.len() - cases
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_is_case() {
        assert!(is_case("1", "1"));
        assert!(is_case("1.0", "1"));
        assert!(!is_case("0", "1"));
        assert!(!is_case("2", "1"));
        assert!(is_case("C50.9", "C50.9"));
        assert!(!is_case("C50", "C50.9"));
    }

    #[test]
    fn test_labels_are_indicators() {
        let mut table = FieldTable::new("dx", vec!["E11".to_string(), "C50".to_string()]);
        for (id, e11, c50) in [("1", "0", Some("1")), ("2", "1", Some("7")), ("3", "0", None), ("4", "1", Some("1.0"))] {
            table
                .push(crate::parsers::FieldRow {
                    id: SubjectId::new(id),
                    values: vec![Some(e11.to_string()), c50.map(str::to_string)],
                })
                .unwrap();
        }

        let labels = label_subjects(&table, "C50", "1").unwrap();
        let labels: Vec<(&str, u8)> = labels.iter().map(|(id, l)| (id.as_str(), *l)).collect();
        assert_eq!(labels, vec![("1", 1), ("2", 0), ("4", 1)]);
    }

    #[test]
    fn test_labeler_end_to_end() {
        let dir = TempDir::new().unwrap();
        let diagnosis = dir.path().join("binary_ICD_011924.txt");
        let mut file = std::fs::File::create(&diagnosis).unwrap();
        writeln!(file, "\"Patient EID\" E11 C50").unwrap();
        writeln!(file, "1 0 0").unwrap();
        writeln!(file, "2 1 1").unwrap();
        writeln!(file, "3 0 NA").unwrap();
        writeln!(file, "4 NA 2").unwrap();
        drop(file);

        let labeler = PhenotypeLabeler::new(PhenotypeDefinition {
            diagnosis_file: diagnosis,
            ..PhenotypeDefinition::default()
        });

        let out = dir.path().join("pheno");
        let path = labeler.run(&out).unwrap();
        assert_eq!(path, out.join("BC_pheno.txt"));

        // 3 has no C50 value; 4 is missing only an unselected column
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "FID IID Breast_cancer\n1 1 0\n2 2 1\n4 4 0\n"
        );
    }

    #[test]
    fn test_missing_diagnosis_column() {
        let dir = TempDir::new().unwrap();
        let diagnosis = dir.path().join("dx.txt");
        std::fs::write(&diagnosis, "\"Patient EID\" E11\n1 0\n").unwrap();

        let labeler = PhenotypeLabeler::new(PhenotypeDefinition {
            diagnosis_file: diagnosis,
            ..PhenotypeDefinition::default()
        });

        assert!(labeler.run(dir.path()).is_err());
        assert!(!dir.path().join("BC_pheno.txt").exists());
    }
}
