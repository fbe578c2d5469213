// ==============================================================================
// covariates.rs - Covariate File Assembly
// ==============================================================================
// Description: Joins cohort IDs with PCs, age and sex; derives age/sex terms
// Author: Matt Barham
// Created: 2026-10-14
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Output header:
//   FID IID PC1 .. PC40 AGE SEX AGE2 SEXAGE SEXAGE2
// ==============================================================================

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::StudyConfig;
use crate::models::SubjectId;
use crate::output;
use crate::parsers::{id_list, parse_number, FieldRow, FieldTable, TableError};
use crate::validator::InputValidator;

/// Number of genetic principal components carried as covariates
pub const PC_COUNT: usize = 40;

/// One complete covariate row. Source columns keep their text as read;
/// derived terms are computed from the parsed values.
#[derive(Debug, Clone, PartialEq)]
pub struct CovariateRow {
    pub fid: SubjectId,
    pub iid: String,
    pub pcs: Vec<String>,
    pub age_text: String,
    pub sex_text: String,
    pub age: f64,
    pub sex: f64,
}

impl CovariateRow {
    pub fn age2(&self) -> f64 {
        self.age * self.age
    }

    pub fn sexage(&self) -> f64 {
        self.sex * self.age
    }

    pub fn sexage2(&self) -> f64 {
        self.sex * self.age * self.age
    }

    fn to_record(&self) -> Vec<String> {
        let mut record = Vec::with_capacity(PC_COUNT + 7);
        record.push(self.fid.to_string());
        record.push(self.iid.clone());
        record.extend(self.pcs.iter().cloned());
        record.push(self.age_text.clone());
        record.push(self.sex_text.clone());
        record.push(self.age2().to_string());
        record.push(self.sexage().to_string());
        record.push(self.sexage2().to_string());
        record
    }
}

/// Covariate file header
pub fn header() -> Vec<String> {
    let mut header = vec!["FID".to_string(), "IID".to_string()];
    header.extend(pc_columns());
    header.extend(
        ["AGE", "SEX", "AGE2", "SEXAGE", "SEXAGE2"]
            .iter()
            .map(|c| c.to_string()),
    );
    header
}

fn pc_columns() -> Vec<String> {
    (1..=PC_COUNT).map(|i| format!("PC{}", i)).collect()
}

/// Inner-join cohort → PCs → AGE → SEX, drop incomplete rows, derive terms.
///
/// `pcs` must already be renamed `PC1..PC40`, `age` reduced to `AGE` and
/// `sex` to `SEX`. Subjects absent from any table, or with a missing value
/// anywhere in the joined row, are left out without error.
pub fn join_covariates(
    cohort: &FieldTable,
    pcs: &FieldTable,
    age: &FieldTable,
    sex: &FieldTable,
) -> Result<Vec<CovariateRow>, TableError> {
    let joined = cohort
        .inner_join(pcs)
        .inner_join(age)
        .inner_join(sex)
        .drop_incomplete();

    let iid_idx = joined.column_index(id_list::IID_COLUMN)?;
    let pc_idx = joined.column_index("PC1")?;
    let age_idx = joined.column_index("AGE")?;
    let sex_idx = joined.column_index("SEX")?;

    joined
        .rows()
        .iter()
        .map(|row| -> Result<CovariateRow, TableError> {
            let text = |idx: usize| row.values[idx].clone().unwrap_or_default();

            let pcs: Vec<String> = (pc_idx..pc_idx + PC_COUNT).map(&text).collect();
            for (i, pc) in pcs.iter().enumerate() {
                numeric(row, &format!("PC{}", i + 1), pc)?;
            }

            let age_text = text(age_idx);
            let sex_text = text(sex_idx);

            Ok(CovariateRow {
                fid: row.id.clone(),
                iid: text(iid_idx),
                age: numeric(row, "AGE", &age_text)?,
                sex: numeric(row, "SEX", &sex_text)?,
                pcs,
                age_text,
                sex_text,
            })
        })
        .collect()
}

fn numeric(row: &FieldRow, column: &str, value: &str) -> Result<f64, TableError> {
    parse_number(value).ok_or_else(|| TableError::InvalidValue {
        column: column.to_string(),
        id: row.id.to_string(),
        value: value.to_string(),
    })
}

pub struct CovariateAssembler<'a> {
    config: &'a StudyConfig,
    cohort_file: PathBuf,
}

impl<'a> CovariateAssembler<'a> {
    pub fn new(config: &'a StudyConfig, cohort_file: impl Into<PathBuf>) -> Self {
        Self {
            config,
            cohort_file: cohort_file.into(),
        }
    }

    /// `covar_all_<date>.txt` in the output directory
    pub fn output_path(&self) -> PathBuf {
        self.config
            .output_dir
            .join(output::dated_filename("covar_all", &self.config.date_stamp()))
    }

    pub fn run(&self) -> Result<PathBuf> {
        info!("Assembling covariates for cohort {:?}", self.cohort_file);

        let rows = self.assemble()?;

        let output_path = output::write_delimited(
            self.output_path(),
            Some(&header()),
            rows.iter().map(CovariateRow::to_record),
        )
        .context("Failed to write covariate file")?;

        info!("Covariates file saved to {:?} ({} subjects)", output_path, rows.len());
        Ok(output_path)
    }

    /// Load the cohort and covariate tables and build complete rows
    pub fn assemble(&self) -> Result<Vec<CovariateRow>> {
        let layout = &self.config.layout;
        let options = layout.read_options();

        let pcs_path = self.config.input_path(&layout.principal_components);
        let age_path = self.config.input_path(&layout.age.file);
        let sex_path = self.config.input_path(&layout.covariate_sex.file);

        InputValidator::new()
            .validate_all([
                self.cohort_file.as_path(),
                pcs_path.as_path(),
                age_path.as_path(),
                sex_path.as_path(),
            ])
            .context("Covariate input validation failed")?;

        let cohort = id_list::read_cohort(&self.cohort_file)
            .with_context(|| format!("Failed to read cohort file {:?}", self.cohort_file))?;
        info!("Loaded cohort: {} subjects", cohort.len());

        let pcs = FieldTable::read(&pcs_path, &layout.id_column, &options)
            .with_context(|| format!("Failed to load {:?}", pcs_path))?
            .rename_all(pc_columns())
            .context("Principal component table must hold exactly 40 components")?;
        debug!("Loaded principal components: {} rows", pcs.len());

        let age = FieldTable::read(&age_path, &layout.id_column, &options)
            .with_context(|| format!("Failed to load {:?}", age_path))?
            .select(&[(layout.age.column.as_str(), "AGE")])?;
        debug!("Loaded age: {} rows", age.len());

        let sex = FieldTable::read(&sex_path, &layout.id_column, &options)
            .with_context(|| format!("Failed to load {:?}", sex_path))?
            .select(&[(layout.covariate_sex.column.as_str(), "SEX")])?;
        debug!("Loaded sex: {} rows", sex.len());

        let rows = join_covariates(&cohort, &pcs, &age, &sex)
            .context("Failed to join covariate tables")?;

        info!(
            "Complete covariates for {} of {} cohort subjects",
            rows.len(),
            cohort.len()
        );
        Ok(rows)
    }
}
