// ==============================================================================
// cohort.rs - Cohort Filter & Join Engine
// ==============================================================================
// Description: Builds the QC'd subject list (exclusions, ancestry QC, sex QC)
// Author: Matt Barham
// Created: 2026-10-13
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Cohort = (roster - excluded) ∩ ancestry-qualified ∩ sex-qualified
// ==============================================================================

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::{FieldSource, StudyConfig};
use crate::models::{Ancestry, SexFilter, SubjectId};
use crate::output;
use crate::parsers::{id_list, parse_number, FieldTable, TableError};
use crate::validator::InputValidator;

/// Per-run cohort parameters
#[derive(Debug, Clone)]
pub struct CohortParams {
    pub ancestry: Ancestry,
    pub sex: SexFilter,
    /// Withdrawal list, one identifier per line
    pub exclusion_file: PathBuf,
}

/// Ancestry QC: genetic ancestry rows with a code, inner-joined with the
/// self-reported survey and restricted to rows complete in both sources.
pub fn ancestry_qualified(
    genetic: &FieldTable,
    reported: &FieldTable,
    genetic_column: &str,
) -> Result<FieldTable, TableError> {
    let genetic = genetic.clone().drop_missing_in(genetic_column)?;
    Ok(genetic.inner_join(reported).drop_incomplete())
}

/// Sex QC: genetic sex inner-joined with reported sex, then restricted to
/// the filter's genetic sex code (no restriction for `All`).
pub fn sex_qualified(
    genetic_sex: &FieldTable,
    reported_sex: &FieldTable,
    genetic_column: &str,
    filter: SexFilter,
) -> Result<FieldTable, TableError> {
    let mut joined = genetic_sex.inner_join(reported_sex);

    if let Some(code) = filter.required_code() {
        let idx = joined.column_index(genetic_column)?;
        joined.retain(|row| {
            row.values[idx]
                .as_deref()
                .and_then(parse_number)
                .map_or(false, |v| v == code)
        });
    }

    Ok(joined)
}

/// Exclusions first, then sequential inner joins with the ancestry- and
/// sex-qualified tables. Rows keep roster order.
pub fn assemble(
    roster: &FieldTable,
    excluded: &HashSet<SubjectId>,
    ancestry: &FieldTable,
    sex: &FieldTable,
) -> Vec<SubjectId> {
    roster
        .without(excluded)
        .inner_join(ancestry)
        .inner_join(sex)
        .ids()
        .cloned()
        .collect()
}

pub struct CohortBuilder<'a> {
    config: &'a StudyConfig,
    params: CohortParams,
}

impl<'a> CohortBuilder<'a> {
    pub fn new(config: &'a StudyConfig, params: CohortParams) -> Self {
        Self { config, params }
    }

    /// `geno_qced_eids_<ancestry>_<sex>_<date>.txt` in the output directory
    pub fn output_path(&self) -> PathBuf {
        self.config.output_dir.join(format!(
            "geno_qced_eids_{}_{}_{}.txt",
            self.params.ancestry,
            self.params.sex,
            self.config.date_stamp()
        ))
    }

    /// Full pipeline: validate inputs, assemble, write the identifier file
    pub fn run(&self) -> Result<PathBuf> {
        info!(
            "Building cohort (ancestry: {}, sex: {})",
            self.params.ancestry, self.params.sex
        );

        let cohort = self.build()?;

        let output_path = output::write_delimited(
            self.output_path(),
            None,
            id_list::cohort_rows(&cohort),
        )
        .context("Failed to write QC'd identifier file")?;

        info!(
            "qced_eids file successfully created: {:?} ({} subjects)",
            output_path,
            cohort.len()
        );
        Ok(output_path)
    }

    /// Load every table and return the surviving identifiers in roster order
    pub fn build(&self) -> Result<Vec<SubjectId>> {
        let layout = &self.config.layout;
        self.validate_inputs()?;

        // 1. Universe
        let roster = self
            .load(&layout.roster)?
            .select(&[])
            .context("Failed to read roster")?;
        info!("Loaded roster: {} subjects", roster.len());

        // 2. Exclusions
        let excluded = id_list::read_exclusions(&self.params.exclusion_file)
            .context("Failed to read exclusion list")?;
        info!("Loaded exclusion list: {} identifiers", excluded.len());

        // 3. Ancestry QC
        let ancestry = match self.params.ancestry {
            Ancestry::WhiteBritish => {
                let genetic_ancestry = self.load_field(&layout.genetic_ancestry)?;
                let reported_ancestry = self.load_field(&layout.reported_ancestry)?;
                ancestry_qualified(
                    &genetic_ancestry,
                    &reported_ancestry,
                    &layout.genetic_ancestry.column,
                )
                .context("Ancestry QC failed")?
            }
        };
        info!("Ancestry QC ({}): {} subjects", self.params.ancestry, ancestry.len());

        // 4. Sex QC
        let genetic_sex = self.load_field(&layout.genetic_sex)?;
        let reported_sex = self.load_field(&layout.reported_sex)?;
        let sex = sex_qualified(
            &genetic_sex,
            &reported_sex,
            &layout.genetic_sex.column,
            self.params.sex,
        )
        .context("Sex QC failed")?;
        info!("Sex QC ({}): {} subjects", self.params.sex, sex.len());

        // 5. Intersection
        let cohort = assemble(&roster, &excluded, &ancestry, &sex);
        debug!(
            "{} of {} roster subjects excluded",
            roster.ids().filter(|id| excluded.contains(*id)).count(),
            roster.len()
        );
        info!("Final cohort: {} subjects", cohort.len());

        Ok(cohort)
    }

    fn validate_inputs(&self) -> Result<()> {
        let layout = &self.config.layout;
        let mut paths = vec![
            self.config.input_path(&layout.roster),
            self.config.input_path(&layout.genetic_ancestry.file),
            self.config.input_path(&layout.reported_ancestry.file),
            self.config.input_path(&layout.genetic_sex.file),
            self.config.input_path(&layout.reported_sex.file),
        ];
        paths.sort();
        paths.dedup();

        InputValidator::new()
            .validate_all(paths.iter().map(PathBuf::as_path))
            .context("Cohort input validation failed")?;

        // A study with no withdrawals ships an empty list
        InputValidator::new()
            .allow_empty()
            .validate(&self.params.exclusion_file)
            .context("Exclusion list validation failed")?;
        Ok(())
    }

    fn load(&self, file: &str) -> Result<FieldTable> {
        let path = self.config.input_path(file);
        let table = FieldTable::read(
            &path,
            &self.config.layout.id_column,
            &self.config.layout.read_options(),
        )
        .with_context(|| format!("Failed to load {:?}", path))?;

        debug!("Loaded {:?}: {} rows", path, table.len());
        Ok(table)
    }

    /// Load a whole field table, checking its configured value column exists.
    /// Every column takes part in the completeness checks.
    fn load_field(&self, source: &FieldSource) -> Result<FieldTable> {
        let table = self.load(&source.file)?;
        table.column_index(&source.column)?;
        Ok(table)
    }
}
