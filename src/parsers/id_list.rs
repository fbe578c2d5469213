// ==============================================================================
// id_list.rs - Subject Identifier Lists
// ==============================================================================
// Description: Readers for withdrawal lists and QC'd cohort identifier files
// Author: Matt Barham
// Created: 2026-10-13
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Formats (no header):
//   withdrawal list    one identifier per line
//   QC'd cohort file   "<eid> <eid>" (FID/IID), space-delimited
// ==============================================================================

use std::collections::HashSet;
use std::path::Path;

use super::{csv_reader, FieldTable, ReadOptions, TableError};
use crate::models::SubjectId;

/// Name given to the second (IID) column of a cohort file
pub const IID_COLUMN: &str = "eid_copy";

/// Read a withdrawal/exclusion list. Repeated identifiers are tolerated and
/// blank lines are skipped; only the first column is used.
pub fn read_exclusions(path: impl AsRef<Path>) -> Result<HashSet<SubjectId>, TableError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(TableError::NotFound(path.to_path_buf()));
    }

    let options = ReadOptions::default().headerless();
    let reader = super::open_table(path).map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut csv = csv_reader(reader, &options);
    let mut excluded = HashSet::new();

    for result in csv.records() {
        let record = result.map_err(|source| TableError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(id) = record.get(0).and_then(|raw| options.value(raw)) {
            excluded.insert(SubjectId::new(id));
        }
    }

    Ok(excluded)
}

/// Read a QC'd cohort file produced by the cohort pipeline
pub fn read_cohort(path: impl AsRef<Path>) -> Result<FieldTable, TableError> {
    let options = ReadOptions::default().with_delimiter(b' ').headerless();
    FieldTable::read_headerless(path, &[IID_COLUMN], &options)
}

/// Rows of a cohort file: the identifier twice (FID, IID)
pub fn cohort_rows<'a>(
    ids: impl IntoIterator<Item = &'a SubjectId> + 'a,
) -> impl Iterator<Item = Vec<String>> + 'a {
    ids.into_iter()
        .map(|id| vec![id.to_string(), id.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_exclusions() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1000004").unwrap();
        writeln!(file, "1000009").unwrap();
        writeln!(file, "1000004").unwrap();
        file.flush().unwrap();

        let excluded = read_exclusions(file.path()).unwrap();
        assert_eq!(excluded.len(), 2);
        assert!(excluded.contains(&SubjectId::from("1000004")));
        assert!(excluded.contains(&SubjectId::from("1000009")));
    }

    #[test]
    fn test_read_exclusions_missing_file() {
        assert!(matches!(
            read_exclusions("/nonexistent/withdraw.csv"),
            Err(TableError::NotFound(_))
        ));
    }

    #[test]
    fn test_read_cohort() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1 1").unwrap();
        writeln!(file, "3 3").unwrap();
        file.flush().unwrap();

        let cohort = read_cohort(file.path()).unwrap();
        assert_eq!(cohort.len(), 2);
        assert_eq!(cohort.columns(), &[IID_COLUMN.to_string()]);
        assert_eq!(
            cohort.get(&SubjectId::from("3")).unwrap().values,
            vec![Some("3".to_string())]
        );
    }

    #[test]
    fn test_cohort_rows() {
        let ids = vec![SubjectId::from("1"), SubjectId::from("3")];
        let rows: Vec<Vec<String>> = cohort_rows(&ids).collect();
        assert_eq!(rows, vec![vec!["1", "1"], vec!["3", "3"]]);
    }
}
