// ==============================================================================
// field_table.rs - Subject-Keyed Field Tables
// ==============================================================================
// Description: In-memory subject tables with inner-join and completeness filters
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Format: delimited text, one row per subject, identifier column plus values
// Example:
//   eid,22006-0.0
//   1000011,1
//   1000023,
// ==============================================================================

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::{csv_reader, open_table, ReadOptions};
use crate::models::SubjectId;

/// Errors raised while loading or reshaping a field table
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Input file not found: {0:?}")]
    NotFound(PathBuf),

    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parsing error in {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Column '{column}' not found in {table}")]
    MissingColumn { table: String, column: String },

    #[error("Duplicate identifier '{id}' in {table}")]
    DuplicateIdentifier { table: String, id: String },

    #[error("Missing identifier at record {record} of {table}")]
    MissingIdentifier { table: String, record: usize },

    #[error("{table}: expected {expected} value columns, found {found}")]
    ColumnCount {
        table: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid value '{value}' in column '{column}' for subject {id}")]
    InvalidValue {
        column: String,
        id: String,
        value: String,
    },
}

/// One subject row: identifier plus nullable values, aligned with the
/// table's column list
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRow {
    pub id: SubjectId,
    pub values: Vec<Option<String>>,
}

impl FieldRow {
    pub fn is_complete(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }
}

/// Subject-keyed table with unique identifiers, rows kept in source order
#[derive(Debug, Clone)]
pub struct FieldTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<FieldRow>,
    index: HashMap<SubjectId, usize>,
}

impl FieldTable {
    /// Create an empty table with the given value columns
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Append a row. Identifiers must be unique within a table.
    pub fn push(&mut self, row: FieldRow) -> Result<(), TableError> {
        debug_assert_eq!(row.values.len(), self.columns.len());

        if self.index.contains_key(&row.id) {
            return Err(TableError::DuplicateIdentifier {
                table: self.name.clone(),
                id: row.id.to_string(),
            });
        }

        self.index.insert(row.id.clone(), self.rows.len());
        self.rows.push(row);
        Ok(())
    }

    /// Read a table whose header names an identifier column; every other
    /// column becomes a value column.
    pub fn read(
        path: impl AsRef<Path>,
        id_column: &str,
        options: &ReadOptions,
    ) -> Result<Self, TableError> {
        let path = path.as_ref();
        let reader = open_checked(path)?;
        let mut csv = csv_reader(reader, &ReadOptions { has_headers: true, ..options.clone() });

        let headers = csv
            .headers()
            .map_err(|source| TableError::Csv {
                path: path.to_path_buf(),
                source,
            })?
            .clone();

        let name = path.display().to_string();
        let id_index = headers
            .iter()
            .position(|h| h == id_column)
            .ok_or_else(|| TableError::MissingColumn {
                table: name.clone(),
                column: id_column.to_string(),
            })?;

        let columns: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != id_index)
            .map(|(_, h)| h.to_string())
            .collect();

        let mut table = FieldTable::new(name, columns);
        table.load_records(&mut csv, path, id_index, options)?;
        Ok(table)
    }

    /// Read a headerless table. The first column is the identifier, the
    /// remaining columns take `value_columns` as their names.
    pub fn read_headerless(
        path: impl AsRef<Path>,
        value_columns: &[&str],
        options: &ReadOptions,
    ) -> Result<Self, TableError> {
        let path = path.as_ref();
        let reader = open_checked(path)?;
        let mut csv = csv_reader(reader, &ReadOptions { has_headers: false, ..options.clone() });

        let columns = value_columns.iter().map(|c| c.to_string()).collect();
        let mut table = FieldTable::new(path.display().to_string(), columns);
        table.load_records(&mut csv, path, 0, options)?;
        Ok(table)
    }

    fn load_records<R: Read>(
        &mut self,
        csv: &mut csv::Reader<R>,
        path: &Path,
        id_index: usize,
        options: &ReadOptions,
    ) -> Result<(), TableError> {
        let expected = self.columns.len() + 1;

        for (idx, result) in csv.records().enumerate() {
            let record = result.map_err(|source| TableError::Csv {
                path: path.to_path_buf(),
                source,
            })?;

            if record.len() != expected {
                return Err(TableError::ColumnCount {
                    table: self.name.clone(),
                    expected: self.columns.len(),
                    found: record.len().saturating_sub(1),
                });
            }

            let id = record
                .get(id_index)
                .and_then(|raw| options.value(raw))
                .ok_or_else(|| TableError::MissingIdentifier {
                    table: self.name.clone(),
                    record: idx + 1,
                })?;

            let values = record
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != id_index)
                .map(|(_, raw)| options.value(raw))
                .collect();

            self.push(FieldRow {
                id: SubjectId::new(id),
                values,
            })?;
        }

        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[FieldRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, id: &SubjectId) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &SubjectId) -> Option<&FieldRow> {
        self.index.get(id).map(|&i| &self.rows[i])
    }

    /// Identifiers in row order
    pub fn ids(&self) -> impl Iterator<Item = &SubjectId> {
        self.rows.iter().map(|r| &r.id)
    }

    pub fn column_index(&self, column: &str) -> Result<usize, TableError> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| TableError::MissingColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// Keep only the listed value columns, renamed: `(source, new_name)`
    pub fn select(&self, columns: &[(&str, &str)]) -> Result<FieldTable, TableError> {
        let indices = columns
            .iter()
            .map(|(source, _)| self.column_index(source))
            .collect::<Result<Vec<_>, _>>()?;

        let mut selected = FieldTable::new(
            self.name.clone(),
            columns.iter().map(|(_, name)| name.to_string()).collect(),
        );

        for row in &self.rows {
            let values = indices.iter().map(|&i| row.values[i].clone()).collect();
            selected.push(FieldRow {
                id: row.id.clone(),
                values,
            })?;
        }

        Ok(selected)
    }

    /// Replace every value column name; the count must match exactly
    pub fn rename_all(mut self, names: Vec<String>) -> Result<FieldTable, TableError> {
        if names.len() != self.columns.len() {
            return Err(TableError::ColumnCount {
                table: self.name,
                expected: names.len(),
                found: self.columns.len(),
            });
        }

        self.columns = names;
        Ok(self)
    }

    /// Keep rows matching the predicate
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&FieldRow) -> bool,
    {
        self.rows.retain(|row| keep(row));
        self.reindex();
    }

    /// Drop rows whose value in `column` is missing
    pub fn drop_missing_in(mut self, column: &str) -> Result<FieldTable, TableError> {
        let idx = self.column_index(column)?;
        self.retain(|row| row.values[idx].is_some());
        Ok(self)
    }

    /// Drop rows with a missing value in any column
    pub fn drop_incomplete(mut self) -> FieldTable {
        self.retain(FieldRow::is_complete);
        self
    }

    /// Anti-join: rows whose identifier is not in `excluded`
    pub fn without(&self, excluded: &HashSet<SubjectId>) -> FieldTable {
        let mut kept = self.clone();
        kept.retain(|row| !excluded.contains(&row.id));
        kept
    }

    /// Inner join on identifier. Rows keep this table's order, values are
    /// this table's columns followed by `other`'s. A right-hand column whose
    /// name collides with an existing one gets a `_y` suffix.
    pub fn inner_join(&self, other: &FieldTable) -> FieldTable {
        let mut columns = self.columns.clone();
        for column in &other.columns {
            let mut name = column.clone();
            while columns.contains(&name) {
                name.push_str("_y");
            }
            columns.push(name);
        }

        let mut joined = FieldTable::new(format!("{} + {}", self.name, other.name), columns);

        for row in &self.rows {
            if let Some(right) = other.get(&row.id) {
                let mut values = row.values.clone();
                values.extend(right.values.iter().cloned());

                joined.index.insert(row.id.clone(), joined.rows.len());
                joined.rows.push(FieldRow {
                    id: row.id.clone(),
                    values,
                });
            }
        }

        joined
    }

    fn reindex(&mut self) {
        self.index = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.id.clone(), i))
            .collect();
    }
}

fn open_checked(path: &Path) -> Result<Box<dyn Read>, TableError> {
    if !path.is_file() {
        return Err(TableError::NotFound(path.to_path_buf()));
    }

    open_table(path).map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn table(name: &str, columns: &[&str], rows: &[(&str, &[Option<&str>])]) -> FieldTable {
        let mut t = FieldTable::new(name, columns.iter().map(|c| c.to_string()).collect());
        for (id, values) in rows {
            t.push(FieldRow {
                id: SubjectId::new(*id),
                values: values.iter().map(|v| v.map(str::to_string)).collect(),
            })
            .unwrap();
        }
        t
    }

    fn ids(t: &FieldTable) -> Vec<&str> {
        t.ids().map(SubjectId::as_str).collect()
    }

    #[test]
    fn test_read_with_header() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "eid,22006-0.0").unwrap();
        writeln!(file, "1,1").unwrap();
        writeln!(file, "2,").unwrap();
        writeln!(file, "3,NA").unwrap();
        file.flush().unwrap();

        let t = FieldTable::read(file.path(), "eid", &ReadOptions::default()).unwrap();
        assert_eq!(t.columns(), &["22006-0.0".to_string()]);
        assert_eq!(t.len(), 3);
        assert_eq!(t.get(&"1".into()).unwrap().values, vec![Some("1".to_string())]);
        assert_eq!(t.get(&"2".into()).unwrap().values, vec![None]);
        assert_eq!(t.get(&"3".into()).unwrap().values, vec![None]);
    }

    #[test]
    fn test_read_id_column_not_first() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "C50 \"Patient EID\"").unwrap();
        writeln!(file, "1 10").unwrap();
        file.flush().unwrap();

        let options = ReadOptions::default().with_delimiter(b' ');
        let t = FieldTable::read(file.path(), "Patient EID", &options).unwrap();
        assert_eq!(t.columns(), &["C50".to_string()]);
        assert_eq!(ids(&t), vec!["10"]);
    }

    #[test]
    fn test_read_headerless() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1 1").unwrap();
        writeln!(file, "3 3").unwrap();
        file.flush().unwrap();

        let options = ReadOptions::default().with_delimiter(b' ');
        let t = FieldTable::read_headerless(file.path(), &["eid_copy"], &options).unwrap();
        assert_eq!(ids(&t), vec!["1", "3"]);
        assert_eq!(t.columns(), &["eid_copy".to_string()]);
    }

    #[test]
    fn test_read_missing_file() {
        let err = FieldTable::read("/nonexistent/fid31.csv", "eid", &ReadOptions::default())
            .unwrap_err();
        assert!(matches!(err, TableError::NotFound(_)));
    }

    #[test]
    fn test_read_missing_id_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id,31-0.0").unwrap();
        writeln!(file, "1,0").unwrap();
        file.flush().unwrap();

        let err = FieldTable::read(file.path(), "eid", &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, TableError::MissingColumn { .. }));
    }

    #[test]
    fn test_duplicate_identifier_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "eid,31-0.0").unwrap();
        writeln!(file, "1,0").unwrap();
        writeln!(file, "1,1").unwrap();
        file.flush().unwrap();

        let err = FieldTable::read(file.path(), "eid", &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, TableError::DuplicateIdentifier { .. }));
    }

    #[test]
    fn test_read_gzip() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let file = tempfile::Builder::new().suffix(".csv.gz").tempfile().unwrap();
        {
            let mut encoder = GzEncoder::new(file.reopen().unwrap(), Compression::default());
            writeln!(encoder, "eid,21003-0.0").unwrap();
            writeln!(encoder, "7,52").unwrap();
            encoder.finish().unwrap();
        }

        let t = FieldTable::read(file.path(), "eid", &ReadOptions::default()).unwrap();
        assert_eq!(t.get(&"7".into()).unwrap().values, vec![Some("52".to_string())]);
    }

    #[test]
    fn test_inner_join_is_intersection_in_left_order() {
        let left = table("left", &["a"], &[("3", &[Some("x")]), ("1", &[Some("y")]), ("2", &[None])]);
        let right = table("right", &["b"], &[("2", &[Some("p")]), ("3", &[Some("q")]), ("9", &[Some("r")])]);

        let joined = left.inner_join(&right);
        assert_eq!(ids(&joined), vec!["3", "2"]);
        assert_eq!(joined.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(
            joined.get(&"3".into()).unwrap().values,
            vec![Some("x".to_string()), Some("q".to_string())]
        );

        // Missing values are carried, not dropped, by the join itself
        assert_eq!(joined.get(&"2".into()).unwrap().values[0], None);
    }

    #[test]
    fn test_inner_join_column_collision() {
        let left = table("left", &["v"], &[("1", &[Some("a")])]);
        let right = table("right", &["v"], &[("1", &[Some("b")])]);

        let joined = left.inner_join(&right);
        assert_eq!(joined.columns(), &["v".to_string(), "v_y".to_string()]);
    }

    #[test]
    fn test_drop_incomplete_and_missing_in() {
        let t = table(
            "t",
            &["a", "b"],
            &[
                ("1", &[Some("1"), Some("2")]),
                ("2", &[None, Some("2")]),
                ("3", &[Some("1"), None]),
            ],
        );

        assert_eq!(ids(&t.clone().drop_incomplete()), vec!["1"]);
        assert_eq!(ids(&t.clone().drop_missing_in("a").unwrap()), vec!["1", "3"]);
        assert!(t.drop_missing_in("c").is_err());
    }

    #[test]
    fn test_without_excluded() {
        let t = table("t", &[], &[("1", &[]), ("2", &[]), ("3", &[])]);
        let excluded: HashSet<SubjectId> = [SubjectId::from("2")].into_iter().collect();

        let kept = t.without(&excluded);
        assert_eq!(ids(&kept), vec!["1", "3"]);
        assert!(!kept.contains(&"2".into()));
    }

    #[test]
    fn test_select_and_rename() {
        let t = table("t", &["x", "21003-0.0"], &[("1", &[Some("a"), Some("52")])]);

        let age = t.select(&[("21003-0.0", "AGE")]).unwrap();
        assert_eq!(age.columns(), &["AGE".to_string()]);
        assert_eq!(age.get(&"1".into()).unwrap().values, vec![Some("52".to_string())]);

        let renamed = t.clone().rename_all(vec!["P".into(), "Q".into()]).unwrap();
        assert_eq!(renamed.columns(), &["P".to_string(), "Q".to_string()]);
        assert!(matches!(
            t.rename_all(vec!["P".into()]),
            Err(TableError::ColumnCount { expected: 1, found: 2, .. })
        ));
    }
}
