//! Embedded SQLite storage for the flat table.
//!
//! All rows go in with one prepared statement inside a single transaction.
//! Batch reads bind both membership lists as statement parameters; filter
//! values are never interpolated into query text.

use crate::storage::{write_file_atomic, BatchFilter, MatchResult, StorageBackend};
use crate::table::flatten::{flatten, FlatTable};
use crate::table::values::slot_to_nullable;
use crate::trace::loader::load_trace;
use crate::utils::error::{QueryError, StorageError};
use log::{debug, info};
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;

/// Flat table stored in an embedded relational database
pub struct EmbeddedDbTable;

const CREATE_TABLE_SQL: &str = "
    CREATE TABLE data (
        id INTEGER PRIMARY KEY,
        step_name TEXT NOT NULL,
        frame_key TEXT NOT NULL,
        value_type TEXT NOT NULL,
        v1 REAL, v2 REAL, v3 REAL, v4 REAL, v5 REAL, v6 REAL
    )";

const INSERT_ROW_SQL: &str = "
    INSERT INTO data (step_name, frame_key, value_type, v1, v2, v3, v4, v5, v6)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

impl EmbeddedDbTable {
    /// Create the schema and insert every row in one transaction
    ///
    /// **Private** - internal write logic, runs against the staged path
    fn write_table(table: &FlatTable, path: &Path) -> Result<(), StorageError> {
        let mut conn = Connection::open(path)?;
        conn.execute(CREATE_TABLE_SQL, [])?;

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(INSERT_ROW_SQL)?;
            for row in &table.rows {
                stmt.execute(params![
                    row.step_name,
                    row.frame_key,
                    row.value_type,
                    slot_to_nullable(row.values[0]),
                    slot_to_nullable(row.values[1]),
                    slot_to_nullable(row.values[2]),
                    slot_to_nullable(row.values[3]),
                    slot_to_nullable(row.values[4]),
                    slot_to_nullable(row.values[5]),
                ])?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    /// Build an `IN (?,?,...)` placeholder list of the given arity
    ///
    /// **Private** - the filter values themselves are bound, not spliced
    fn placeholders(count: usize) -> String {
        vec!["?"; count].join(",")
    }
}

impl StorageBackend for EmbeddedDbTable {
    fn convert(&self, input: &Path, destination: &Path) -> Result<(), StorageError> {
        let trace = load_trace(input)?;
        let table = flatten(&trace)?;

        info!(
            "Writing {} flat rows into database {}",
            table.len(),
            destination.display()
        );

        write_file_atomic(destination, |staged| Self::write_table(&table, staged))
    }

    fn read_batch(
        &self,
        destination: &Path,
        filter: &BatchFilter,
    ) -> Result<MatchResult, QueryError> {
        let steps: Vec<&str> = filter.steps().iter().map(|s| s.step_name.as_str()).collect();
        let types: Vec<&str> = filter.types().iter().map(|t| t.type_name.as_str()).collect();

        let sql = format!(
            "SELECT COUNT(*) FROM data WHERE step_name IN ({}) AND value_type IN ({})",
            Self::placeholders(steps.len()),
            Self::placeholders(types.len()),
        );

        let conn = Connection::open_with_flags(destination, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(StorageError::from)?;
        let mut stmt = conn.prepare(&sql).map_err(StorageError::from)?;

        let bound = steps.iter().chain(types.iter());
        let row_count: i64 = stmt
            .query_row(rusqlite::params_from_iter(bound), |row| row.get(0))
            .map_err(StorageError::from)?;

        debug!("Database read matched {} rows", row_count);

        Ok(MatchResult {
            row_count: row_count as usize,
            column_count: FlatTable::column_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::schema::RawTrace;

    #[test]
    fn test_write_stores_nulls_for_unused_slots() {
        let trace: RawTrace =
            serde_json::from_str(r#"{"Step-1": {"0.0": {"U": [[1, 2, 3]]}}}"#).unwrap();
        let table = flatten(&trace).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.sqlite");
        EmbeddedDbTable::write_table(&table, &path).unwrap();

        let conn = Connection::open(&path).unwrap();
        let (v3, v4): (Option<f64>, Option<f64>) = conn
            .query_row("SELECT v3, v4 FROM data", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(v3, Some(3.0));
        assert_eq!(v4, None);
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(EmbeddedDbTable::placeholders(1), "?");
        assert_eq!(EmbeddedDbTable::placeholders(3), "?,?,?");
    }
}
