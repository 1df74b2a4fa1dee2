//! CSV table backing the result sink and failure log.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::{ReviewError, Result};

/// A CSV file held in memory: one header row and string cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SinkTable {
    /// Column headers, in file order.
    pub headers: Vec<String>,
    /// Row data (row-major order). Rows may be shorter than the header.
    pub rows: Vec<Vec<String>>,
}

impl SinkTable {
    /// Create an empty table with the given columns.
    pub fn with_columns<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            headers: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Load a table from disk, `None` when the file does not exist.
    pub async fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        match tokio::fs::read(path).await {
            Ok(bytes) => Self::from_bytes(&bytes).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ReviewError::io(path, e)),
        }
    }

    /// Parse CSV bytes. An empty input gives a table with no columns.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(|s| s.to_string()).collect());
        }

        Ok(Self { headers, rows })
    }

    /// Whether the table has neither columns nor rows.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Index of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell value, empty when the row is short.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    /// Values of a named column, `None` if the column is missing.
    pub fn column_values(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.column_index(name)?;
        Some((0..self.rows.len()).map(|row| self.cell(row, index)).collect())
    }

    /// Record key of a row: `original_id` when non-empty, otherwise `id`.
    pub fn row_key(&self, row: usize) -> Option<&str> {
        let from = |name: &str| {
            self.column_index(name)
                .map(|col| self.cell(row, col).trim())
                .filter(|v| !v.is_empty())
        };
        from("original_id").or_else(|| from("id"))
    }

    /// Record keys of rows whose status is `success`.
    ///
    /// `None` when the table lacks an `id` or `status` column.
    pub fn success_keys(&self) -> Option<HashSet<String>> {
        self.column_index("id")?;
        let status = self.column_index("status")?;

        Some(
            (0..self.rows.len())
                .filter(|&row| self.cell(row, status).trim() == "success")
                .filter_map(|row| self.row_key(row).map(str::to_string))
                .collect(),
        )
    }

    /// Append any of `columns` missing from the header.
    ///
    /// Existing columns and their order are kept.
    pub fn ensure_columns<S: AsRef<str>>(&mut self, columns: &[S]) {
        for column in columns {
            let column = column.as_ref();
            if self.column_index(column).is_none() {
                self.headers.push(column.to_string());
            }
        }
    }

    /// Append a row given as column → value; columns not in the header are
    /// dropped, header columns without a value are left empty.
    pub fn push_row(&mut self, values: &IndexMap<String, String>) {
        let row = self
            .headers
            .iter()
            .map(|h| values.get(h).cloned().unwrap_or_default())
            .collect();
        self.rows.push(row);
    }

    /// Serialize to CSV bytes, padding short rows to the header width.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());

        writer.write_record(&self.headers)?;
        for row in &self.rows {
            let mut padded = row.clone();
            if padded.len() < self.headers.len() {
                padded.resize(self.headers.len(), String::new());
            }
            writer.write_record(&padded)?;
        }

        writer
            .into_inner()
            .map_err(|e| ReviewError::Sink(format!("Failed to flush CSV: {}", e)))
    }

    /// Write the whole table to `path`.
    ///
    /// The file is written next to its destination and renamed into place,
    /// so readers see either the old or the new table.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ReviewError::io(parent, e))?;
        }

        let bytes = self.to_bytes()?;
        let staging = staging_path(path);
        tokio::fs::write(&staging, bytes)
            .await
            .map_err(|e| ReviewError::io(&staging, e))?;
        tokio::fs::rename(&staging, path)
            .await
            .map_err(|e| ReviewError::io(path, e))?;

        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_and_lookup() {
        let table = SinkTable::from_bytes(b"id,status,original_id\n1,success,\n2,failed,\n99,success,3\n").unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_values("id").unwrap(), vec!["1", "2", "99"]);
        assert_eq!(table.row_key(2), Some("3"));

        let keys = table.success_keys().unwrap();
        assert_eq!(keys, HashSet::from(["1".to_string(), "3".to_string()]));
    }

    #[test]
    fn test_success_keys_need_id_and_status() {
        let table = SinkTable::from_bytes(b"exercise,result\n1,success\n").unwrap();
        assert!(table.success_keys().is_none());
    }

    #[test]
    fn test_empty_bytes() {
        let table = SinkTable::from_bytes(b"").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_push_row_projects_onto_header() {
        let mut table = SinkTable::with_columns(&["id", "status", "note"]);
        let mut values = IndexMap::new();
        values.insert("status".to_string(), "success".to_string());
        values.insert("id".to_string(), "5".to_string());
        values.insert("extra".to_string(), "dropped".to_string());
        table.push_row(&values);

        assert_eq!(table.rows[0], vec!["5", "success", ""]);
    }

    #[test]
    fn test_short_rows_are_padded_on_write() {
        let mut table = SinkTable::from_bytes(b"id,status\n1\n").unwrap();
        table.ensure_columns(&["id", "suggestion"]);
        assert_eq!(table.headers, vec!["id", "status", "suggestion"]);

        let text = String::from_utf8(table.to_bytes().unwrap()).unwrap();
        assert_eq!(text, "id,status,suggestion\n1,,\n");
    }

    #[tokio::test]
    async fn test_save_creates_parent_and_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/results.csv");

        let mut table = SinkTable::with_columns(&["id", "suggestion"]);
        let mut values = IndexMap::new();
        values.insert("id".to_string(), "1".to_string());
        values.insert("suggestion".to_string(), "Use \"quotes\", commas\nand newlines".to_string());
        table.push_row(&values);
        table.save(&path).await.unwrap();

        let loaded = SinkTable::load(&path).await.unwrap().unwrap();
        assert_eq!(loaded, table);
        assert!(!staging_path(&path).exists());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(SinkTable::load(dir.path().join("absent.csv")).await.unwrap().is_none());
    }
}
