// String-typed tables. Every cell is a String; missing cells are "".

use std::io::Read;
use std::path::Path;

use crate::error::LinkError;

/// An ordered set of named columns over fully materialized rows.
///
/// Rows always have exactly `headers.len()` cells: short CSV records are padded
/// with empty strings, long ones are truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    /// Build a table from literal headers and rows (tests, fixtures).
    pub fn from_rows(name: impl Into<String>, headers: &[&str], rows: &[&[&str]]) -> Self {
        let mut table = Self::new(name, headers.iter().map(|h| h.to_string()).collect());
        for row in rows {
            table.push_row(row.iter().map(|c| c.to_string()).collect());
        }
        table
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    /// Exact (case-sensitive) header lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn set_cell(&mut self, row: usize, col: usize, value: impl Into<String>) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value.into();
        }
    }

    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(move |r| r.get(col).map(String::as_str).unwrap_or(""))
    }

    /// Number of non-blank cells in a column.
    pub fn filled_count(&self, col: usize) -> usize {
        self.column_values(col).filter(|v| !is_blank(v)).count()
    }

    /// True when every cell of the column is blank (also true for zero rows).
    pub fn column_is_blank(&self, col: usize) -> bool {
        self.filled_count(col) == 0
    }

    /// Returns a new table with `name` appended as the last column.
    pub fn with_column(&self, name: impl Into<String>, values: Vec<String>) -> Table {
        let mut out = Table::new(self.name.clone(), self.headers.clone());
        out.headers.push(name.into());
        let mut values = values.into_iter();
        for row in &self.rows {
            let mut row = row.clone();
            row.push(values.next().unwrap_or_default());
            out.rows.push(row);
        }
        out
    }

    /// Returns a new table with the values of `col` mapped through `f`.
    pub fn map_column(&self, col: usize, f: impl Fn(&str) -> String) -> Table {
        let mut out = self.clone();
        for row in &mut out.rows {
            if let Some(cell) = row.get_mut(col) {
                *cell = f(cell);
            }
        }
        out
    }

    // -----------------------------------------------------------------------
    // CSV
    // -----------------------------------------------------------------------

    pub fn from_csv_str(name: &str, data: &str) -> Result<Table, LinkError> {
        let csv_err = |e: csv::Error| LinkError::Csv {
            table: name.into(),
            message: e.to_string(),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(data.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut table = Table::new(name, headers);
        for record in reader.records() {
            let record = record.map_err(csv_err)?;
            table.push_row(record.iter().map(|v| v.to_string()).collect());
        }
        Ok(table)
    }

    pub fn to_csv_string(&self) -> Result<String, LinkError> {
        let csv_err = |e: csv::Error| LinkError::Csv {
            table: self.name.clone(),
            message: e.to_string(),
        };

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers).map_err(csv_err)?;
        for row in &self.rows {
            writer.write_record(row).map_err(csv_err)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| LinkError::Io(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| LinkError::Io(e.to_string()))
    }

    pub fn write_csv_file(&self, path: &Path) -> Result<(), LinkError> {
        let data = self.to_csv_string()?;
        std::fs::write(path, data)
            .map_err(|e| LinkError::Io(format!("cannot write {}: {e}", path.display())))
    }
}

/// Read a CSV file into a table, decoding Windows-1252 when the bytes are not UTF-8.
pub fn read_csv_file(name: &str, path: &Path) -> Result<Table, LinkError> {
    let content = read_file_as_utf8(path)?;
    Table::from_csv_str(name, &content)
}

fn read_file_as_utf8(path: &Path) -> Result<String, LinkError> {
    let io_err = |e: std::io::Error| LinkError::Io(format!("cannot read {}: {e}", path.display()));
    let mut file = std::fs::File::open(path).map_err(io_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(io_err)?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Empty or whitespace-only.
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
