//! Column-oriented record table and its TOML loader.

use crate::error::{TableError, TableResult};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

/// Values held by one column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Nullable numbers. A present `NaN` is a value, `None` is a null.
    Numeric(Vec<Option<f64>>),
    /// Site identifiers associated with each row.
    Sites(Vec<Vec<String>>),
    /// Nullable free text.
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(vals) => vals.len(),
            ColumnData::Sites(vals) => vals.len(),
            ColumnData::Text(vals) => vals.len(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ColumnData::Numeric(_) => NUMERIC,
            ColumnData::Sites(_) => SITES,
            ColumnData::Text(_) => TEXT,
        }
    }
}

const NUMERIC: &str = "numeric";
const SITES: &str = "a site list";
const TEXT: &str = "text";

#[derive(Debug, Clone, PartialEq)]
struct Column {
    name: String,
    data: ColumnData,
}

/// Ordered collection of artifact records stored column by column.
///
/// Every column has the same number of rows and column names are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordTable {
    n_rows: usize,
    columns: Vec<Column>,
}

impl RecordTable {
    /// Create a table without columns or rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new column, failing if the name is taken.
    pub fn add_column(&mut self, name: &str, data: ColumnData) -> TableResult<()> {
        if self.columns.iter().any(|col| col.name == name) {
            return Err(TableError::DuplicateColumn { name: name.into() });
        }
        self.check_len(name, &data)?;
        if self.columns.is_empty() {
            self.n_rows = data.len();
        }
        self.columns.push(Column {
            name: name.into(),
            data,
        });
        Ok(())
    }

    /// Replace a column in place, or append it if the name is new.
    pub fn set_column(&mut self, name: &str, data: ColumnData) -> TableResult<()> {
        match self.columns.iter().position(|col| col.name == name) {
            Some(idx) => {
                self.check_len(name, &data)?;
                self.columns[idx].data = data;
                Ok(())
            }
            None => self.add_column(name, data),
        }
    }

    /// Builder-style [`RecordTable::add_column`].
    pub fn with_column(mut self, name: &str, data: ColumnData) -> TableResult<Self> {
        self.add_column(name, data)?;
        Ok(self)
    }

    fn check_len(&self, name: &str, data: &ColumnData) -> TableResult<()> {
        if !self.columns.is_empty() && data.len() != self.n_rows {
            return Err(TableError::LengthMismatch {
                name: name.into(),
                expected: self.n_rows,
                found: data.len(),
            });
        }
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|col| col.name.as_str())
    }

    pub fn column(&self, name: &str) -> TableResult<&ColumnData> {
        self.columns
            .iter()
            .find(|col| col.name == name)
            .map(|col| &col.data)
            .ok_or_else(|| TableError::MissingColumn { name: name.into() })
    }

    pub fn numeric(&self, name: &str) -> TableResult<&[Option<f64>]> {
        match self.column(name)? {
            ColumnData::Numeric(vals) => Ok(vals),
            other => Err(type_error(name, NUMERIC, other.kind())),
        }
    }

    pub fn sites(&self, name: &str) -> TableResult<&[Vec<String>]> {
        match self.column(name)? {
            ColumnData::Sites(vals) => Ok(vals),
            other => Err(type_error(name, SITES, other.kind())),
        }
    }

    pub fn text(&self, name: &str) -> TableResult<&[Option<String>]> {
        match self.column(name)? {
            ColumnData::Text(vals) => Ok(vals),
            other => Err(type_error(name, TEXT, other.kind())),
        }
    }

    /// Build a table from TOML rows.
    ///
    /// Column kinds are inferred from the present values and a key missing
    /// from a row becomes a null (an empty list for site columns).
    pub fn from_rows(rows: &[toml::Table]) -> TableResult<Self> {
        let mut kinds: Vec<(&str, &'static str)> = Vec::new();
        for row in rows {
            for (key, val) in row {
                let kind = value_kind(key, val)?;
                match kinds.iter().find(|(name, _)| *name == key.as_str()) {
                    Some(&(_, prev)) if prev != kind => {
                        return Err(type_error(key, prev, kind));
                    }
                    Some(_) => {}
                    None => kinds.push((key.as_str(), kind)),
                }
            }
        }

        let mut table = Self::new();
        for (name, kind) in kinds {
            let cells = rows.iter().map(|row| row.get(name));
            let data = match kind {
                NUMERIC => ColumnData::Numeric(cells.map(|c| c.and_then(as_number)).collect()),
                SITES => ColumnData::Sites(cells.map(as_sites).collect()),
                _ => ColumnData::Text(
                    cells
                        .map(|c| c.and_then(|v| v.as_str()).map(String::from))
                        .collect(),
                ),
            };
            table.add_column(name, data)?;
        }
        table.n_rows = rows.len();
        Ok(table)
    }

    /// Load the `[[record]]` rows of one or more TOML files into a single table.
    ///
    /// Rows keep the order of the files and of the records inside each file.
    pub fn from_files<P: AsRef<Path>>(files: &[P]) -> Result<Self> {
        let mut rows = Vec::new();
        for file in files {
            let file = file.as_ref();
            let contents =
                fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
            let records: RecordFile = toml::from_str(&contents)
                .with_context(|| format!("failed to deserialize {file:?}"))?;
            log::info!("loaded {} records from {file:?}", records.record.len());
            rows.extend(records.record);
        }
        Self::from_rows(&rows).context("failed to build record table")
    }
}

#[derive(Deserialize)]
struct RecordFile {
    #[serde(default)]
    record: Vec<toml::Table>,
}

fn type_error(name: &str, expected: &'static str, found: &'static str) -> TableError {
    TableError::ColumnType {
        name: name.into(),
        expected,
        found,
    }
}

fn value_kind(name: &str, val: &toml::Value) -> TableResult<&'static str> {
    match val {
        toml::Value::Integer(_) | toml::Value::Float(_) => Ok(NUMERIC),
        toml::Value::String(_) => Ok(TEXT),
        toml::Value::Array(items) if items.iter().all(toml::Value::is_str) => Ok(SITES),
        _ => Err(type_error(name, "a number, a string or a site list", val.type_str())),
    }
}

fn as_number(val: &toml::Value) -> Option<f64> {
    match val {
        toml::Value::Integer(num) => Some(*num as f64),
        toml::Value::Float(num) => Some(*num),
        _ => None,
    }
}

fn as_sites(cell: Option<&toml::Value>) -> Vec<String> {
    cell.and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}
