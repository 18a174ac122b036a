//! The report table shared by all stages.
//!
//! One row per assembly, keyed by its identity, one column per metric.
//! The header starts with the fixed `id`/`Assembly` prefix and only ever
//! grows at the end. Every mutation either applies to all rows or fails
//! before touching anything, so a row always holds exactly as many values
//! as the header has columns.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

pub const ID_COLUMN: &str = "id";
pub const ASSEMBLY_COLUMN: &str = "Assembly";

/// One report cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Missing,
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{:.2}", v),
            Self::Text(s) => f.write_str(s),
            Self::Missing => f.write_str("-"),
        }
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Self::from(v as u64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Missing, Into::into)
    }
}

/// Which way a table is laid out when rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// One line per metric, one column per assembly
    RowMajor,
    /// One line per assembly, one column per metric
    ColumnMajor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub identity: String,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    header: Vec<String>,
    rows: Vec<Row>,
}

impl Default for ReportTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportTable {
    /// Empty table with the `id`/`Assembly` prefix.
    pub fn new() -> Self {
        Self {
            header: vec![ID_COLUMN.to_string(), ASSEMBLY_COLUMN.to_string()],
            rows: Vec::new(),
        }
    }

    /// Append the first metric columns. Only allowed while the table has
    /// no rows.
    pub fn initialize_header<S: Into<String>>(&mut self, columns: impl IntoIterator<Item = S>) -> Result<()> {
        if !self.rows.is_empty() {
            return Err(Error::TableMismatch(
                "header can only be initialized on an empty table".into(),
            ));
        }
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        self.check_new_columns(&columns)?;
        self.header.extend(columns);
        Ok(())
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.identity.as_str())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, identity: &str) -> Option<&[Value]> {
        self.rows
            .iter()
            .find(|row| row.identity == identity)
            .map(|row| row.values.as_slice())
    }

    /// Value of one metric for one assembly.
    pub fn value(&self, identity: &str, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.row(identity).map(|values| &values[index])
    }

    /// All values of one metric in row order.
    pub fn column(&self, column: &str) -> Option<Vec<&Value>> {
        let index = self.column_index(column)?;
        Some(self.rows.iter().map(|row| &row.values[index]).collect())
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.header.iter().position(|c| c == column)
    }

    /// Add a row whose values cover the full current header.
    pub fn add_row(&mut self, identity: impl Into<String>, values: Vec<Value>) -> Result<()> {
        let identity = identity.into();
        if self.row(&identity).is_some() {
            return Err(Error::TableMismatch(format!(
                "duplicate assembly identity '{}'",
                identity
            )));
        }
        if values.len() != self.header.len() {
            return Err(Error::TableMismatch(format!(
                "row '{}' has {} values for {} columns",
                identity,
                values.len(),
                self.header.len()
            )));
        }
        self.rows.push(Row { identity, values });
        Ok(())
    }

    /// Remove a row; returns its values if it existed.
    pub fn remove_row(&mut self, identity: &str) -> Option<Vec<Value>> {
        let index = self.rows.iter().position(|row| row.identity == identity)?;
        Some(self.rows.remove(index).values)
    }

    /// Append `columns` to the header and the matching values to every row.
    ///
    /// The key set of `values` must equal the set of row identities and each
    /// entry must carry exactly `columns.len()` values. Everything is checked
    /// before the table is modified.
    pub fn extend_all_rows(
        &mut self,
        columns: &[String],
        mut values: HashMap<String, Vec<Value>>,
    ) -> Result<()> {
        self.check_new_columns(columns)?;

        let known: HashSet<&str> = self.identities().collect();
        if let Some(missing) = self.rows.iter().find(|row| !values.contains_key(&row.identity)) {
            return Err(Error::TableMismatch(format!(
                "no values for assembly '{}' in columns {:?}",
                missing.identity, columns
            )));
        }
        let mut unknown: Vec<&String> = values.keys().filter(|k| !known.contains(k.as_str())).collect();
        unknown.sort();
        if let Some(extra) = unknown.first() {
            return Err(Error::TableMismatch(format!(
                "values for unknown assembly '{}'",
                extra
            )));
        }
        if let Some((identity, row)) = values.iter().find(|(_, v)| v.len() != columns.len()) {
            return Err(Error::TableMismatch(format!(
                "assembly '{}' has {} values for {} new columns",
                identity,
                row.len(),
                columns.len()
            )));
        }

        self.header.extend(columns.iter().cloned());
        for row in &mut self.rows {
            if let Some(new_values) = values.remove(&row.identity) {
                row.values.extend(new_values);
            }
        }
        Ok(())
    }

    /// Like [`Self::extend_all_rows`], but identities absent from `values`
    /// are filled by `filler`. Unknown identities are still rejected.
    pub fn extend_all_rows_with<F>(
        &mut self,
        columns: &[String],
        mut values: HashMap<String, Vec<Value>>,
        filler: F,
    ) -> Result<()>
    where
        F: Fn(&str) -> Vec<Value>,
    {
        for identity in self.identities() {
            if !values.contains_key(identity) {
                values.insert(identity.to_string(), filler(identity));
            }
        }
        self.extend_all_rows(columns, values)
    }

    fn check_new_columns(&self, columns: &[String]) -> Result<()> {
        let mut seen: HashSet<&str> = self.header.iter().map(String::as_str).collect();
        for column in columns {
            if !seen.insert(column.as_str()) {
                return Err(Error::TableMismatch(format!(
                    "column '{}' already present",
                    column
                )));
            }
        }
        Ok(())
    }

    /// Render as a grid of display strings. The internal `id` column is
    /// left out; the first cell of the grid is `Assembly`.
    pub fn render(&self, orientation: Orientation) -> Vec<Vec<String>> {
        let metrics: Vec<usize> = (0..self.header.len())
            .filter(|&i| self.header[i] != ID_COLUMN && self.header[i] != ASSEMBLY_COLUMN)
            .collect();

        match orientation {
            Orientation::RowMajor => {
                let mut grid = Vec::with_capacity(metrics.len() + 1);
                let mut first = vec![ASSEMBLY_COLUMN.to_string()];
                first.extend(self.rows.iter().map(|row| row.identity.clone()));
                grid.push(first);
                for &index in &metrics {
                    let mut line = vec![self.header[index].clone()];
                    line.extend(self.rows.iter().map(|row| row.values[index].to_string()));
                    grid.push(line);
                }
                grid
            }
            Orientation::ColumnMajor => {
                let mut grid = Vec::with_capacity(self.rows.len() + 1);
                let mut first = vec![ASSEMBLY_COLUMN.to_string()];
                first.extend(metrics.iter().map(|&i| self.header[i].clone()));
                grid.push(first);
                for row in &self.rows {
                    let mut line = vec![row.identity.clone()];
                    line.extend(metrics.iter().map(|&i| row.values[i].to_string()));
                    grid.push(line);
                }
                grid
            }
        }
    }
}
