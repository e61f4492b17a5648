// src/normalize/table.rs

use anyhow::{anyhow, Result};
use arrow::{
    array::{ArrayRef, Float64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::{RecordBatch, RecordBatchOptions},
};
use std::sync::Arc;
use tracing::debug;

/// Values of one column, tagged by type. `None` marks a missing number.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when no row holds a value (missing numbers, blank text).
    pub fn is_all_empty(&self) -> bool {
        match self {
            ColumnData::Numeric(v) => v.iter().all(Option::is_none),
            ColumnData::Text(v) => v.iter().all(|s| s.trim().is_empty()),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnData::Numeric(_))
    }

    pub fn data_type(&self) -> DataType {
        match self {
            ColumnData::Numeric(_) => DataType::Float64,
            ColumnData::Text(_) => DataType::Utf8,
        }
    }

    /// Cell rendered for display: integral numbers without a fraction, missing as "".
    pub fn display(&self, row: usize) -> String {
        match self {
            ColumnData::Numeric(v) => v
                .get(row)
                .copied()
                .flatten()
                .map(format_number)
                .unwrap_or_default(),
            ColumnData::Text(v) => v.get(row).cloned().unwrap_or_default(),
        }
    }
}

/// `3.0` → `"3"`, `2.5` → `"2.5"`.
pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.0}", v)
    } else {
        format!("{}", v)
    }
}

/// A named column of a [`NormalizedTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Numeric values, if this is a numeric column.
    pub fn numbers(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Text(_) => None,
        }
    }

    /// Sum of the present values of a numeric column.
    pub fn sum(&self) -> Option<f64> {
        self.numbers().map(|v| v.iter().flatten().sum())
    }

    /// Mean of the present values; `None` for text or all-missing columns.
    pub fn mean(&self) -> Option<f64> {
        let values = self.numbers()?;
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        if present.is_empty() {
            None
        } else {
            Some(present.iter().sum::<f64>() / present.len() as f64)
        }
    }
}

/// Column-oriented table with unique column names, in sheet order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedTable {
    columns: Vec<Column>,
    num_rows: usize,
}

impl NormalizedTable {
    /// Zero rows, zero columns.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from columns of equal length.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let num_rows = columns.first().map(|c| c.data.len()).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.data.len() != num_rows) {
            return Err(anyhow!(
                "column `{}` has {} rows, expected {}",
                bad.name,
                bad.data.len(),
                num_rows
            ));
        }
        Ok(Self { columns, num_rows })
    }

    /// Build from columns already known to hold `num_rows` values each.
    pub(crate) fn from_aligned(columns: Vec<Column>, num_rows: usize) -> Self {
        debug_assert!(columns.iter().all(|c| c.data.len() == num_rows));
        Self { columns, num_rows }
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// The "no data" state: zero rows or zero columns.
    pub fn is_empty(&self) -> bool {
        self.num_rows == 0 || self.columns.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns whose name contains `keyword`, ignoring case.
    pub fn columns_containing(&self, keyword: &str) -> Vec<&Column> {
        let keyword = keyword.to_uppercase();
        self.columns
            .iter()
            .filter(|c| c.name.to_uppercase().contains(&keyword))
            .collect()
    }

    /// Drop columns without a single value. A table left without columns
    /// also loses its rows.
    pub fn drop_all_empty_columns(self) -> Self {
        let before = self.columns.len();
        let columns: Vec<Column> = self
            .columns
            .into_iter()
            .filter(|c| !c.data.is_all_empty())
            .collect();
        if columns.len() != before {
            debug!(dropped = before - columns.len(), "dropped all-empty columns");
        }
        let num_rows = if columns.is_empty() { 0 } else { self.num_rows };
        Self { columns, num_rows }
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> Self {
        let n = n.min(self.num_rows);
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let data = match &c.data {
                    ColumnData::Numeric(v) => ColumnData::Numeric(v[..n].to_vec()),
                    ColumnData::Text(v) => ColumnData::Text(v[..n].to_vec()),
                };
                Column::new(c.name.clone(), data)
            })
            .collect();
        Self {
            columns,
            num_rows: n,
        }
    }

    /// Arrow schema: `Float64` for numeric columns, `Utf8` for text, all nullable.
    pub fn arrow_schema(&self) -> Arc<Schema> {
        let fields: Vec<Field> = self
            .columns
            .iter()
            .map(|c| Field::new(&c.name, c.data.data_type(), true))
            .collect();
        Arc::new(Schema::new(fields))
    }

    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let arrays: Vec<ArrayRef> = self
            .columns
            .iter()
            .map(|c| match &c.data {
                ColumnData::Numeric(v) => Arc::new(Float64Array::from(v.clone())) as ArrayRef,
                ColumnData::Text(v) => {
                    Arc::new(StringArray::from_iter_values(v.iter())) as ArrayRef
                }
            })
            .collect();

        // an empty table still needs an explicit row count
        let options = RecordBatchOptions::new().with_row_count(Some(self.num_rows));
        RecordBatch::try_new_with_options(self.arrow_schema(), arrays, &options)
            .map_err(Into::into)
    }
}
