// src/chart/mod.rs
//
// Chart series derived from a normalized table. Builders look columns up by
// name and fail with the missing name; they never touch the table itself.

pub mod svg;

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::normalize::{Column, ColumnData, NormalizedTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Line,
}

/// A renderable series: one `(label, value)` point per category or x value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub title: String,
    pub kind: ChartKind,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<(String, f64)>,
}

impl Chart {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn max_value(&self) -> f64 {
        self.points.iter().map(|(_, v)| *v).fold(0.0, f64::max)
    }
}

fn require<'a>(table: &'a NormalizedTable, name: &str) -> Result<&'a Column> {
    table
        .column(name)
        .ok_or_else(|| anyhow!("column `{}` not found in table", name))
}

/// Most frequent values of `column`, highest count first; ties keep the
/// order of first appearance. Blank cells are not counted.
pub fn value_counts(table: &NormalizedTable, column: &str, top: usize) -> Result<Chart> {
    let col = require(table, column)?;
    let cells: Vec<String> = (0..table.num_rows())
        .map(|row| col.data.display(row))
        .collect();

    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for cell in cells {
        let key = cell.trim().to_string();
        if key.is_empty() {
            continue;
        }
        let n = counts.entry(key.clone()).or_insert(0);
        if *n == 0 {
            order.push(key);
        }
        *n += 1;
    }

    let mut ranked: Vec<(usize, String)> = order.into_iter().enumerate().collect();
    ranked.sort_by(|(ia, a), (ib, b)| counts[b].cmp(&counts[a]).then(ia.cmp(ib)));

    Ok(Chart {
        title: format!("Distribuição por {}", column),
        kind: ChartKind::Bar,
        x_label: column.to_string(),
        y_label: "Quantidade".into(),
        points: ranked
            .into_iter()
            .take(top)
            .map(|(_, k)| {
                let n = counts[&k] as f64;
                (k, n)
            })
            .collect(),
    })
}

/// A distribution chart for every text column with more than one distinct value.
pub fn auto_distributions(table: &NormalizedTable, top: usize) -> Vec<Chart> {
    table
        .columns()
        .iter()
        .filter(|c| !c.data.is_numeric())
        .filter_map(|c| value_counts(table, &c.name, top).ok())
        .filter(|chart| {
            let keep = chart.points.len() > 1;
            if !keep {
                debug!(title = %chart.title, "skipping single-valued distribution");
            }
            keep
        })
        .collect()
}

/// Sum of every numeric column whose name contains `keyword` (any case).
pub fn totals_by_keyword(table: &NormalizedTable, keyword: &str) -> Chart {
    let points = table
        .columns_containing(keyword)
        .into_iter()
        .filter_map(|c| c.sum().map(|s| (c.name.clone(), s)))
        .collect();

    Chart {
        title: format!("Total de {} por Tipo", keyword),
        kind: ChartKind::Bar,
        x_label: "Tipo".into(),
        y_label: "Total".into(),
        points,
    }
}

/// `y` against `x`, in row order. Rows without a `y` value are skipped.
pub fn evolution(table: &NormalizedTable, x: &str, y: &str) -> Result<Chart> {
    let x_col = require(table, x)?;
    let y_col = require(table, y)?;
    let values = match &y_col.data {
        ColumnData::Numeric(v) => v,
        ColumnData::Text(_) => return Err(anyhow!("column `{}` is not numeric", y)),
    };

    let points = values
        .iter()
        .enumerate()
        .filter_map(|(row, v)| v.map(|v| (x_col.data.display(row), v)))
        .collect();

    Ok(Chart {
        title: format!("Evolução de {}", y),
        kind: ChartKind::Line,
        x_label: x.to_string(),
        y_label: y.to_string(),
        points,
    })
}

/// Every chart of the dashboard: distributions of the text columns, totals
/// of the keyword columns, and the `(x, y)` evolution line when both
/// columns exist and `y` is numeric.
pub fn dashboard_charts(
    table: &NormalizedTable,
    top: usize,
    totals_keyword: &str,
    evolution_axes: Option<(&str, &str)>,
) -> Vec<Chart> {
    let mut charts = auto_distributions(table, top);
    let totals = totals_by_keyword(table, totals_keyword);
    if !totals.is_empty() {
        charts.push(totals);
    }
    if let Some((x, y)) = evolution_axes {
        match evolution(table, x, y) {
            Ok(chart) => charts.push(chart),
            Err(err) => warn!(error = %err, "skipping evolution chart"),
        }
    }
    charts
}
