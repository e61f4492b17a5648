// src/kpi.rs

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::normalize::{format_number, ColumnData, NormalizedTable};

/// A headline figure read from one column, shown as `"{label}: {value}"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamedColumn {
    pub label: String,
    pub column: String,
}

impl NamedColumn {
    pub fn new(label: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            column: column.into(),
        }
    }
}

/// Which columns feed the KPI figures.
#[derive(Debug, Clone, Copy)]
pub struct KpiSpec<'a> {
    pub status_column: &'a str,
    /// Numeric columns whose name contains this are totalled one by one.
    pub totals_keyword: &'a str,
    /// Summed columns.
    pub sums: &'a [NamedColumn],
    /// Averaged column, rendered as a percentage.
    pub mean_percent: Option<&'a NamedColumn>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FigureKind {
    Sum,
    MeanPercent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub label: String,
    pub kind: FigureKind,
    pub value: f64,
}

impl Figure {
    pub fn render(&self) -> String {
        match self.kind {
            FigureKind::Sum => format!("{}: {}", self.label, format_number(self.value)),
            FigureKind::MeanPercent => format!("{}: {:.1}%", self.label, self.value),
        }
    }
}

/// Headline figures of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub rows: usize,
    pub columns: usize,
    /// Distinct non-blank values of the status column, when the table has one.
    pub distinct_status: Option<usize>,
    /// Named sums and the mean percentage, minus those whose column is
    /// absent or holds no number.
    pub figures: Vec<Figure>,
    /// `(column, sum)` for every numeric column matching the totals keyword.
    pub totals: Vec<(String, f64)>,
}

impl Kpis {
    pub fn compute(table: &NormalizedTable, spec: &KpiSpec<'_>) -> Self {
        let distinct_status = table
            .column(spec.status_column)
            .map(|c| distinct_values(&c.data));

        let sums = spec.sums.iter().map(|named| {
            let value = table.column(&named.column).and_then(|c| c.sum());
            (named, FigureKind::Sum, value)
        });
        let mean = spec.mean_percent.map(|named| {
            let value = table.column(&named.column).and_then(|c| c.mean());
            (named, FigureKind::MeanPercent, value)
        });
        let figures = sums
            .chain(mean)
            .filter_map(|(named, kind, value)| match value {
                Some(value) => Some(Figure {
                    label: named.label.clone(),
                    kind,
                    value,
                }),
                None => {
                    debug!(column = %named.column, "no numeric values, skipping figure");
                    None
                }
            })
            .collect();

        let totals = table
            .columns_containing(spec.totals_keyword)
            .into_iter()
            .filter_map(|c| c.sum().map(|s| (c.name.clone(), s)))
            .collect();

        Self {
            rows: table.num_rows(),
            columns: table.num_columns(),
            distinct_status,
            figures,
            totals,
        }
    }

    /// One `label: value` line per figure, as shown on the KPI slide.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Total de Registros: {}", self.rows),
            format!("Colunas: {}", self.columns),
        ];
        if let Some(n) = self.distinct_status {
            lines.push(format!("Status Únicos: {}", n));
        }
        lines.extend(self.figures.iter().map(Figure::render));
        for (name, total) in &self.totals {
            lines.push(format!("{}: {}", name, format_number(*total)));
        }
        lines
    }
}

fn distinct_values(data: &ColumnData) -> usize {
    match data {
        ColumnData::Text(v) => v
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<HashSet<_>>()
            .len(),
        ColumnData::Numeric(v) => v
            .iter()
            .flatten()
            .map(|x| x.to_bits())
            .collect::<HashSet<_>>()
            .len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{assemble, NormalizeOptions};

    fn table() -> NormalizedTable {
        let grid: Vec<Vec<String>> = [
            vec![
                "DATA",
                "Status",
                "AÇÕES FISCAIS",
                "Ações Educativas",
                "TOTAL_BD",
                "CONFORMIDADE",
            ],
            vec!["01/02", "Concluído", "2", "1", "10", "90"],
            vec!["02/02", "Pendente", "3,5", "", "12", "85"],
            vec!["03/02", "Concluído ", "x", "4", "1", ""],
        ]
        .iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect();
        assemble(&grid, &NormalizeOptions::default()).unwrap()
    }

    fn kpi_spec<'a>(
        status: &'a str,
        keyword: &'a str,
        sums: &'a [NamedColumn],
        mean: Option<&'a NamedColumn>,
    ) -> KpiSpec<'a> {
        KpiSpec {
            status_column: status,
            totals_keyword: keyword,
            sums,
            mean_percent: mean,
        }
    }

    #[test]
    fn counts_and_totals() {
        let kpis = Kpis::compute(&table(), &kpi_spec("Status", "ações", &[], None));
        assert_eq!(kpis.rows, 3);
        assert_eq!(kpis.columns, 6);
        assert_eq!(kpis.distinct_status, Some(2));
        assert!(kpis.figures.is_empty());
        assert_eq!(
            kpis.totals,
            vec![
                ("AÇÕES FISCAIS".to_string(), 5.5),
                ("Ações Educativas".to_string(), 5.0)
            ]
        );
    }

    #[test]
    fn named_sums_and_mean_percentage() {
        let sums = [
            NamedColumn::new("Total de Ações", "TOTAL_ACOES"),
            NamedColumn::new("Total Banco de Dados", "TOTAL_BD"),
        ];
        let mean = NamedColumn::new("Índice de Conformidade", "CONFORMIDADE");
        let kpis = Kpis::compute(&table(), &kpi_spec("Situação", "nada", &sums, Some(&mean)));

        // TOTAL_ACOES is not in the table, so only two figures remain
        assert_eq!(
            kpis.figures,
            vec![
                Figure {
                    label: "Total Banco de Dados".into(),
                    kind: FigureKind::Sum,
                    value: 23.0,
                },
                Figure {
                    label: "Índice de Conformidade".into(),
                    kind: FigureKind::MeanPercent,
                    value: 87.5,
                },
            ]
        );
        assert_eq!(
            kpis.lines(),
            vec![
                "Total de Registros: 3",
                "Colunas: 6",
                "Total Banco de Dados: 23",
                "Índice de Conformidade: 87.5%",
            ]
        );
    }

    #[test]
    fn text_column_gives_no_figure() {
        let sums = [NamedColumn::new("Datas", "DATA")];
        let kpis = Kpis::compute(&table(), &kpi_spec("Status", "nada", &sums, None));
        assert!(kpis.figures.is_empty());
    }

    #[test]
    fn missing_status_column_is_skipped() {
        let kpis = Kpis::compute(&table(), &kpi_spec("Situação", "TOTAL", &[], None));
        assert_eq!(kpis.distinct_status, None);
        assert_eq!(kpis.totals, vec![("TOTAL_BD".to_string(), 23.0)]);
        assert_eq!(
            kpis.lines(),
            vec!["Total de Registros: 3", "Colunas: 6", "TOTAL_BD: 23"]
        );
    }

    #[test]
    fn empty_table_has_zero_figures() {
        let mean = NamedColumn::new("Índice de Conformidade", "CONFORMIDADE");
        let kpis = Kpis::compute(
            &NormalizedTable::empty(),
            &kpi_spec("Status", "AÇÕES", &[], Some(&mean)),
        );
        assert_eq!(kpis.rows, 0);
        assert_eq!(kpis.columns, 0);
        assert!(kpis.figures.is_empty());
        assert!(kpis.totals.is_empty());
    }
}
