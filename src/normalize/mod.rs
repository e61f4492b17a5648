// src/normalize/mod.rs
//
// Raw grid of sheet cells → typed, column-oriented table.

pub mod coerce;
pub mod header;
pub mod rows;
pub mod table;

pub use coerce::{coerce_numeric, parse_number};
pub use header::{build_column_names, deduplicate, HeaderLocation, HeaderSpec};
pub use rows::{detect_header_row, drop_empty_rows, RawGrid};
pub use table::{format_number, Column, ColumnData, NormalizedTable};

use tracing::{debug, info, warn};

use crate::error::FatalInputError;
use header::fill_placeholders;
use rows::{cell_at, max_width};

/// How to read the header and numbers of a grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub header: HeaderSpec,
    pub location: HeaderLocation,
    pub decimal_comma: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            header: HeaderSpec::Single,
            location: HeaderLocation::First,
            decimal_comma: true,
        }
    }
}

/// Normalize `grid`:
/// 1. drop blank rows
/// 2. locate the header (first row or marker row)
/// 3. build labels, fill empty ones, make them unique
/// 4. take the rows below the header, padding short rows
/// 5. coerce each column, then drop columns without values
///
/// A blank or empty grid gives [`NormalizedTable::empty`]. A missing marker
/// is fatal.
#[tracing::instrument(level = "debug", skip(grid, options), fields(rows = grid.len()))]
pub fn assemble(
    grid: &[Vec<String>],
    options: &NormalizeOptions,
) -> Result<NormalizedTable, FatalInputError> {
    let rows = drop_empty_rows(grid);
    if rows.is_empty() {
        info!("grid has no non-blank rows");
        return Ok(NormalizedTable::empty());
    }

    let header_idx = match &options.location {
        HeaderLocation::First => 0,
        HeaderLocation::Marker(marker) => detect_header_row(&rows, marker)?,
    };
    let group = &rows[header_idx];
    let sub = match options.header {
        HeaderSpec::Single => None,
        HeaderSpec::Double => Some(
            rows.get(header_idx + 1)
                .ok_or(FatalInputError::MissingSubHeader { row: header_idx })?
                .as_slice(),
        ),
    };
    let data = &rows[header_idx + options.header.row_count()..];

    let mut labels = build_column_names(group, sub);
    let width = max_width(data).max(labels.len());
    if width > labels.len() {
        warn!(
            header = labels.len(),
            widest = width,
            "data rows are wider than the header"
        );
        labels.resize(width, String::new());
    }
    let names = deduplicate(&fill_placeholders(labels));

    let mut columns = Vec::with_capacity(width);
    for (idx, name) in names.into_iter().enumerate() {
        let cells: Vec<String> = data
            .iter()
            .map(|row| cell_at(row, idx).to_string())
            .collect();
        let column = coerce_numeric(cells, options.decimal_comma);
        if !column.is_numeric() {
            debug!(column = %name, "no numeric cell, keeping as text");
        }
        columns.push(Column::new(name, column));
    }

    let table = NormalizedTable::from_aligned(columns, data.len()).drop_all_empty_columns();
    info!(
        rows = table.num_rows(),
        columns = table.num_columns(),
        "normalized grid"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,sheetdash::normalize=trace")),
            )
            .with_test_writer()
            .finish();
        // another test may have installed it already
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn grid(rows: &[&[&str]]) -> RawGrid {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn empty_grid_is_empty_table() {
        let table = assemble(&[], &NormalizeOptions::default()).unwrap();
        assert_eq!(table.num_rows(), 0);
        assert_eq!(table.num_columns(), 0);

        let blank = grid(&[&["", " "], &[]]);
        assert!(assemble(&blank, &NormalizeOptions::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn missing_marker_aborts() {
        let g = grid(&[&["a", "b"], &["1", "2"]]);
        let opts = NormalizeOptions {
            location: HeaderLocation::Marker("DATA".into()),
            ..Default::default()
        };
        assert_eq!(
            assemble(&g, &opts),
            Err(FatalInputError::MarkerNotFound {
                marker: "DATA".into()
            })
        );
    }

    #[test]
    fn marker_header_skips_preamble_rows() {
        init_test_logging();
        let g = grid(&[
            &["PAINEL DE CONTROLE", "", ""],
            &[],
            &["DATA", "Status", "TOTAL_ACOES"],
            &["01/02/2026", "Concluído", "3"],
            &["", "", ""],
            &["02/02/2026", "Pendente", "1,5"],
        ]);
        let opts = NormalizeOptions {
            location: HeaderLocation::Marker("data".into()),
            ..Default::default()
        };
        let table = assemble(&g, &opts).unwrap();
        assert_eq!(table.column_names(), vec!["DATA", "Status", "TOTAL_ACOES"]);
        assert_eq!(table.num_rows(), 2);
        assert_eq!(
            table.column("TOTAL_ACOES").unwrap().data,
            ColumnData::Numeric(vec![Some(3.0), Some(1.5)])
        );
        assert!(!table.column("Status").unwrap().data.is_numeric());
    }

    #[test]
    fn two_row_header_builds_merged_unique_names() {
        let g = grid(&[
            &["DATA", "Ações", "Ações", "Ações"],
            &["", "Fiscais", "Fiscais", "Autuações"],
            &["01/02", "1", "2", "3"],
            &["02/02", "4", "", "x"],
        ]);
        let opts = NormalizeOptions {
            header: HeaderSpec::Double,
            ..Default::default()
        };
        let table = assemble(&g, &opts).unwrap();
        assert_eq!(
            table.column_names(),
            vec![
                "DATA",
                "Ações - Fiscais",
                "Ações - Fiscais_1",
                "Ações - Autuações"
            ]
        );
        assert_eq!(
            table.column("Ações - Fiscais_1").unwrap().data,
            ColumnData::Numeric(vec![Some(2.0), None])
        );
        assert_eq!(
            table.column("Ações - Autuações").unwrap().data,
            ColumnData::Numeric(vec![Some(3.0), None])
        );
    }

    #[test]
    fn two_row_header_on_last_row_is_fatal() {
        let g = grid(&[&["a"], &["1"], &["DATA", "b"]]);
        let opts = NormalizeOptions {
            header: HeaderSpec::Double,
            location: HeaderLocation::Marker("DATA".into()),
            ..Default::default()
        };
        assert_eq!(
            assemble(&g, &opts),
            Err(FatalInputError::MissingSubHeader { row: 2 })
        );
    }

    #[test]
    fn ragged_rows_are_padded() {
        init_test_logging();
        let g = grid(&[
            &["a", "b"],
            &["1"],
            &["2", "x", "extra"],
        ]);
        let table = assemble(&g, &NormalizeOptions::default()).unwrap();
        assert_eq!(table.column_names(), vec!["a", "b", "Unnamed: 2"]);
        assert_eq!(
            table.column("b").unwrap().data,
            ColumnData::Text(vec!["".into(), "x".into()])
        );
        assert_eq!(
            table.column("Unnamed: 2").unwrap().data,
            ColumnData::Text(vec!["".into(), "extra".into()])
        );
    }

    #[test]
    fn empty_columns_and_duplicate_headers() {
        let g = grid(&[
            &["Status", "", "Status", "vazio"],
            &["ok", "", "1", ""],
            &["nok", "", "2", "  "],
        ]);
        let table = assemble(&g, &NormalizeOptions::default()).unwrap();
        assert_eq!(table.column_names(), vec!["Status", "Status_1"]);
        assert!(table.column("Status_1").unwrap().data.is_numeric());
    }

    #[test]
    fn row_count_follows_the_data_rows() {
        let g = grid(&[
            &["DATA", "TOTAL"],
            &["01/02"],
            &["02/02", "2", "", ""],
            &["03/02", ""],
        ]);
        let table = assemble(&g, &NormalizeOptions::default()).unwrap();
        assert_eq!(table.num_rows(), 3);
        assert!(table.columns().iter().all(|c| c.data.len() == 3));
        assert_eq!(table.column_names(), vec!["DATA", "TOTAL"]);
    }

    #[test]
    fn header_without_data_is_empty_table() {
        let g = grid(&[&["DATA", "TOTAL"]]);
        let table = assemble(&g, &NormalizeOptions::default()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.num_columns(), 0);
    }
}
