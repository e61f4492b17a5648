// src/normalize/rows.rs

use tracing::{debug, trace};

use crate::error::FatalInputError;

/// Unprocessed rows of string cells, as returned by a sheet source.
pub type RawGrid = Vec<Vec<String>>;

/// True when every cell trims to the empty string (an empty row included).
pub fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

/// Remove rows whose cells are all blank, keeping the order of the rest.
pub fn drop_empty_rows(grid: &[Vec<String>]) -> RawGrid {
    let kept: RawGrid = grid
        .iter()
        .filter(|row| !is_blank_row(row))
        .cloned()
        .collect();
    if kept.len() != grid.len() {
        debug!(dropped = grid.len() - kept.len(), "dropped blank rows");
    }
    kept
}

/// Index of the first row holding a cell equal to `marker` after trim + uppercase.
pub fn detect_header_row(grid: &[Vec<String>], marker: &str) -> Result<usize, FatalInputError> {
    let wanted = marker.trim().to_uppercase();
    for (idx, row) in grid.iter().enumerate() {
        if row.iter().any(|cell| cell.trim().to_uppercase() == wanted) {
            trace!(idx, marker, "header marker found");
            return Ok(idx);
        }
    }
    Err(FatalInputError::MarkerNotFound {
        marker: marker.to_string(),
    })
}

/// Widest row length in `rows`.
pub fn max_width<'a>(rows: impl IntoIterator<Item = &'a Vec<String>>) -> usize {
    rows.into_iter().map(Vec::len).max().unwrap_or(0)
}

/// Cell `idx` of `row`, or the empty string for positions past a short row.
pub fn cell_at(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> RawGrid {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn blank_row_between_data_is_dropped() {
        let g = grid(&[&["a", "b"], &["1", "2"], &["  ", ""], &["3", "4"]]);
        let out = drop_empty_rows(&g);
        assert_eq!(out, grid(&[&["a", "b"], &["1", "2"], &["3", "4"]]));
    }

    #[test]
    fn zero_width_rows_count_as_blank() {
        let g = grid(&[&[], &["\t"], &[]]);
        assert!(drop_empty_rows(&g).is_empty());
    }

    #[test]
    fn marker_match_ignores_case_and_padding() {
        let g = grid(&[
            &["Relatório", ""],
            &["gerado em", "2026-01-02"],
            &[" data ", "TOTAL_ACOES"],
            &["01/01", "3"],
        ]);
        assert_eq!(detect_header_row(&g, "DATA"), Ok(2));
        assert_eq!(detect_header_row(&g, "total_acoes"), Ok(2));
    }

    #[test]
    fn missing_marker_names_the_column() {
        let g = grid(&[&["a", "b"], &["1", "2"]]);
        let err = detect_header_row(&g, "STATUS").unwrap_err();
        assert_eq!(
            err,
            FatalInputError::MarkerNotFound {
                marker: "STATUS".into()
            }
        );
        assert!(err.to_string().contains("'STATUS'"));
    }

    #[test]
    fn substring_is_not_a_marker_match() {
        let g = grid(&[&["DATA INICIAL"], &["DATA"]]);
        assert_eq!(detect_header_row(&g, "data"), Ok(1));
    }

    #[test]
    fn short_rows_read_as_empty() {
        let row = vec!["x".to_string()];
        assert_eq!(cell_at(&row, 0), "x");
        assert_eq!(cell_at(&row, 3), "");
        let g = grid(&[&["a"], &["a", "b", "c"], &[]]);
        assert_eq!(max_width(&g), 3);
    }
}
