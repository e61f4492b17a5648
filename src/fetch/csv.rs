// src/fetch/csv.rs

use ::csv::ReaderBuilder;
use anyhow::{Context, Result};
use std::{
    io::{Cursor, Read},
    path::PathBuf,
};
use tracing::{debug, instrument};

use super::SheetSource;
use crate::normalize::RawGrid;

/// Read every record of a header-less CSV, keeping ragged rows as they are.
pub fn parse_csv<R: Read>(reader: R) -> Result<RawGrid> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut grid = RawGrid::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("CSV parse error at record {}", idx))?;
        grid.push(record.iter().map(str::to_string).collect());
    }
    Ok(grid)
}

/// Tabs stored as `<dir>/<sheet>.csv`, e.g. a downloaded copy of the sheet.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    dir: PathBuf,
}

impl CsvFileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, sheet: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", sheet))
    }
}

impl SheetSource for CsvFileSource {
    #[instrument(level = "debug", skip(self))]
    async fn get_all_rows(&self, sheet: &str) -> Result<RawGrid> {
        let path = self.path_for(sheet);
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading sheet file {}", path.display()))?;
        let grid = parse_csv(Cursor::new(bytes))
            .with_context(|| format!("parsing {}", path.display()))?;
        debug!(rows = grid.len(), "read sheet file");
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn ragged_and_quoted_records_are_kept() -> Result<()> {
        let text = "DATA,Status,Obs\n01/02,\"Concluído, ok\"\n,,\n02/02,Pendente,\"linha\nquebrada\",extra\n";
        let grid = parse_csv(text.as_bytes())?;
        assert_eq!(grid.len(), 4);
        assert_eq!(grid[1], vec!["01/02", "Concluído, ok"]);
        assert_eq!(grid[2], vec!["", "", ""]);
        assert_eq!(grid[3], vec!["02/02", "Pendente", "linha\nquebrada", "extra"]);
        Ok(())
    }

    #[tokio::test]
    async fn file_source_reads_sheet_by_name() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join("CONTROLE - B. DADOS.csv"), "a,b\n1,2\n")?;
        let source = CsvFileSource::new(dir.path());

        let grid = source.get_all_rows("CONTROLE - B. DADOS").await?;
        assert_eq!(grid, vec![vec!["a", "b"], vec!["1", "2"]]);

        let err = source.get_all_rows("missing").await.unwrap_err();
        assert!(err.to_string().contains("missing.csv"));
        Ok(())
    }
}
