// src/export/parquet.rs

use anyhow::{Context, Result};
use ::parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use std::{fs::File, path::Path};
use tracing::{info, instrument};

use crate::normalize::NormalizedTable;

/// Snapshot the table as a single-batch, SNAPPY-compressed Parquet file.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub fn write_parquet(table: &NormalizedTable, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let batch = table.to_record_batch().context("building record batch")?;

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("creating Arrow writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing Parquet writer")?;

    info!(rows = table.num_rows(), columns = table.num_columns(), "wrote snapshot");
    Ok(())
}
