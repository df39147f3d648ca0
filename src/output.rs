//! Table export.
//!
//! CSV is the primary format: one file per table, header row included,
//! one record per row. Each table can also be mirrored as Parquet
//! through an Arrow record batch.

use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::arrow_writer::ArrowWriter;
use serde::Serialize;
use std::fs::File;
use std::path::Path;

/// Write records as CSV with a header row derived from the record's
/// field names. The output directory must already exist; a missing
/// directory is reported as an error, not created on the fly.
pub fn write_csv<R: Serialize>(path: &Path, records: &[R]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}

pub fn save_record_batch(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

pub fn load_record_batch(path: &Path) -> Result<RecordBatch> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let mut reader = builder.build()?;
    let batch = reader
        .next()
        .with_context(|| format!("{} contains no row groups", path.display()))??;
    Ok(batch)
}

/// Serde adapter rendering timestamps as `YYYY-MM-DD HH:MM:SS`, the
/// format the CSV consumers of these tables expect.
pub mod timestamp_format {

    use chrono::NaiveDateTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(timestamp: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&timestamp.format(FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
