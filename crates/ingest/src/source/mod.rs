//! Tabular sources polled by the watcher.
//!
//! A source returns the full current snapshot on every read. Readers for
//! CSV and Parquet exports of the stoppage sheet live here; tests plug in
//! their own [`TabularSource`] implementations.

pub mod csv_file;
pub mod parquet_file;

use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use linea_core::{CellValue, RawRow};

use crate::error::SourceError;

pub use self::csv_file::CsvSource;
pub use self::parquet_file::ParquetSource;

/// A tabular data source: header row defines column names, one row per record.
#[async_trait]
pub trait TabularSource: Send + Sync {
    /// Read the full current snapshot.
    async fn read_rows(&self) -> Result<Vec<RawRow>, SourceError>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

/// Pick a reader for `path` from its extension.
pub fn open_source(path: &Path) -> Result<Arc<dyn TabularSource>, SourceError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => Ok(Arc::new(CsvSource::new(path))),
        "parquet" => Ok(Arc::new(ParquetSource::new(path))),
        _ => Err(SourceError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Run a blocking file read on the blocking pool.
async fn read_blocking<F>(read: F) -> Result<Vec<RawRow>, SourceError>
where
    F: FnOnce() -> Result<Vec<RawRow>, SourceError> + Send + 'static,
{
    tokio::task::spawn_blocking(read)
        .await
        .map_err(|e| SourceError::Task(e.to_string()))?
}

/// Convert a record batch into rows keyed by field name.
pub(crate) fn batch_rows(batch: &RecordBatch) -> Vec<RawRow> {
    let schema = batch.schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();

    (0..batch.num_rows())
        .map(|row_idx| {
            names
                .iter()
                .zip(batch.columns())
                .map(|(name, column)| (name.to_string(), cell_at(column.as_ref(), row_idx)))
                .collect()
        })
        .collect()
}

fn cell_at(array: &dyn Array, row: usize) -> CellValue {
    if array.is_null(row) {
        return CellValue::Null;
    }
    match array.data_type() {
        DataType::Null => CellValue::Null,
        DataType::Utf8 => CellValue::Text(array.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => CellValue::Text(array.as_string::<i64>().value(row).to_string()),
        DataType::Int64 => CellValue::Integer(array.as_primitive::<Int64Type>().value(row)),
        DataType::Int32 => CellValue::Integer(array.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Float64 => CellValue::Float(array.as_primitive::<Float64Type>().value(row)),
        DataType::Float32 => CellValue::Float(array.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Boolean => CellValue::Boolean(array.as_boolean().value(row)),
        // Dates, timestamps and the rest keep Arrow's display form.
        _ => match arrow::util::display::array_value_to_string(array, row) {
            Ok(text) => CellValue::Text(text),
            Err(e) => {
                tracing::debug!(error = %e, "unrenderable cell, treating as empty");
                CellValue::Null
            }
        },
    }
}
