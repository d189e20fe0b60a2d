use std::path::{Path, PathBuf};

use async_trait::async_trait;
use linea_core::RawRow;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::debug;

use super::{batch_rows, read_blocking, TabularSource};
use crate::error::SourceError;

/// Parquet snapshot of the stoppage sheet.
pub struct ParquetSource {
    path: PathBuf,
}

impl ParquetSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TabularSource for ParquetSource {
    async fn read_rows(&self) -> Result<Vec<RawRow>, SourceError> {
        let path = self.path.clone();
        read_blocking(move || read_parquet(&path)).await
    }

    fn describe(&self) -> String {
        format!("parquet:{}", self.path.display())
    }
}

fn read_parquet(path: &Path) -> Result<Vec<RawRow>, SourceError> {
    let file = std::fs::File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut rows = Vec::new();
    for batch in reader {
        rows.extend(batch_rows(&batch?));
    }

    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use linea_core::CellValue;
    use parquet::arrow::ArrowWriter;

    #[tokio::test]
    async fn reads_written_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.parquet");

        let schema = Arc::new(Schema::new(vec![
            Field::new("Planta", DataType::Utf8, true),
            Field::new("Complain Qty", DataType::Int64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["Lima", "Cusco"])),
                Arc::new(Int64Array::from(vec![4, 7])),
            ],
        )
        .unwrap();
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let rows = ParquetSource::new(&path).read_rows().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["Planta"], CellValue::Text("Cusco".into()));
        assert_eq!(rows[1]["Complain Qty"], CellValue::Integer(7));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let source = ParquetSource::new("/nonexistent/input.parquet");
        assert!(matches!(source.read_rows().await, Err(SourceError::Io(_))));
    }
}
