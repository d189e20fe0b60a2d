use std::fs::File;
use std::io::Seek;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use async_trait::async_trait;
use linea_core::RawRow;
use tracing::debug;

use super::{batch_rows, read_blocking, TabularSource};
use crate::error::SourceError;

/// CSV export of the stoppage sheet. Every column is read as text so cells
/// keep their exact spelling (`000123` stays `000123`).
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TabularSource for CsvSource {
    async fn read_rows(&self) -> Result<Vec<RawRow>, SourceError> {
        let path = self.path.clone();
        read_blocking(move || read_csv(&path)).await
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}

fn read_csv(path: &Path) -> Result<Vec<RawRow>, SourceError> {
    let mut file = File::open(path)?;
    let schema = text_schema(&mut file)?;
    file.rewind()?;

    let reader = ReaderBuilder::new(Arc::new(schema))
        .with_header(true)
        .build(file)?;

    let mut rows = Vec::new();
    for batch in reader {
        rows.extend(batch_rows(&batch?));
    }

    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Header row only, every column as nullable `Utf8`.
fn text_schema(file: &mut File) -> Result<Schema, SourceError> {
    let (header, _) = Format::default().with_header(true).infer_schema(file, Some(0))?;
    Ok(Schema::new(
        header
            .fields()
            .iter()
            .map(|f| Field::new(f.name(), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ))
}
