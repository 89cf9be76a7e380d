//! Parquet chunk tables.
//!
//! An ingestion run writes its parsed, resolved chunks to a single Parquet
//! file in the `lawgraph_core::schema::chunks` layout; the CLI and tests read
//! them back into an in-memory index.

use std::fs::File;
use std::path::Path;

use arrow::record_batch::RecordBatch;
use lawgraph_core::ArticleChunk;
use lawgraph_core::schema::chunks::{batch_to_chunks, chunks_to_batch};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::info;

use crate::StoreError;

/// Write `chunks` to `path`, replacing any existing file.
pub fn write_chunks(path: &Path, chunks: &[ArticleChunk]) -> Result<(), StoreError> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir)?;
    }
    let batch = chunks_to_batch(chunks)?;
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    info!(path = %path.display(), rows = chunks.len(), "wrote chunk table");
    Ok(())
}

/// Read every chunk from a table written by [`write_chunks`].
pub fn read_chunks(path: &Path) -> Result<Vec<ArticleChunk>, StoreError> {
    if !path.exists() {
        return Err(StoreError::ParquetNotFound(path.to_path_buf()));
    }
    let mut chunks = Vec::new();
    for batch in read_parquet(path)? {
        chunks.extend(batch_to_chunks(&batch)?);
    }
    info!(path = %path.display(), rows = chunks.len(), "read chunk table");
    Ok(chunks)
}

/// Read a Parquet file into Arrow RecordBatches.
pub fn read_parquet(path: &Path) -> Result<Vec<RecordBatch>, StoreError> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let batches: Result<Vec<RecordBatch>, _> = reader.collect();
    Ok(batches?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lawgraph_core::AbbreviationMap;
    use tempfile::TempDir;

    fn chunks() -> Vec<ArticleChunk> {
        let mut act = ArticleChunk::new("건축법", "1823", "46", "건축선의 지정", "위원회는 정한다.");
        act.abbreviations = AbbreviationMap::sanitized("건축법", [("위원회", "건축위원회")]);
        act.content_resolved = act.abbreviations.apply(&act.content);
        vec![
            act,
            ArticleChunk::new("건축법 시행령", "2118", "31", "건축선", "법 제46조에 따른다."),
        ]
    }

    #[test]
    fn write_then_read() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out").join("chunks.parquet");
        write_chunks(&path, &chunks()).unwrap();

        let back = read_chunks(&path).unwrap();
        assert_eq!(back, chunks());
        assert_eq!(back[0].content_resolved, "건축위원회는 정한다.");
    }

    #[test]
    fn rewrite_replaces_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("chunks.parquet");
        write_chunks(&path, &chunks()).unwrap();
        write_chunks(&path, &chunks()[..1]).unwrap();
        assert_eq!(read_chunks(&path).unwrap().len(), 1);
    }

    #[test]
    fn missing_parquet_errors() {
        let result = read_chunks(Path::new("/nonexistent/chunks.parquet"));
        assert!(matches!(result, Err(StoreError::ParquetNotFound(_))));
    }
}
