//! Row selection into a new store
//!
//! Built only on the reader and writer contracts.

use std::path::Path;

use super::reader::ShardedReader;
use super::writer::ShardedWriter;
use crate::config::StoreConfig;
use crate::errors::{StoreError, StoreResult};
use crate::matrix::Element;
use crate::observability::{log_event_with_fields, Event};

/// Writes the rows of `source` selected by `row_indices` into a new store at
/// `target`, in the order given. Duplicate indices are copied each time.
///
/// All indices are checked against `source` before `target` is touched.
/// Rows are gathered `config.read_chunk_rows` at a time.
///
/// Returns the number of rows written.
///
/// # Errors
///
/// - `InvalidArgument` if `source` and `target` are the same directory
/// - `RowOutOfRange` for an index past the end of `source`
pub fn filter_by_index<T: Element>(
    row_indices: &[u64],
    source: &Path,
    target: &Path,
    config: StoreConfig,
) -> StoreResult<u64> {
    config.validate()?;

    if same_directory(source, target) {
        return Err(StoreError::InvalidArgument(format!(
            "filter source and target are both {}",
            source.display()
        )));
    }

    let reader = ShardedReader::open(source)?.with_chunk_rows(config.read_chunk_rows);
    let total = reader.len()?;
    if let Some(&row) = row_indices.iter().find(|&&row| row >= total) {
        return Err(StoreError::RowOutOfRange { row, total });
    }

    let batch_rows = config.read_chunk_rows;
    let mut writer = ShardedWriter::create(target, config)?;
    for selection in row_indices.chunks(batch_rows) {
        let rows = reader.read_rows::<T>(selection)?;
        writer.append(&rows)?;
    }

    log_event_with_fields(
        Event::FilterComplete,
        &[
            ("source", &source.display().to_string()),
            ("target", &target.display().to_string()),
            ("rows", &writer.rows_written().to_string()),
        ],
    );
    Ok(writer.rows_written())
}

fn same_directory(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
