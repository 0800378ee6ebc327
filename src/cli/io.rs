//! JSON line I/O for the CLI
//!
//! - Input: one JSON batch per line (`[[1, 2], [3, 4]]`)
//! - Output: one JSON value per line
//! - UTF-8 only

use std::io::{BufRead, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::errors::{CliError, CliResult};
use crate::matrix::{Element, Matrix};

/// Lazily reads batches from `input`, skipping blank lines.
///
/// Items carry the 1-based line number of any parse failure.
pub fn read_batches<T, R>(input: R) -> impl Iterator<Item = CliResult<Matrix<T>>>
where
    T: Element,
    R: BufRead,
{
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !matches!(line, Ok(l) if l.trim().is_empty()))
        .map(|(i, line)| {
            let line = line?;
            let rows: Vec<Vec<T>> = parse_line(i + 1, &line)?;
            Matrix::from_rows(&rows).map_err(|e| CliError::invalid_input(i + 1, e))
        })
}

fn parse_line<V: DeserializeOwned>(line_no: usize, line: &str) -> CliResult<V> {
    serde_json::from_str(line).map_err(|e| CliError::invalid_input(line_no, e))
}

/// Writes `value` as one compact JSON line.
pub fn write_json_line<W: Write, S: Serialize + ?Sized>(out: &mut W, value: &S) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Writes `value` as pretty-printed JSON.
pub fn write_json_pretty<W: Write, S: Serialize + ?Sized>(
    out: &mut W,
    value: &S,
) -> CliResult<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
