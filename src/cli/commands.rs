//! CLI command implementations
//!
//! Commands are thin clients over the store API. Output goes to the writer
//! each command is handed; `run_command` passes stdout.

use std::io::{self, BufRead, Write};
use std::path::Path;

use serde_json::json;

use crate::config::StoreConfig;
use crate::matrix::{DType, Element};
use crate::store::{filter_by_index, ShardedReader, ShardedWriter};

use super::args::Command;
use super::errors::CliResult;
use super::io::{read_batches, write_json_line, write_json_pretty};

/// Binds `$ty` to the Rust type matching a runtime [`DType`] and evaluates
/// `$body` with it.
macro_rules! with_element_type {
    ($dtype:expr, $ty:ident => $body:expr) => {
        match $dtype {
            DType::U8 => {
                type $ty = u8;
                $body
            }
            DType::I8 => {
                type $ty = i8;
                $body
            }
            DType::U16 => {
                type $ty = u16;
                $body
            }
            DType::I16 => {
                type $ty = i16;
                $body
            }
            DType::U32 => {
                type $ty = u32;
                $body
            }
            DType::I32 => {
                type $ty = i32;
                $body
            }
            DType::U64 => {
                type $ty = u64;
                $body
            }
            DType::I64 => {
                type $ty = i64;
                $body
            }
            DType::F32 => {
                type $ty = f32;
                $body
            }
            DType::F64 => {
                type $ty = f64;
                $body
            }
        }
    };
}

/// Main CLI entry point
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cmd {
        Command::Write {
            store,
            dtype,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let stdin = io::stdin();
            write(&store, dtype, config, stdin.lock(), &mut out)
        }
        Command::Read { store } => read(&store, &mut out),
        Command::Info { store } => info(&store, &mut out),
        Command::Verify { store } => verify(&store, &mut out),
        Command::Filter {
            source,
            target,
            rows,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            filter(&source, &target, &rows, config, &mut out)
        }
    }
}

fn load_config(path: Option<&Path>) -> CliResult<StoreConfig> {
    match path {
        Some(path) => Ok(StoreConfig::load(path)?),
        None => Ok(StoreConfig::default()),
    }
}

/// Creates a store at `store` from JSON line batches on `input` and prints a
/// summary.
pub fn write<R: BufRead, W: Write>(
    store: &Path,
    dtype: DType,
    config: StoreConfig,
    input: R,
    out: &mut W,
) -> CliResult<()> {
    with_element_type!(dtype, T => write_batches::<T, R, W>(store, config, input, out))
}

fn write_batches<T: Element, R: BufRead, W: Write>(
    store: &Path,
    config: StoreConfig,
    input: R,
    out: &mut W,
) -> CliResult<()> {
    let mut writer = ShardedWriter::create(store, config)?;
    let mut batches = 0u64;

    for batch in read_batches::<T, R>(input) {
        writer.append(&batch?)?;
        batches += 1;
    }

    write_json_pretty(
        out,
        &json!({
            "store": store.display().to_string(),
            "dtype": T::DTYPE,
            "batches": batches,
            "rows": writer.rows_written(),
            "rows_per_shard": writer.rows_per_shard(),
            "shards": writer.rows_per_shard().map(|_| writer.active_shard_id() + 1).unwrap_or(0),
        }),
    )
}

/// Streams every committed row to `out` as JSON lines.
pub fn read<W: Write>(store: &Path, out: &mut W) -> CliResult<()> {
    let reader = ShardedReader::open(store)?;
    match reader.manifest()? {
        Some(manifest) => {
            with_element_type!(manifest.dtype, T => stream_rows::<T, W>(&reader, out))
        }
        None => Ok(()),
    }
}

fn stream_rows<T: Element, W: Write>(reader: &ShardedReader, out: &mut W) -> CliResult<()> {
    for row in reader.iter_rows::<T>()? {
        write_json_line(out, &row?)?;
    }
    out.flush()?;
    Ok(())
}

/// Prints the manifest, index records and committed row count.
pub fn info<W: Write>(store: &Path, out: &mut W) -> CliResult<()> {
    let reader = ShardedReader::open(store)?;
    let index = reader.index()?;
    let manifest = reader.manifest()?;

    write_json_pretty(
        out,
        &json!({
            "store": store.display().to_string(),
            "manifest": manifest,
            "records": index.records(),
            "shards": index.shard_count(),
            "total_rows": index.total_rows(),
        }),
    )
}

/// Prints the verification report.
pub fn verify<W: Write>(store: &Path, out: &mut W) -> CliResult<()> {
    let report = ShardedReader::open(store)?.verify()?;
    write_json_pretty(
        out,
        &json!({
            "clean": report.is_clean(),
            "report": report,
        }),
    )
}

/// Copies the selected rows of `source` into a new store at `target`.
pub fn filter<W: Write>(
    source: &Path,
    target: &Path,
    rows: &[u64],
    config: StoreConfig,
    out: &mut W,
) -> CliResult<()> {
    let dtype = ShardedReader::open(source)?
        .manifest()?
        .map(|m| m.dtype)
        .unwrap_or(DType::F64);

    let written = with_element_type!(dtype, T => filter_by_index::<T>(rows, source, target, config))?;

    write_json_pretty(
        out,
        &json!({
            "source": source.display().to_string(),
            "target": target.display().to_string(),
            "rows": written,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::super::errors::CliErrorCode;
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn output_lines(out: Vec<u8>) -> Vec<String> {
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn write_store(dir: &Path, dtype: DType, input: &str, max_rows: u64) -> serde_json::Value {
        let config = StoreConfig::default().with_max_rows_per_file(max_rows);
        let mut out = Vec::new();
        write(dir, dtype, config, Cursor::new(input.to_string()), &mut out).unwrap();
        serde_json::from_slice(&out).unwrap()
    }

    #[test]
    fn test_write_then_read() {
        let temp_dir = TempDir::new().unwrap();
        let store = temp_dir.path().join("store");

        let summary = write_store(&store, DType::I32, "[[1, 2], [3, 4]]\n[[5, 6]]\n", 2);
        assert_eq!(summary["rows"], 3);
        assert_eq!(summary["batches"], 2);
        assert_eq!(summary["shards"], 2);
        assert_eq!(summary["dtype"], "i32");

        let mut out = Vec::new();
        read(&store, &mut out).unwrap();
        assert_eq!(output_lines(out), vec!["[1,2]", "[3,4]", "[5,6]"]);
    }

    #[test]
    fn test_write_without_batches() {
        let temp_dir = TempDir::new().unwrap();
        let store = temp_dir.path().join("store");

        let summary = write_store(&store, DType::F64, "", 10);
        assert_eq!(summary["rows"], 0);
        assert_eq!(summary["shards"], 0);

        let mut out = Vec::new();
        read(&store, &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_bad_batch_keeps_earlier_rows() {
        let temp_dir = TempDir::new().unwrap();
        let store = temp_dir.path().join("store");

        let mut out = Vec::new();
        let err = write(
            &store,
            DType::F64,
            StoreConfig::default(),
            Cursor::new("[[1.0, 2.0]]\n[[3.0]]\n"),
            &mut out,
        )
        .unwrap_err();
        assert_eq!(err.code_str(), "ODXY_SCHEMA_MISMATCH");

        let mut out = Vec::new();
        read(&store, &mut out).unwrap();
        assert_eq!(output_lines(out), vec!["[1.0,2.0]"]);
    }

    #[test]
    fn test_info() {
        let temp_dir = TempDir::new().unwrap();
        let store = temp_dir.path().join("store");
        write_store(&store, DType::U8, "[[1], [2], [3]]\n", 2);

        let mut out = Vec::new();
        info(&store, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value["total_rows"], 3);
        assert_eq!(value["records"], json!([[0, 0, 2], [1, 2, 3]]));
        assert_eq!(value["manifest"]["dtype"], "u8");
        assert_eq!(value["manifest"]["rows_per_shard"], 2);
    }

    #[test]
    fn test_verify() {
        let temp_dir = TempDir::new().unwrap();
        let store = temp_dir.path().join("store");
        write_store(&store, DType::F32, "[[1.0], [2.0]]\n", 1);

        let mut out = Vec::new();
        verify(&store, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value["clean"], true);
        assert_eq!(value["report"]["total_rows"], 2);
        assert_eq!(value["report"]["shards"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_filter() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source");
        let target = temp_dir.path().join("target");
        write_store(&source, DType::I64, "[[10], [11], [12], [13]]\n", 3);

        let mut out = Vec::new();
        filter(&source, &target, &[3, 0], StoreConfig::default(), &mut out).unwrap();

        let mut out = Vec::new();
        read(&target, &mut out).unwrap();
        assert_eq!(output_lines(out), vec!["[13]", "[10]"]);
    }

    #[test]
    fn test_missing_store() {
        let temp_dir = TempDir::new().unwrap();
        let err = read(&temp_dir.path().join("absent"), &mut Vec::new()).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::Store("ODXY_STORE_NOT_FOUND"));
    }

    #[test]
    fn test_config_file_applied() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("ondiskxy.json");
        std::fs::write(&config_path, r#"{"max_rows_per_file": 1}"#).unwrap();

        let config = load_config(Some(&config_path)).unwrap();
        assert_eq!(config.max_rows_per_file, 1);
        assert_eq!(load_config(None).unwrap(), StoreConfig::default());

        std::fs::write(&config_path, r#"{"max_rows": 1}"#).unwrap();
        let err = load_config(Some(&config_path)).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
    }
}
