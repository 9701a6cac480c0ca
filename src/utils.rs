use crate::error::Error;
use polars::prelude::*;
use std::path::Path;

/// Run `op` inside a dedicated rayon thread pool.
///
/// `num_threads` of 0 lets rayon pick the number of available cores.
pub fn run_with_threads<R, F>(num_threads: usize, op: F) -> Result<R, Error>
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()?;
    Ok(pool.install(op))
}

/// Write a DataFrame to `file_path`.
///
/// CSV output has no header line and no index column. Parent directories are
/// created as needed; any failure to create or write the file is returned.
pub fn write_df_to_file(
    df: &mut DataFrame,
    file_path: &Path,
    file_type: DataFrameFileType,
) -> Result<(), Error> {
    let mut file = create_file(file_path)?;
    match file_type {
        DataFrameFileType::Csv => {
            CsvWriter::new(&mut file).include_header(false).finish(df)?;
        }
        DataFrameFileType::Parquet => {
            ParquetWriter::new(&mut file).finish(df)?;
        }
        DataFrameFileType::Json => {
            JsonWriter::new(&mut file)
                .with_json_format(JsonFormat::Json)
                .finish(df)?;
        }
        DataFrameFileType::NDJson => {
            JsonWriter::new(&mut file)
                .with_json_format(JsonFormat::JsonLines)
                .finish(df)?;
        }
    }
    Ok(())
}

/// Create (or truncate) `path`, creating missing parent directories first.
pub(crate) fn create_file(path: &Path) -> Result<std::fs::File, Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(std::fs::File::create(path)?)
}

/// File format for writing DataFrames.
#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum DataFrameFileType {
    /// Comma-separated values
    Csv,
    /// Parquet columnar storage
    Parquet,
    /// Standard JSON
    Json,
    /// Newline-delimited JSON
    NDJson,
}

impl std::fmt::Display for DataFrameFileType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DataFrameFileType::Csv => write!(f, "csv"),
            DataFrameFileType::Parquet => write!(f, "parquet"),
            DataFrameFileType::Json => write!(f, "json"),
            DataFrameFileType::NDJson => write!(f, "ndjson"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn small_df() -> DataFrame {
        df!(
            "0" => [0u32, 3],
            "1" => [1u32, 0],
            "2" => [0u32, 2],
        )
        .unwrap()
    }

    #[test]
    fn thread_pool_size_is_respected() {
        let n = run_with_threads(3, rayon::current_num_threads).unwrap();
        assert_eq!(n, 3);
    }

    #[test]
    fn csv_has_no_header() {
        let dir = TempDir::new("plecfp-utils").unwrap();
        let path = dir.path().join("nested/out.csv");
        write_df_to_file(&mut small_df(), &path, DataFrameFileType::Csv).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "0,1,0\n3,0,2\n");
    }

    #[test]
    fn other_formats_write_something() {
        let dir = TempDir::new("plecfp-utils").unwrap();
        for file_type in [
            DataFrameFileType::Parquet,
            DataFrameFileType::Json,
            DataFrameFileType::NDJson,
        ] {
            let path = dir.path().join(format!("out.{file_type}"));
            write_df_to_file(&mut small_df(), &path, file_type).unwrap();
            assert!(std::fs::metadata(&path).unwrap().len() > 0);
        }
    }

    #[test]
    fn unwritable_destination_fails_loudly() {
        let dir = TempDir::new("plecfp-utils").unwrap();
        // A regular file cannot act as a parent directory
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let err = write_df_to_file(
            &mut small_df(),
            &blocker.join("out.csv"),
            DataFrameFileType::Csv,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
