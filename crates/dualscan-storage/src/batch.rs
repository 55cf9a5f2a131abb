use crate::error::{StorageError, StorageResult};
use crate::unique::create_unique;
use crate::FILE_STAMP_FORMAT;
use chrono::{DateTime, Local};
use dualscan_engine::{PersistenceSink, SinkError};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// `ReceivedCodes_YYYYMMDD_HHMMSS.txt`
pub fn batch_file_name(at: DateTime<Local>) -> String {
    format!("ReceivedCodes_{}.txt", at.format(FILE_STAMP_FORMAT))
}

/// Writes each drained batch to a new file, one record per line.
#[derive(Debug, Clone)]
pub struct BatchFileSink {
    dir: PathBuf,
}

impl BatchFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `records` to a fresh batch file.
    ///
    /// Returns `None` without touching the disk when `records` is empty.
    pub fn write_batch(&self, records: &[String]) -> StorageResult<Option<PathBuf>> {
        if records.is_empty() {
            info!("No codes to save");
            return Ok(None);
        }

        fs::create_dir_all(&self.dir).map_err(|source| StorageError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let name = batch_file_name(Local::now());
        let path = write_lines(&self.dir, &name, records).map_err(|source| {
            StorageError::Write {
                path: self.dir.join(&name),
                source,
            }
        })?;

        info!(path = %path.display(), records = records.len(), "Saved codes");
        Ok(Some(path))
    }
}

impl PersistenceSink for BatchFileSink {
    fn save_batch(&self, records: &[String]) -> Result<(), SinkError> {
        self.write_batch(records)?;
        Ok(())
    }
}

/// Batches flushed within the same second get a `_1`, `_2`, ... suffix.
fn write_lines(dir: &Path, name: &str, lines: &[String]) -> std::io::Result<PathBuf> {
    let (file, path) = create_unique(dir, name)?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn test_batch_file_name_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(batch_file_name(at), "ReceivedCodes_20240307_090502.txt");
    }

    #[test]
    fn test_write_batch_one_record_per_line() {
        let dir = tempdir().unwrap();
        let sink = BatchFileSink::new(dir.path().join("records"));

        let records = vec!["p1|a|b".to_string(), "p2|c|d".to_string()];
        let path = sink.write_batch(&records).unwrap().expect("file written");

        assert!(path.starts_with(dir.path().join("records")));
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "p1|a|b\np2|c|d\n");
    }

    #[test]
    fn test_back_to_back_batches_keep_both() {
        let dir = tempdir().unwrap();
        let sink = BatchFileSink::new(dir.path());

        let first = sink
            .write_batch(&["11111111111111111111|a".to_string()])
            .unwrap()
            .expect("first file");
        let second = sink
            .write_batch(&["22222222222222222222|b".to_string()])
            .unwrap()
            .expect("second file");

        assert_ne!(first, second);
        assert_eq!(
            std::fs::read_to_string(&first).unwrap(),
            "11111111111111111111|a\n"
        );
        assert_eq!(
            std::fs::read_to_string(&second).unwrap(),
            "22222222222222222222|b\n"
        );
    }

    #[test]
    fn test_empty_batch_writes_nothing() {
        let dir = tempdir().unwrap();
        let sink = BatchFileSink::new(dir.path().join("records"));

        assert!(sink.save_batch(&[]).is_ok());
        assert!(!dir.path().join("records").exists());
    }

    #[test]
    fn test_unwritable_dir_maps_to_sink_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let sink = BatchFileSink::new(blocker.join("records"));
        let err = sink.save_batch(&["p|a".to_string()]).unwrap_err();
        assert!(err.0.contains("Failed to create directory"));
    }
}
