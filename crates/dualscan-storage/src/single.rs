use crate::error::{StorageError, StorageResult};
use crate::unique::create_unique;
use crate::FILE_STAMP_FORMAT;
use chrono::{DateTime, Local};
use dualscan_engine::{AcceptedRecord, RecordObserver};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Subdirectory of the output directory holding per-record files.
pub const SINGLE_RECORD_DIR: &str = "codes";

/// `YYYYMMDD_HHMMSS_<primary>.txt`
pub fn record_file_name(at: DateTime<Local>, primary_code: &str) -> String {
    format!("{}_{}.txt", at.format(FILE_STAMP_FORMAT), primary_code)
}

/// Writes each accepted record to `codes/` as soon as it is accepted.
#[derive(Debug, Clone)]
pub struct SingleRecordWriter {
    dir: PathBuf,
}

impl SingleRecordWriter {
    /// Files go to `<output_dir>/codes`.
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: output_dir.as_ref().join(SINGLE_RECORD_DIR),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, record: &AcceptedRecord) -> StorageResult<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|source| StorageError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let name = record_file_name(Local::now(), &record.primary_code);
        let write = || -> std::io::Result<PathBuf> {
            let (mut file, path) = create_unique(&self.dir, &name)?;
            file.write_all(record.serialized().as_bytes())?;
            Ok(path)
        };
        write().map_err(|source| StorageError::Write {
            path: self.dir.join(&name),
            source,
        })
    }
}

impl RecordObserver for SingleRecordWriter {
    fn on_accepted(&self, record: &AcceptedRecord) {
        match self.write(record) {
            Ok(path) => debug!(path = %path.display(), "Saved record"),
            Err(e) => warn!(error = %e, primary_code = %record.primary_code, "Failed to save record"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn record() -> AcceptedRecord {
        AcceptedRecord {
            primary_code: "12345678901234567890".to_string(),
            aux_codes: vec!["AAA".to_string(), "BBB".to_string()],
        }
    }

    #[test]
    fn test_record_file_name_format() {
        let at = Local.with_ymd_and_hms(2024, 12, 31, 23, 59, 58).unwrap();
        assert_eq!(
            record_file_name(at, "12345678901234567890"),
            "20241231_235958_12345678901234567890.txt"
        );
    }

    #[test]
    fn test_write_single_record() {
        let dir = tempdir().unwrap();
        let writer = SingleRecordWriter::new(dir.path());

        let path = writer.write(&record()).unwrap();
        assert_eq!(path.parent().unwrap(), dir.path().join("codes"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "12345678901234567890|AAA|BBB"
        );
    }

    #[test]
    fn test_same_primary_twice_keeps_both_files() {
        let dir = tempdir().unwrap();
        let writer = SingleRecordWriter::new(dir.path());

        let first = writer.write(&record()).unwrap();
        let second = writer.write(&record()).unwrap();

        assert_ne!(first, second);
        assert_eq!(std::fs::read_dir(writer.dir()).unwrap().count(), 2);
    }

    #[test]
    fn test_observer_failure_does_not_panic() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let writer = SingleRecordWriter::new(&blocker);
        writer.on_accepted(&record());
        assert!(writer.write(&record()).is_err());
    }
}
