use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

/// Suffixes tried before giving up on a name.
const MAX_SUFFIX: u32 = 1000;

/// Create `dir/name`, or `dir/<stem>_<n>.<ext>` if that already exists.
///
/// Existing files are never truncated.
pub(crate) fn create_unique(dir: &Path, name: &str) -> io::Result<(File, PathBuf)> {
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (name, None),
    };

    for n in 0..MAX_SUFFIX {
        let candidate = match (n, ext) {
            (0, _) => name.to_string(),
            (n, Some(ext)) => format!("{stem}_{n}.{ext}"),
            (n, None) => format!("{stem}_{n}"),
        };
        let path = dir.join(candidate);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((file, path)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free file name for {name}"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_collisions_get_counter_suffix() {
        let dir = tempdir().unwrap();
        let (_, first) = create_unique(dir.path(), "batch.txt").unwrap();
        let (_, second) = create_unique(dir.path(), "batch.txt").unwrap();
        let (_, third) = create_unique(dir.path(), "batch.txt").unwrap();

        assert_eq!(first, dir.path().join("batch.txt"));
        assert_eq!(second, dir.path().join("batch_1.txt"));
        assert_eq!(third, dir.path().join("batch_2.txt"));
    }

    #[test]
    fn test_existing_file_is_left_alone() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("batch.txt"), "keep").unwrap();

        create_unique(dir.path(), "batch.txt").unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("batch.txt")).unwrap(),
            "keep"
        );
    }
}
