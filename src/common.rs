use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

pub fn write_string_to_file(filename: &str, content: &str) -> std::io::Result<()> {
    let path = Path::new(filename);
    create_path_if_not_exists(path)?;
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Creates the parent directories of `path` when missing
pub fn create_path_if_not_exists(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Writes to a temporary file next to `path`, then renames it into place.
/// Readers never observe a partially written file.
pub fn write_bytes_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    create_path_if_not_exists(path)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("out.csv");

        write_bytes_atomically(&target, b"question,answer\n").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"question,answer\n");

        write_bytes_atomically(&target, b"replaced").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "replaced");

        let leftovers: Vec<_> = fs::read_dir(target.parent().unwrap())
            .unwrap()
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn write_string_to_file_writes_content() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("plan.yaml");
        write_string_to_file(target.to_str().unwrap(), "meta: {}\n").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "meta: {}\n");
    }
}
