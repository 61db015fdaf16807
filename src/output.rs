//! Whole-file output: payloads are staged next to the target and renamed into place.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Creates missing parent directories, writes `<name>.tmp`, syncs and renames.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid output path: {}", path.display()),
            )
        })?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));

    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    fs::rename(tmp_path, path)
}

/// Serializes every row into an in-memory CSV buffer with a header line.
pub fn csv_bytes<T: serde::Serialize>(
    rows: impl IntoIterator<Item = T>,
) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn replaces_existing_file_and_leaves_no_staging_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested/out.csv");

        write_atomic(&path, b"first\n").unwrap();
        write_atomic(&path, b"second\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second\n");
        assert!(!temp.path().join("nested/out.csv.tmp").exists());
    }

    #[test]
    fn rejects_paths_without_file_name() {
        let err = write_atomic(Path::new("/"), b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn csv_bytes_writes_header_once() {
        #[derive(serde::Serialize)]
        struct Row {
            returns: f64,
        }
        let bytes = csv_bytes([Row { returns: 0.5 }, Row { returns: -0.25 }]).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "returns\n0.5\n-0.25\n");
    }
}
