//! Packaged data source archives
//!
//! A downloaded `.tdsx` is a zip container bundling metadata files and an
//! embedded database file that holds the actual table data. Only that
//! database entry is of interest here.

use eyre::{Context, Result};
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// File extension of the embedded database inside a packaged archive.
pub const DATABASE_EXT: &str = ".hyper";

/// Extract the first embedded database file from a packaged archive.
///
/// Returns `None` when no entry ends in [`DATABASE_EXT`]; callers treat
/// that as a non-fatal, per-target outcome. The entry is written under
/// `scratch_dir` using its final path component only. Files left behind
/// by earlier runs are overwritten when names collide but never purged.
pub fn extract_database(archive: &[u8], scratch_dir: &Path) -> Result<Option<PathBuf>> {
    let mut zip =
        ZipArchive::new(Cursor::new(archive)).context("Failed to open data source archive")?;

    let mut entry_name = None;
    for index in 0..zip.len() {
        if let Some(name) = zip.name_for_index(index) {
            if name.ends_with(DATABASE_EXT) {
                entry_name = Some(name.to_string());
                break;
            }
        }
    }
    let Some(entry_name) = entry_name else {
        return Ok(None);
    };

    // Keep only the file name so a crafted entry path cannot escape the
    // scratch directory.
    let file_name = Path::new(&entry_name)
        .file_name()
        .ok_or_else(|| eyre::eyre!("Archive entry has no file name: {}", entry_name))?;

    fs::create_dir_all(scratch_dir)
        .with_context(|| format!("Failed to create scratch directory: {}", scratch_dir.display()))?;
    let target = scratch_dir.join(file_name);

    let mut entry = zip
        .by_name(&entry_name)
        .with_context(|| format!("Failed to read archive entry: {}", entry_name))?;
    let mut contents = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut contents)
        .with_context(|| format!("Failed to decompress archive entry: {}", entry_name))?;
    fs::write(&target, contents)
        .with_context(|| format!("Failed to write extracted file: {}", target.display()))?;

    log::debug!("Extracted {} to {}", entry_name, target.display());
    Ok(Some(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn build_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buffer = Vec::new();
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap();
        buffer
    }

    #[test]
    fn test_extracts_first_database_entry() {
        let scratch = TempDir::new().unwrap();
        let archive = build_archive(&[
            ("Datasource.tds", b"<xml/>"),
            ("Data/Extracts/events.hyper", b"first"),
            ("Data/Extracts/backup.hyper", b"second"),
        ]);

        let path = extract_database(&archive, scratch.path()).unwrap().unwrap();
        assert_eq!(path, scratch.path().join("events.hyper"));
        assert_eq!(fs::read(&path).unwrap(), b"first");
    }

    #[test]
    fn test_no_database_entry_returns_none() {
        let scratch = TempDir::new().unwrap();
        let archive = build_archive(&[("Datasource.tds", b"<xml/>")]);
        assert!(extract_database(&archive, scratch.path()).unwrap().is_none());
    }

    #[test]
    fn test_overwrites_stale_file_of_same_name() {
        let scratch = TempDir::new().unwrap();
        fs::write(scratch.path().join("events.hyper"), b"stale").unwrap();

        let archive = build_archive(&[("events.hyper", b"fresh")]);
        let path = extract_database(&archive, scratch.path()).unwrap().unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"fresh");
    }

    #[test]
    fn test_garbage_bytes_fail() {
        let scratch = TempDir::new().unwrap();
        assert!(extract_database(b"not a zip", scratch.path()).is_err());
    }
}
