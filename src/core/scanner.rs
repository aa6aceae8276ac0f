use crate::core::media::is_media;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid path: {path}")]
    InvalidPath { path: String },

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Announce each directory as it is entered.
    pub verbose: bool,
}

/// Recursively collect every media file below `directory`.
///
/// Entries are returned depth-first in the order the filesystem yields
/// them. Any walk error (unreadable directory, broken entry) aborts the
/// scan. Paths that are not valid UTF-8 are skipped with a warning, since
/// the fingerprint store keys rows by their exact text.
pub fn get_image_files(directory: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>, ScanError> {
    if !directory.is_dir() {
        return Err(ScanError::InvalidPath {
            path: directory.to_string_lossy().to_string(),
        });
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(directory) {
        let entry = entry?;
        let file_type = entry.file_type();

        if file_type.is_dir() {
            if options.verbose {
                info!("Reading directory \"{}\"", entry.path().display());
            } else {
                debug!("Reading directory \"{}\"", entry.path().display());
            }
        } else if file_type.is_file() && is_media(entry.path()) {
            if entry.path().to_str().is_none() {
                warn!("Skipping non UTF-8 path {}", entry.path().display());
                continue;
            }
            images.push(entry.into_path());
        }
    }

    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"data").unwrap();
    }

    #[test]
    fn test_finds_media_recursively() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(&root.join("a.jpg"));
        touch(&root.join("nested/b.PNG"));
        touch(&root.join("nested/deeper/c.mov"));
        touch(&root.join("nested/notes.txt"));
        touch(&root.join("README"));

        let mut found = get_image_files(root, &ScanOptions::default()).unwrap();
        found.sort();

        let mut expected = vec![
            root.join("a.jpg"),
            root.join("nested/b.PNG"),
            root.join("nested/deeper/c.mov"),
        ];
        expected.sort();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_directory_named_like_media_is_descended() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(&root.join("album.jpg/inner.gif"));

        let found = get_image_files(root, &ScanOptions::default()).unwrap();
        assert_eq!(found, vec![root.join("album.jpg/inner.gif")]);
    }

    #[test]
    fn test_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let found = get_image_files(temp_dir.path(), &ScanOptions::default()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_missing_directory_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        let result = get_image_files(&missing, &ScanOptions::default());
        assert!(matches!(result, Err(ScanError::InvalidPath { .. })));
    }

    #[test]
    fn test_stable_within_invocation() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        for name in ["x.jpg", "y.jpg", "sub/z.jpg"] {
            touch(&root.join(name));
        }
        let options = ScanOptions { verbose: true };
        let first = get_image_files(root, &options).unwrap();
        let second = get_image_files(root, &options).unwrap();
        assert_eq!(first, second);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_names_are_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(&root.join("ok.jpg"));
        touch(&root.join(OsStr::from_bytes(b"\xfe.jpg")));
        touch(&root.join(OsStr::from_bytes(b"\xff.jpg")));

        let found = get_image_files(root, &ScanOptions::default()).unwrap();
        assert_eq!(found, vec![root.join("ok.jpg")]);
    }
}
