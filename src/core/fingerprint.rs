use crate::core::hash::compute_content_hash;
use crate::core::identify::identify_image;
use crate::database::models::FingerprintRecord;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Cannot access {path}: {source}")]
    Inaccessible {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("Path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),
}

#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// GraphicsMagick binary used for introspection; `None` skips it.
    pub identify_program: Option<String>,
}

/// Fingerprint the file at `path`.
///
/// Only an inaccessible or non UTF-8 path is an error. A hashing failure leaves
/// `hash` empty and a failed introspection leaves the image fields empty;
/// neither prevents a record from being produced.
pub fn read_image(path: &Path, options: &ReadOptions) -> Result<FingerprintRecord, ReadError> {
    let filepath = path
        .to_str()
        .ok_or_else(|| ReadError::NonUtf8Path(path.to_path_buf()))?;
    let metadata = fs::metadata(path).map_err(|source| ReadError::Inaccessible {
        path: path.to_path_buf(),
        source,
    })?;
    if !metadata.is_file() {
        return Err(ReadError::NotAFile(path.to_path_buf()));
    }

    let mut record = FingerprintRecord::new(filepath);
    record.filesize = Some(metadata.len());

    match compute_content_hash(path) {
        Ok(hash) => record.hash = Some(hash),
        Err(e) => warn!("Could not hash {}: {}", path.display(), e),
    }

    if let Some(program) = &options.identify_program {
        match identify_image(program, path) {
            Ok(info) => record = record.with_image_info(info),
            Err(e) => debug!("Identify skipped for {}: {}", path.display(), e),
        }
    }

    Ok(record)
}
