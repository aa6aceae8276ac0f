use crate::core::identify::ImageInfo;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Latest fingerprint of one file, keyed by its path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    pub filepath: String,
    /// Hex SHA-256 of the file contents; `None` when the file could not be read.
    pub hash: Option<String>,
    pub filesize: Option<u64>,
    pub bitdepth: Option<u32>,
    pub height: Option<u32>,
    pub width: Option<u32>,
    pub uniquecolors: Option<u64>,
    /// RFC 3339 time the record was computed.
    pub timestamp: String,
}

impl FingerprintRecord {
    pub fn new(filepath: impl Into<String>) -> Self {
        Self {
            filepath: filepath.into(),
            hash: None,
            filesize: None,
            bitdepth: None,
            height: None,
            width: None,
            uniquecolors: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_image_info(mut self, info: ImageInfo) -> Self {
        self.bitdepth = Some(info.bitdepth);
        self.height = Some(info.height);
        self.width = Some(info.width);
        self.uniquecolors = Some(info.unique_colors);
        self
    }

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            filepath: row.get("filepath")?,
            hash: row.get("hash")?,
            filesize: row.get::<_, Option<i64>>("filesize")?.map(|v| v as u64),
            bitdepth: row.get("bitdepth")?,
            height: row.get("height")?,
            width: row.get("width")?,
            uniquecolors: row.get::<_, Option<i64>>("uniquecolors")?.map(|v| v as u64),
            timestamp: row.get("timestamp")?,
        })
    }
}
