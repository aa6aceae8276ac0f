use std::path::Path;

/// Extensions treated as media. Raster and vector image formats first,
/// then the video containers commonly produced by cameras.
pub const MEDIA_EXTENSIONS: &[&str] = &[
    "3fr", "ari", "arw", "bay", "bmp", "cap", "cr2", "cr3", "crw", "dcr", "dcs", "dng", "drf",
    "eip", "erf", "fff", "gif", "heic", "heif", "ico", "iiq", "jfif", "jpe", "jpeg", "jpg", "jxr",
    "k25", "kdc", "mef", "mos", "mrw", "nef", "nrw", "obm", "orf", "pef", "png", "psd", "ptx",
    "pxn", "r3d", "raf", "raw", "rw2", "rwl", "rwz", "sr2", "srf", "srw", "svg", "tga", "tif",
    "tiff", "webp", "x3f",
    // video
    "mp4", "avi", "mpg", "mpeg", "mts", "mov",
];

/// Lower-cased extension of `path` without the leading dot, or an empty
/// string when there is none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Whether `path` names a media file, judged by its extension alone.
pub fn is_media(path: impl AsRef<Path>) -> bool {
    let ext = extension_of(path.as_ref());
    !ext.is_empty() && MEDIA_EXTENSIONS.contains(&ext.as_str())
}
