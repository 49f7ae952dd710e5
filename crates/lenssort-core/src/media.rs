use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Camera model recorded when metadata is unavailable.
pub const UNKNOWN_CAMERA: &str = "Unknown";

const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    /// Classify by extension, case-insensitive.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let lower = ext.to_lowercase();
        if PHOTO_EXTENSIONS.contains(&lower.as_str()) {
            Some(MediaKind::Photo)
        } else if VIDEO_EXTENSIONS.contains(&lower.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// Subdirectory name inside a date folder.
    pub fn folder_name(self) -> &'static str {
        match self {
            MediaKind::Photo => "photos",
            MediaKind::Video => "videos",
        }
    }
}

/// Classify a path by its extension, or None if it is not archivable media.
pub fn classify(path: &Path) -> Option<MediaKind> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(MediaKind::from_extension)
}

/// One file discovered in the inbox.
#[derive(Debug, Clone)]
pub struct MediaItem {
    pub source_path: PathBuf,
    pub kind: MediaKind,
    /// Base file name including extension; the identity key in the catalogue.
    pub original_name: String,
    pub size_bytes: u64,
    /// Resolved capture time; None until metadata resolution runs.
    pub timestamp: Option<NaiveDateTime>,
    pub camera: String,
    /// True when the timestamp came from the filesystem, not metadata.
    pub mtime_fallback: bool,
}

impl MediaItem {
    pub fn new(source_path: PathBuf, kind: MediaKind, size_bytes: u64) -> Self {
        let original_name = source_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Self {
            source_path,
            kind,
            original_name,
            size_bytes,
            timestamp: None,
            camera: UNKNOWN_CAMERA.to_string(),
            mtime_fallback: false,
        }
    }
}
