use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::media::MediaKind;

/// Canonical destination file name: `YYYYMMDD_HHMMSS_<stem>.<EXT>`.
/// The original stem is kept verbatim so camera sequence numbers survive;
/// only the extension casing is normalized.
pub fn destination_name(timestamp: NaiveDateTime, original_name: &str) -> String {
    let path = Path::new(original_name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(original_name);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_uppercase())
        .unwrap_or_default();

    if ext.is_empty() {
        format!("{}_{}", timestamp.format("%Y%m%d_%H%M%S"), stem)
    } else {
        format!("{}_{}.{}", timestamp.format("%Y%m%d_%H%M%S"), stem, ext)
    }
}

/// Destination directory: `root/YYYY/MM/YYYY-MM-DD/{photos|videos}`.
pub fn destination_dir(root: &Path, timestamp: NaiveDateTime, kind: MediaKind) -> PathBuf {
    root.join(timestamp.format("%Y").to_string())
        .join(timestamp.format("%m").to_string())
        .join(timestamp.format("%Y-%m-%d").to_string())
        .join(kind.folder_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 2, 26)
            .unwrap()
            .and_hms_opt(7, 41, 4)
            .unwrap()
    }

    #[test]
    fn test_destination_name() {
        assert_eq!(
            destination_name(ts(), "IMG_0001.JPG"),
            "20250226_074104_IMG_0001.JPG"
        );
        // Lowercase extensions are uppercased, stem untouched.
        assert_eq!(
            destination_name(ts(), "c0001.mp4"),
            "20250226_074104_c0001.MP4"
        );
    }

    #[test]
    fn test_destination_dir() {
        assert_eq!(
            destination_dir(Path::new("/archive"), ts(), MediaKind::Photo),
            Path::new("/archive/2025/02/2025-02-26/photos")
        );
        assert_eq!(
            destination_dir(Path::new("/archive"), ts(), MediaKind::Video),
            Path::new("/archive/2025/02/2025-02-26/videos")
        );
    }

    #[test]
    fn test_naming_is_deterministic() {
        assert_eq!(
            destination_name(ts(), "IMG_0001.JPG"),
            destination_name(ts(), "IMG_0001.JPG")
        );
    }
}
