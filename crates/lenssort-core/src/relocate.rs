use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use filetime::FileTime;

use crate::collision;
use crate::error::OrganizeError;
use crate::media::{MediaItem, MediaKind};
use crate::OrganizeReport;

/// Companion metadata file pattern for camera videos: `C0001.MP4` carries
/// `C0001M01.XML` in the same directory.
const SIDECAR_SUFFIX: &str = "M01.XML";

/// Move one item to its desired destination, resolving name collisions and
/// carrying any video sidecar along. Returns the final destination path.
pub fn move_item(
    item: &MediaItem,
    desired: &Path,
    report: &mut OrganizeReport,
) -> Result<PathBuf, OrganizeError> {
    let io_err = |source| OrganizeError::Move {
        path: item.source_path.clone(),
        source,
    };

    if let Some(parent) = desired.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let (final_path, renamed) = collision::resolve_collision(desired)?;
    if renamed {
        report.warn(format!(
            "name collision for {}, renamed to {}",
            item.original_name,
            final_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        ));
    }

    move_file(&item.source_path, &final_path).map_err(io_err)?;
    log::debug!(
        "moved {} -> {}",
        item.original_name,
        final_path.display()
    );

    if item.kind == MediaKind::Video {
        move_sidecar(&item.source_path, &final_path, report);
    }

    Ok(final_path)
}

/// Rename, falling back to copy+delete when the destination is on another
/// filesystem. The fallback keeps the source mtime on the copy.
fn move_file(source: &Path, dest: &Path) -> io::Result<()> {
    match fs::rename(source, dest) {
        Ok(()) => Ok(()),
        Err(_) => {
            let mtime = fs::metadata(source).and_then(|m| m.modified()).ok();
            fs::copy(source, dest)?;
            if let Some(t) = mtime {
                let _ = filetime::set_file_mtime(dest, FileTime::from_system_time(t));
            }
            fs::remove_file(source)
        }
    }
}

/// Relocate the sidecar next to the moved video, renamed to the final
/// (post-collision) stem. Failure here never fails the primary move.
fn move_sidecar(source: &Path, final_dest: &Path, report: &mut OrganizeReport) {
    let Some(stem) = source.file_stem().and_then(|s| s.to_str()) else {
        return;
    };
    let sidecar_source = source.with_file_name(format!("{}{}", stem, SIDECAR_SUFFIX));
    if !sidecar_source.exists() {
        return;
    }

    let Some(final_stem) = final_dest.file_stem().and_then(|s| s.to_str()) else {
        return;
    };
    let sidecar_dest = final_dest.with_file_name(format!("{}{}", final_stem, SIDECAR_SUFFIX));

    match move_file(&sidecar_source, &sidecar_dest) {
        Ok(()) => log::debug!("moved sidecar {}", sidecar_dest.display()),
        Err(e) => report.warn(format!(
            "failed to move sidecar {}: {}",
            sidecar_source.display(),
            e
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn item(path: PathBuf, kind: MediaKind) -> MediaItem {
        let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        MediaItem::new(path, kind, size)
    }

    #[test]
    fn test_move_creates_directories() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("IMG_0001.JPG");
        fs::write(&src, b"jpeg").unwrap();

        let desired = dir.path().join("2025/02/2025-02-26/photos/x.JPG");
        let mut report = OrganizeReport::default();
        let moved = move_item(&item(src.clone(), MediaKind::Photo), &desired, &mut report).unwrap();

        assert_eq!(moved, desired);
        assert!(!src.exists());
        assert_eq!(fs::read(&moved).unwrap(), b"jpeg");
        assert_eq!(report.warnings, 0);
    }

    #[test]
    fn test_collision_renames_and_warns() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("IMG_0001.JPG");
        fs::write(&src, b"new").unwrap();

        let desired = dir.path().join("out/x.JPG");
        fs::create_dir_all(desired.parent().unwrap()).unwrap();
        fs::write(&desired, b"old").unwrap();

        let mut report = OrganizeReport::default();
        let moved = move_item(&item(src, MediaKind::Photo), &desired, &mut report).unwrap();

        assert_eq!(moved, dir.path().join("out/x_1.JPG"));
        assert_eq!(fs::read(&desired).unwrap(), b"old");
        assert_eq!(report.warnings, 1);
    }

    #[test]
    fn test_video_sidecar_follows_final_stem() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("C0001.MP4");
        fs::write(&src, b"mp4").unwrap();
        fs::write(dir.path().join("C0001M01.XML"), b"<xml/>").unwrap();

        let desired = dir.path().join("out/20250226_074104_C0001.MP4");
        fs::create_dir_all(desired.parent().unwrap()).unwrap();
        fs::write(&desired, b"taken").unwrap();

        let mut report = OrganizeReport::default();
        let moved = move_item(&item(src, MediaKind::Video), &desired, &mut report).unwrap();

        assert_eq!(moved, dir.path().join("out/20250226_074104_C0001_1.MP4"));
        let sidecar = dir.path().join("out/20250226_074104_C0001_1M01.XML");
        assert_eq!(fs::read(&sidecar).unwrap(), b"<xml/>");
        assert!(!dir.path().join("C0001M01.XML").exists());
    }

    #[test]
    fn test_photo_never_looks_for_sidecar() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("IMG_0001.JPG");
        fs::write(&src, b"jpeg").unwrap();
        fs::write(dir.path().join("IMG_0001M01.XML"), b"<xml/>").unwrap();

        let desired = dir.path().join("out/x.JPG");
        let mut report = OrganizeReport::default();
        move_item(&item(src, MediaKind::Photo), &desired, &mut report).unwrap();

        assert!(dir.path().join("IMG_0001M01.XML").exists());
    }
}
