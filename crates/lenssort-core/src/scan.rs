use std::path::Path;

use walkdir::WalkDir;

use crate::media::{self, MediaItem, MediaKind};

/// Recursively scan the inbox for archivable photos and videos.
/// macOS resource-fork files (`._` prefix) are always skipped.
pub fn scan_inbox(input: &Path) -> anyhow::Result<Vec<MediaItem>> {
    if !input.is_dir() {
        anyhow::bail!("inbox directory does not exist: {}", input.display());
    }

    let mut items = Vec::new();
    for entry in WalkDir::new(input) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if name.starts_with("._") {
            continue;
        }

        let Some(kind) = media::classify(entry.path()) else {
            continue;
        };

        let size = match entry.metadata() {
            Ok(meta) => meta.len(),
            Err(e) => {
                log::warn!("cannot stat {}: {}", entry.path().display(), e);
                continue;
            }
        };

        items.push(MediaItem::new(entry.path().to_path_buf(), kind, size));
    }

    let photos = items.iter().filter(|i| i.kind == MediaKind::Photo).count();
    let videos = items.len() - photos;
    log::info!("found {} photos, {} videos", photos, videos);

    Ok(items)
}
