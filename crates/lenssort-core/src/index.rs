use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::media::MediaKind;

/// Catalogue file at the archive root.
pub const INDEX_FILENAME: &str = "_index.json";

/// One archived file. Identity across runs is `original_name`; a later run
/// archiving a file with the same original name replaces the whole record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    pub original_name: String,
    pub new_name: String,
    /// Archive path relative to the root, forward slashes.
    pub path: String,
    pub thumbnail: Option<String>,
    #[serde(rename = "datetime")]
    pub timestamp: NaiveDateTime,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub size_bytes: u64,
    pub camera: String,
}

/// The persisted catalogue: every archived file plus event labels keyed by
/// `YYYY-MM-DD` date strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalogue {
    pub last_updated: Option<NaiveDateTime>,
    pub total_photos: u64,
    pub total_videos: u64,
    #[serde(rename = "files")]
    pub records: Vec<IndexRecord>,
    #[serde(default)]
    pub events: BTreeMap<String, String>,
}

impl Catalogue {
    /// Load the catalogue from the archive root. A missing file yields an
    /// empty catalogue; an unreadable or corrupt one does too, with a
    /// warning; the damaged file stays untouched until the next persist.
    pub fn load(root: &Path) -> Self {
        let path = root.join(INDEX_FILENAME);
        if !path.exists() {
            return Self::default();
        }

        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) => {
                log::warn!("cannot read {}, starting fresh: {}", path.display(), e);
                return Self::default();
            }
        };
        match serde_json::from_reader(BufReader::new(file)) {
            Ok(cat) => cat,
            Err(e) => {
                log::warn!(
                    "catalogue {} is corrupt, starting fresh (existing file kept until next write): {}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Merge a batch of freshly archived records: upsert by original name,
    /// recompute totals from the full set, re-sort by timestamp. The events
    /// map is left untouched.
    pub fn reconcile(&mut self, batch: Vec<IndexRecord>, now: NaiveDateTime) {
        for record in batch {
            match self
                .records
                .iter_mut()
                .find(|r| r.original_name == record.original_name)
            {
                Some(existing) => *existing = record,
                None => self.records.push(record),
            }
        }

        self.total_photos = self
            .records
            .iter()
            .filter(|r| r.kind == MediaKind::Photo)
            .count() as u64;
        self.total_videos = self.records.len() as u64 - self.total_photos;
        self.records.sort_by_key(|r| r.timestamp);
        self.last_updated = Some(now);
    }

    /// Write the catalogue as indented JSON, via a temp file then rename.
    pub fn persist(&self, root: &Path) -> anyhow::Result<()> {
        let path = root.join(INDEX_FILENAME);
        let temp_path = root.join("_index.tmp");

        let file = File::create(&temp_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        fs::rename(&temp_path, &path)?;

        log::info!("catalogue updated: {} records", self.records.len());
        Ok(())
    }
}
