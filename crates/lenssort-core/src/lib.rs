pub mod cancel;
pub mod collision;
pub mod error;
pub mod events;
pub mod index;
pub mod logging;
pub mod media;
pub mod metadata;
pub mod naming;
pub mod relocate;
pub mod scan;
pub mod thumbs;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use rayon::prelude::*;

pub use cancel::CancellationToken;
pub use error::OrganizeError;
pub use index::{Catalogue, IndexRecord, INDEX_FILENAME};
pub use media::{MediaItem, MediaKind};
pub use metadata::{ExiftoolReader, MetadataReader};
pub use thumbs::ThumbnailRenderer;

/// Options for one organization run.
#[derive(Debug, Clone)]
pub struct OrganizeOptions {
    /// Inbox directory scanned for unorganized media.
    pub input: PathBuf,
    /// Archive root receiving the dated tree and the catalogue.
    pub output: PathBuf,
    /// Plan only: compute and report destinations, mutate nothing.
    pub dry_run: bool,
    pub skip_thumbnails: bool,
}

/// Per-date batch counts, the unit of event labeling.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateGroup {
    pub photos: u64,
    pub videos: u64,
}

/// A relocation the pipeline would perform, reported in dry-run mode.
#[derive(Debug, Clone)]
pub struct PlannedMove {
    pub original_name: String,
    pub destination: PathBuf,
}

/// Explicit run outcome, accumulated by the pipeline and handed back to the
/// caller instead of being tallied on a shared logger.
#[derive(Debug, Default)]
pub struct OrganizeReport {
    pub photos_processed: u64,
    pub videos_processed: u64,
    pub thumbnails: u64,
    pub warnings: u64,
    pub errors: u64,
    /// Capture dates seen in this batch, with per-kind counts.
    pub date_groups: BTreeMap<String, DateGroup>,
    /// Dry-run plan; empty on a real run.
    pub planned: Vec<PlannedMove>,
    /// True when the run was cancelled after some files were already moved.
    pub interrupted: bool,
}

impl OrganizeReport {
    /// Log a warning and count it toward the final report.
    pub fn warn(&mut self, message: impl AsRef<str>) {
        self.warnings += 1;
        log::warn!("{}", message.as_ref());
    }

    /// Log an error and count it toward the final report.
    pub fn error(&mut self, message: impl AsRef<str>) {
        self.errors += 1;
        log::error!("{}", message.as_ref());
    }
}

/// Type alias for progress callback: (stage, current, total, message).
pub type ProgressCallback = dyn Fn(&str, u64, u64, &str) + Send + Sync;

/// Throttled progress reporter — emits at most every 200ms or on completion.
pub struct ThrottledProgress<'a> {
    inner: &'a ProgressCallback,
    last_emit: Mutex<Instant>,
}

impl<'a> ThrottledProgress<'a> {
    pub fn new(inner: &'a ProgressCallback) -> Self {
        Self {
            inner,
            last_emit: Mutex::new(Instant::now() - std::time::Duration::from_secs(1)),
        }
    }

    pub fn report(&self, stage: &str, current: u64, total: u64, message: &str) {
        let is_done = current + 1 >= total;
        if !is_done {
            let mut last = self.last_emit.lock().unwrap();
            if last.elapsed().as_millis() < 200 {
                return;
            }
            *last = Instant::now();
        }
        (self.inner)(stage, current, total, message);
    }
}

/// Run the organization pipeline: scan the inbox, resolve capture metadata,
/// relocate into the dated tree, generate thumbnails, reconcile the
/// catalogue. Event labeling is a separate phase (`events::annotate_events`)
/// driven by the caller on the persisted state.
pub fn organize(
    options: &OrganizeOptions,
    reader: &dyn MetadataReader,
    renderers: &[Box<dyn ThumbnailRenderer>],
    cancel: Option<&CancellationToken>,
    progress_callback: &ProgressCallback,
) -> anyhow::Result<OrganizeReport> {
    let tp = ThrottledProgress::new(progress_callback);
    let mut report = OrganizeReport::default();

    // Stage 1: Scan the inbox
    let mut items = scan::scan_inbox(&options.input)?;
    if items.is_empty() {
        log::info!("no photos or videos found, nothing to do");
        return Ok(report);
    }

    if let Some(token) = cancel {
        token.check()?;
    }

    // Stage 2: Resolve metadata. Each external call is independent, so this
    // runs on the worker pool; moves start only once every file is resolved.
    let total = items.len() as u64;
    let counter = AtomicU64::new(0);
    items.par_iter_mut().for_each(|item| {
        match reader.resolve(&item.source_path) {
            Some(capture) => {
                item.timestamp = Some(capture.timestamp);
                item.camera = capture.camera;
            }
            None => {
                item.timestamp = metadata::mtime_timestamp(&item.source_path);
                item.mtime_fallback = true;
            }
        }
        let current = counter.fetch_add(1, Ordering::Relaxed);
        tp.report("metadata", current, total, &item.original_name);
    });

    // Fallback accounting happens sequentially, after the parallel pass.
    for item in &items {
        if item.mtime_fallback {
            if item.timestamp.is_some() {
                report.warn(format!(
                    "no usable metadata, using file modification time: {}",
                    item.original_name
                ));
            } else {
                report.error(format!(
                    "no timestamp available for {}, skipping",
                    item.original_name
                ));
            }
        }
    }

    if let Some(token) = cancel {
        token.check()?;
    }

    // Stage 3: Derive destinations and date groups.
    let mut plan: Vec<(MediaItem, PathBuf)> = Vec::with_capacity(items.len());
    for item in items {
        let Some(ts) = item.timestamp else {
            continue;
        };
        let dir = naming::destination_dir(&options.output, ts, item.kind);
        let name = naming::destination_name(ts, &item.original_name);
        let group = report
            .date_groups
            .entry(ts.format("%Y-%m-%d").to_string())
            .or_default();
        match item.kind {
            MediaKind::Photo => group.photos += 1,
            MediaKind::Video => group.videos += 1,
        }
        plan.push((item, dir.join(name)));
    }

    if options.dry_run {
        for (item, destination) in &plan {
            log::info!("[dry-run] {} -> {}", item.original_name, destination.display());
            report.planned.push(PlannedMove {
                original_name: item.original_name.clone(),
                destination: destination.clone(),
            });
        }
        return Ok(report);
    }

    // Stage 4: Relocate, sequentially. Collision probing depends on the
    // moves landing in order; a cancel request takes effect between files.
    let move_total = plan.len() as u64;
    let mut archived: Vec<(IndexRecord, PathBuf)> = Vec::new();
    for (i, (item, desired)) in plan.iter().enumerate() {
        if let Some(token) = cancel {
            if token.check().is_err() {
                report.interrupted = true;
                report.warn("interrupted, stopping before the next move");
                break;
            }
        }
        tp.report("move", i as u64, move_total, &item.original_name);

        let Some(ts) = item.timestamp else {
            continue;
        };
        match relocate::move_item(item, desired, &mut report) {
            Ok(final_path) => {
                match item.kind {
                    MediaKind::Photo => report.photos_processed += 1,
                    MediaKind::Video => report.videos_processed += 1,
                }
                let path = final_path
                    .strip_prefix(&options.output)
                    .unwrap_or(&final_path)
                    .to_string_lossy()
                    .replace('\\', "/");
                let new_name = final_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                archived.push((
                    IndexRecord {
                        original_name: item.original_name.clone(),
                        new_name,
                        path,
                        thumbnail: None,
                        timestamp: ts,
                        kind: item.kind,
                        size_bytes: item.size_bytes,
                        camera: item.camera.clone(),
                    },
                    final_path,
                ));
            }
            Err(e) => report.error(format!("failed to archive {}: {}", item.original_name, e)),
        }
    }

    // Stage 5: Thumbnails for archived photos, best effort.
    if !options.skip_thumbnails && !report.interrupted {
        let photo_total = archived
            .iter()
            .filter(|(r, _)| r.kind == MediaKind::Photo)
            .count() as u64;
        let mut done = 0u64;
        for (record, final_path) in archived.iter_mut() {
            if record.kind != MediaKind::Photo {
                continue;
            }
            if let Some(token) = cancel {
                if token.check().is_err() {
                    report.interrupted = true;
                    break;
                }
            }
            tp.report("thumbnails", done, photo_total, &record.new_name);
            done += 1;

            match thumbs::generate(renderers, final_path) {
                Some(thumb) => {
                    record.thumbnail = Some(
                        thumb
                            .strip_prefix(&options.output)
                            .unwrap_or(&thumb)
                            .to_string_lossy()
                            .replace('\\', "/"),
                    );
                    report.thumbnails += 1;
                }
                None => report.warn(format!("no thumbnail for {}", record.new_name)),
            }
        }
    }

    // Stage 6: Reconcile the catalogue. This runs even after an interrupt so
    // files already moved stay indexed; a write failure never rolls back
    // moves.
    if !archived.is_empty() {
        let mut catalogue = Catalogue::load(&options.output);
        let batch = archived.into_iter().map(|(r, _)| r).collect();
        catalogue.reconcile(batch, chrono::Local::now().naive_local());
        if let Err(e) = catalogue.persist(&options.output) {
            report.error(format!(
                "failed to write catalogue (moved files stay in place): {}",
                e
            ));
        }
    }

    Ok(report)
}
