use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use regex::Regex;
use serde::Deserialize;

use crate::media::UNKNOWN_CAMERA;

/// Hard limit on one metadata tool invocation.
const TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Capture timestamp and camera model resolved for one file.
#[derive(Debug, Clone)]
pub struct Capture {
    pub timestamp: NaiveDateTime,
    pub camera: String,
}

/// Source of embedded metadata. Injectable so the pipeline can run against
/// scripted captures in tests and against exiftool in production.
pub trait MetadataReader: Sync {
    /// Resolve capture info for a file, or None when nothing usable exists.
    fn resolve(&self, path: &Path) -> Option<Capture>;
}

/// Fields requested from exiftool. Timestamp priority is strictly
/// DateTimeOriginal, then CreateDate, then FileModifyDate.
#[derive(Debug, Deserialize)]
struct ExifFields {
    #[serde(rename = "DateTimeOriginal")]
    date_time_original: Option<String>,
    #[serde(rename = "CreateDate")]
    create_date: Option<String>,
    #[serde(rename = "FileModifyDate")]
    file_modify_date: Option<String>,
    #[serde(rename = "Model")]
    model: Option<String>,
}

/// Reads metadata by invoking the external `exiftool` binary per file.
pub struct ExiftoolReader {
    timeout: Duration,
}

impl Default for ExiftoolReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ExiftoolReader {
    pub fn new() -> Self {
        Self {
            timeout: TOOL_TIMEOUT,
        }
    }

    fn run_tool(&self, path: &Path) -> Option<String> {
        let mut child = match Command::new("exiftool")
            .args(["-json", "-DateTimeOriginal", "-CreateDate", "-FileModifyDate", "-Model"])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(c) => c,
            Err(e) => {
                log::warn!("cannot run exiftool: {}", e);
                return None;
            }
        };

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() >= self.timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        log::error!("exiftool timed out: {}", path.display());
                        return None;
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    log::warn!("exiftool wait failed for {}: {}", path.display(), e);
                    return None;
                }
            }
        };

        if !status.success() {
            log::warn!("exiftool reported an error for {}", path.display());
            return None;
        }

        // The four requested fields are far below pipe-buffer size, so the
        // output can be drained after exit without risking a stall.
        let mut output = String::new();
        child.stdout.take()?.read_to_string(&mut output).ok()?;
        Some(output)
    }
}

impl MetadataReader for ExiftoolReader {
    fn resolve(&self, path: &Path) -> Option<Capture> {
        let output = self.run_tool(path)?;
        capture_from_json(output.as_bytes(), path)
    }
}

/// Parse exiftool's JSON array output into a capture, applying the field
/// priority and timestamp layout tolerance.
fn capture_from_json(bytes: &[u8], path: &Path) -> Option<Capture> {
    let entries: Vec<ExifFields> = match serde_json::from_slice(bytes) {
        Ok(e) => e,
        Err(e) => {
            log::warn!("unreadable exiftool output for {}: {}", path.display(), e);
            return None;
        }
    };
    let fields = entries.into_iter().next()?;

    let camera = fields
        .model
        .clone()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_CAMERA.to_string());

    let raw = [
        fields.date_time_original,
        fields.create_date,
        fields.file_modify_date,
    ]
    .into_iter()
    .flatten()
    .find(|s| !s.trim().is_empty())?;

    match parse_timestamp(&raw) {
        Some(timestamp) => Some(Capture { timestamp, camera }),
        None => {
            log::warn!("unparseable timestamp {:?} for {}", raw, path.display());
            None
        }
    }
}

static TZ_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:Z|[+-]\d{2}:?\d{2})\s*$").unwrap());

/// Parse a metadata timestamp. Accepts colon- and hyphen-delimited dates;
/// a trailing timezone offset is discarded, not converted.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let cleaned = TZ_SUFFIX_RE.replace(raw.trim(), "");
    let cleaned = cleaned.trim();

    for format in ["%Y:%m:%d %H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(cleaned, format) {
            return Some(dt);
        }
    }
    None
}

/// Filesystem modification time as a local naive timestamp, used as the
/// fallback when metadata resolution fails.
pub fn mtime_timestamp(path: &Path) -> Option<NaiveDateTime> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    let local: chrono::DateTime<chrono::Local> = modified.into();
    Some(local.naive_local())
}
