use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;

/// Fixed thumbnail width; height follows the source aspect ratio.
pub const THUMBNAIL_MAX_WIDTH: u32 = 300;

const SIPS_TIMEOUT: Duration = Duration::from_secs(30);

/// An image-resize capability. Renderers are probed in order at generation
/// time; any one succeeding is enough.
pub trait ThumbnailRenderer {
    fn name(&self) -> &'static str;
    fn render(&self, source: &Path, dest: &Path, max_width: u32) -> anyhow::Result<()>;
}

/// In-process resize via the `image` crate.
pub struct ImageRenderer;

impl ThumbnailRenderer for ImageRenderer {
    fn name(&self) -> &'static str {
        "image"
    }

    fn render(&self, source: &Path, dest: &Path, max_width: u32) -> anyhow::Result<()> {
        let img = image::open(source)?;
        let height = ((img.height() as u64 * max_width as u64) / img.width().max(1) as u64)
            .max(1) as u32;
        let resized = img.resize_exact(max_width, height, FilterType::Lanczos3);

        let out = BufWriter::new(File::create(dest)?);
        let encoder = JpegEncoder::new_with_quality(out, 85);
        resized.to_rgb8().write_with_encoder(encoder)?;
        Ok(())
    }
}

/// Copy the source next to the thumbnail slot and shrink it in place with
/// the external `sips` tool (macOS).
pub struct SipsRenderer {
    timeout: Duration,
}

impl Default for SipsRenderer {
    fn default() -> Self {
        Self {
            timeout: SIPS_TIMEOUT,
        }
    }
}

impl ThumbnailRenderer for SipsRenderer {
    fn name(&self) -> &'static str {
        "sips"
    }

    fn render(&self, source: &Path, dest: &Path, max_width: u32) -> anyhow::Result<()> {
        fs::copy(source, dest)?;

        let result = (|| -> anyhow::Result<()> {
            let mut child = Command::new("sips")
                .arg("-Z")
                .arg(max_width.to_string())
                .arg(dest)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()?;

            let start = Instant::now();
            let status = loop {
                match child.try_wait()? {
                    Some(status) => break status,
                    None => {
                        if start.elapsed() >= self.timeout {
                            let _ = child.kill();
                            let _ = child.wait();
                            anyhow::bail!("sips timed out");
                        }
                        std::thread::sleep(Duration::from_millis(50));
                    }
                }
            };
            if !status.success() {
                anyhow::bail!("sips exited with {}", status);
            }
            Ok(())
        })();

        if result.is_err() {
            let _ = fs::remove_file(dest);
        }
        result
    }
}

/// Renderer chain probed for every photo: in-process resize first, `sips`
/// as the platform fallback.
pub fn default_renderers() -> Vec<Box<dyn ThumbnailRenderer>> {
    vec![Box::new(ImageRenderer), Box::new(SipsRenderer::default())]
}

/// Thumbnail slot for an archived photo: `thumbnails/<stem>_thumb.jpg` in
/// the date folder, sibling of `photos/` and `videos/`.
pub fn thumbnail_path(archived: &Path) -> Option<PathBuf> {
    let stem = archived.file_stem()?.to_str()?;
    let date_dir = archived.parent()?.parent()?;
    Some(
        date_dir
            .join("thumbnails")
            .join(format!("{}_thumb.jpg", stem)),
    )
}

/// Generate a thumbnail for one archived photo, trying each renderer in
/// turn. Returns the thumbnail path, or None when every renderer failed.
pub fn generate(renderers: &[Box<dyn ThumbnailRenderer>], archived: &Path) -> Option<PathBuf> {
    let thumb = thumbnail_path(archived)?;
    if let Some(parent) = thumb.parent() {
        fs::create_dir_all(parent).ok()?;
    }

    for renderer in renderers {
        match renderer.render(archived, &thumb, THUMBNAIL_MAX_WIDTH) {
            Ok(()) => {
                log::debug!("thumbnail ({}): {}", renderer.name(), thumb.display());
                return Some(thumb);
            }
            Err(e) => {
                log::debug!(
                    "{} renderer failed for {}: {}",
                    renderer.name(),
                    archived.display(),
                    e
                );
                let _ = fs::remove_file(&thumb);
            }
        }
    }
    None
}
