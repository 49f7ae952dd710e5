use std::path::{Path, PathBuf};

use crate::error::OrganizeError;

/// Upper bound on suffix probing before the file is given up on.
pub const MAX_COLLISION_ATTEMPTS: u32 = 100;

/// Find a destination path that does not already exist. Returns the final
/// path and whether a rename was needed; never overwrites an existing file.
pub fn resolve_collision(desired: &Path) -> Result<(PathBuf, bool), OrganizeError> {
    if !desired.exists() {
        return Ok((desired.to_path_buf(), false));
    }

    let stem = desired
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file");
    let ext = desired.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = desired.parent().unwrap_or_else(|| Path::new(""));

    for counter in 1..=MAX_COLLISION_ATTEMPTS {
        let candidate_name = if ext.is_empty() {
            format!("{}_{}", stem, counter)
        } else {
            format!("{}_{}.{}", stem, counter, ext)
        };
        let candidate = parent.join(candidate_name);
        if !candidate.exists() {
            return Ok((candidate, true));
        }
    }

    Err(OrganizeError::CollisionExhausted {
        path: desired.to_path_buf(),
        attempts: MAX_COLLISION_ATTEMPTS,
    })
}
