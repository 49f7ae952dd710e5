use std::path::PathBuf;

/// Per-file failures surfaced by the relocation phase. Metadata and index
/// problems are recovered in place and only logged, so they have no variant.
#[derive(Debug, thiserror::Error)]
pub enum OrganizeError {
    #[error("no free name for {path} after {attempts} attempts")]
    CollisionExhausted { path: PathBuf, attempts: u32 },

    #[error("failed to move {path}: {source}")]
    Move {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("operation cancelled")]
    Cancelled,
}
