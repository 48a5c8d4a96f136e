//! Artifact staging: base64 payload → single-use temp file.

use std::io::Write;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tempfile::TempPath;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StageError {
    #[error("invalid base64 artifact: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Decode the transported artifact and persist it to a fresh temp file.
///
/// The returned [`TempPath`] owns the file; the lifecycle layer keeps it
/// alive alongside the loaded program so the artifact survives for the
/// container's lifetime and is unlinked when the process tears down.
pub fn stage(encoded: &str) -> Result<TempPath, StageError> {
    let bytes = STANDARD.decode(encoded.trim())?;

    let mut file = tempfile::Builder::new()
        .prefix("action-")
        .suffix(".wasm")
        .tempfile()?;
    file.write_all(&bytes)?;
    file.flush()?;

    tracing::debug!(path = %file.path().display(), size = bytes.len(), "Artifact staged");

    Ok(file.into_temp_path())
}
