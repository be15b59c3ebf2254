//! JSON snapshots of the segment collection.
//!
//! The export document is a bare array of `{id, label, start, end, color}`
//! objects in insertion order. There is no schema version; readers ignore
//! fields they do not know.

use std::path::{Path, PathBuf};

use crate::segment::Segment;

/// Serialize segments as a pretty-printed JSON array (2-space indent).
pub fn export_segments(segments: &[Segment]) -> Result<String, SnapshotError> {
    serde_json::to_string_pretty(segments).map_err(SnapshotError::Encode)
}

/// Parse an exported document back into segments.
pub fn import_segments(json: &str) -> Result<Vec<Segment>, SnapshotError> {
    let segments: Vec<Segment> = serde_json::from_str(json).map_err(SnapshotError::Decode)?;
    if let Some((idx, seg)) = segments
        .iter()
        .enumerate()
        .find(|(_, s)| !s.start.is_finite() || !s.end.is_finite() || s.start < 0.0)
    {
        return Err(SnapshotError::Invalid {
            message: format!(
                "segment #{idx} has unusable bounds [{}, {}]",
                seg.start, seg.end
            ),
        });
    }
    Ok(segments)
}

/// Write an export document to disk.
pub fn write_snapshot(path: impl AsRef<Path>, segments: &[Segment]) -> Result<(), SnapshotError> {
    let path = path.as_ref();
    let json = export_segments(segments)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SnapshotError::IoError {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::write(path, json).map_err(|e| SnapshotError::IoError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Read an export document from disk.
pub fn read_snapshot(path: impl AsRef<Path>) -> Result<Vec<Segment>, SnapshotError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|e| SnapshotError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    import_segments(&json)
}

/// Errors that can occur reading or writing snapshots.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to parse snapshot: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Invalid snapshot: {message}")]
    Invalid { message: String },
}
