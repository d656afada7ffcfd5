use emu_core::SnapshotError;
use thiserror::Error;

use crate::changes::Phase;

/// Errors reported by the raster engine.
#[derive(Debug, Error)]
pub enum RasterError {
    /// More changes were scheduled on one line than the queue can hold.
    #[error("{phase} change queue is full ({capacity} entries)")]
    QueueFull { phase: Phase, capacity: usize },

    #[error("snapshot: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Stored frame buffer dimensions do not fit the current geometry.
    #[error("snapshot frame buffer has unusable size {width}x{height}")]
    SnapshotGeometry { width: u32, height: u32 },

    #[error("PNG encoding failed: {0}")]
    Png(#[from] png::EncodingError),

    #[error("screenshot area is empty")]
    EmptyScreenshot,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
