//! Raster engine configuration.

/// Entries per change queue unless configured otherwise.
pub const DEFAULT_CHANGE_QUEUE_CAPACITY: usize = 512;

/// Construction-time configuration for a [`RasterEngine`](crate::RasterEngine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RasterConfig {
    /// Reuse unchanged scanlines from the previous frame.
    pub cache_enabled: bool,
    /// Allocate a second field so the canvas can alternate frames.
    pub interlace_allowed: bool,
    /// The backend presents from more than one buffer, so the previous
    /// frame's pixels cannot be relied on and every line is redrawn.
    pub multi_buffered: bool,
    /// Maximum pending changes per phase.
    pub change_queue_capacity: usize,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            interlace_allowed: false,
            multi_buffered: false,
            change_queue_capacity: DEFAULT_CHANGE_QUEUE_CAPACITY,
        }
    }
}
