//! Cached scanline renderer for raster video chips.
//!
//! A chip model implements [`RasterChip`] and drives a [`RasterEngine`] one
//! raster line at a time. Register writes that land while the beam is inside
//! a line are scheduled with [`RasterEngine::schedule`] and take effect at
//! the right pixel. Lines whose inputs did not change since the last frame
//! are not redrawn, and the frame's dirty rectangle is handed to a
//! [`CanvasBackend`] at the end of each frame.

mod area;
mod buffer;
mod cache;
mod canvas;
mod changes;
mod config;
mod engine;
mod error;
mod geometry;
mod line;
mod modes;
mod screenshot;
mod snapshot;
mod sprite;
mod state;

pub use area::{Rect, UpdateArea};
pub use buffer::{DrawBuffer, FrameView, LineBuffer, PADDING_ROWS};
pub use cache::{
    GFX_MASK_BORDER, LineCache, LineDescriptor, Span, SpriteCache, fill, fill_nibbles, fill_text,
    fill_wrapped, gfx_mask_len,
};
pub use canvas::{Canvas, CanvasBackend};
pub use changes::{ApplyChange, Change, ChangeQueue, ChangeSet, ChangeTarget, Phase, RasterField};
pub use config::{DEFAULT_CHANGE_QUEUE_CAPACITY, RasterConfig};
pub use engine::RasterEngine;
pub use error::RasterError;
pub use geometry::{Geometry, Position, Size, Viewport};
pub use modes::{RasterChip, RasterLine, VideoMode};
pub use sprite::{Sprite, SpriteStatus};
pub use state::RasterState;
