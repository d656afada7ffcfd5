//! Video modes and the chip callback contract.
//!
//! A chip model implements [`RasterChip`] once and dispatches on
//! [`VideoMode`] inside each callback. The engine decides *which* callback
//! runs for a line; the chip decides what pixels come out of it.

use std::fmt;

use crate::buffer::LineBuffer;
use crate::cache::{LineCache, Span};
use crate::geometry::Geometry;
use crate::sprite::SpriteStatus;
use crate::state::RasterState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VideoMode {
    #[default]
    StandardText,
    MulticolorText,
    ExtendedText,
    HiresBitmap,
    MulticolorBitmap,
    /// Display window open but no graphics fetched.
    Idle,
    /// Invalid mode bit combination; renders a fixed colour.
    Illegal,
}

impl VideoMode {
    pub const ALL: [Self; 7] = [
        Self::StandardText,
        Self::MulticolorText,
        Self::ExtendedText,
        Self::HiresBitmap,
        Self::MulticolorBitmap,
        Self::Idle,
        Self::Illegal,
    ];

    /// Mode for a scheduled change value. Out-of-range values are illegal.
    #[must_use]
    pub fn from_index(index: u32) -> Self {
        Self::ALL
            .get(index as usize)
            .copied()
            .unwrap_or(Self::Illegal)
    }

    #[must_use]
    pub fn index(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for VideoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StandardText => "standard text",
            Self::MulticolorText => "multicolor text",
            Self::ExtendedText => "extended text",
            Self::HiresBitmap => "hires bitmap",
            Self::MulticolorBitmap => "multicolor bitmap",
            Self::Idle => "idle",
            Self::Illegal => "illegal",
        };
        f.write_str(name)
    }
}

/// The line being drawn, lent to a mode callback for one call.
pub struct RasterLine<'a> {
    pub state: &'a RasterState,
    pub geometry: &'a Geometry,
    pub pixels: LineBuffer<'a>,
    /// Foreground bits for the sprite pass, one byte per character cell,
    /// offset by [`GFX_MASK_BORDER`](crate::GFX_MASK_BORDER).
    pub gfx_mask: &'a mut [u8],
}

impl RasterLine<'_> {
    /// Pixel x of the first graphics column, fine scroll included.
    #[must_use]
    pub fn gfx_x(&self) -> usize {
        (self.geometry.gfx_position.x + self.state.xsmooth) as usize
    }

    /// Pixel x of character column `column`.
    #[must_use]
    pub fn column_x(&self, column: usize) -> usize {
        self.gfx_x() + column * self.geometry.cell_width() as usize
    }

    /// Character columns in the display window.
    #[must_use]
    pub fn columns(&self) -> usize {
        self.geometry.text_size.width as usize
    }
}

/// A video chip that renders through a [`RasterEngine`](crate::RasterEngine).
pub trait RasterChip {
    /// Chip registers that can be the target of a scheduled change.
    type Register: Copy + fmt::Debug;

    /// Hardware sprites; 0 disables the sprite passes.
    fn num_sprites(&self) -> usize {
        0
    }

    /// Unexpanded sprite width in pixels.
    fn sprite_width(&self) -> u32 {
        24
    }

    /// Write a scheduled value into a chip register.
    fn apply_change(&mut self, register: Self::Register, value: u32);

    /// Refill `cache` for the current line and widen `span` (character
    /// columns) over what changed. With `force` everything is copied and
    /// reported. Returns whether the line needs redrawing.
    fn fill_cache(
        &mut self,
        mode: VideoMode,
        state: &RasterState,
        cache: &mut LineCache,
        span: &mut Span,
        force: bool,
    ) -> bool;

    /// Draw character columns `span` from cached data and write the line's
    /// foreground bits to `cache.gfx_mask`.
    fn draw_line_cached(
        &mut self,
        mode: VideoMode,
        line: &mut RasterLine<'_>,
        cache: &mut LineCache,
        span: Span,
    );

    /// Draw the whole graphics area straight from chip memory.
    fn draw_line(&mut self, mode: VideoMode, line: &mut RasterLine<'_>);

    /// Draw the background layer over pixels `[start, end]`.
    fn draw_background(&mut self, mode: VideoMode, line: &mut RasterLine<'_>, start: usize, end: usize);

    /// Draw the foreground layer over character columns `[start, end]`.
    fn draw_foreground(&mut self, mode: VideoMode, line: &mut RasterLine<'_>, start: usize, end: usize);

    /// Draw sprites over `pixels` and record collisions in `status`.
    /// `gfx_mask` is laid out like [`RasterLine::gfx_mask`].
    fn draw_sprites(
        &mut self,
        _pixels: &mut LineBuffer<'_>,
        _gfx_mask: &[u8],
        _status: &mut SpriteStatus,
    ) {
    }
}
