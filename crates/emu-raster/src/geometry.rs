//! Screen geometry and viewport.
//!
//! The geometry block is read-only configuration supplied by the chip model.
//! All x coordinates are pixels from the left edge of the raster line; the
//! extra off-screen borders exist only in the frame buffer, for sprites that
//! hang off the left or right edge.

/// Width and height, in pixels or character cells depending on context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

impl Position {
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Raster geometry of one video chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Geometry {
    /// Pixels per raster line and raster lines per frame.
    pub screen_size: Size,
    /// Graphics (display window) area in pixels.
    pub gfx_size: Size,
    /// Graphics area in character cells.
    pub text_size: Size,
    /// Top-left corner of the graphics area.
    pub gfx_position: Position,
    pub first_displayed_line: u32,
    pub last_displayed_line: u32,
    pub extra_offscreen_border_left: u32,
    pub extra_offscreen_border_right: u32,
    /// Pixels per character cell (8 on every supported chip).
    pub char_pixel_width: u32,
}

impl Geometry {
    /// Geometry with no extra off-screen borders and 8-pixel cells.
    #[must_use]
    pub const fn new(
        screen_size: Size,
        gfx_size: Size,
        text_size: Size,
        gfx_position: Position,
        first_displayed_line: u32,
        last_displayed_line: u32,
    ) -> Self {
        Self {
            screen_size,
            gfx_size,
            text_size,
            gfx_position,
            first_displayed_line,
            last_displayed_line,
            extra_offscreen_border_left: 0,
            extra_offscreen_border_right: 0,
            char_pixel_width: 8,
        }
    }

    /// Frame buffer width including the off-screen borders.
    #[must_use]
    pub const fn frame_buffer_width(&self) -> u32 {
        self.screen_size.width
            + self.extra_offscreen_border_left
            + self.extra_offscreen_border_right
    }

    /// Frame buffer height. Chips that display lines 0+ in the lower border
    /// (NTSC VIC-II) need room past the end of the frame.
    #[must_use]
    pub const fn frame_buffer_height(&self) -> u32 {
        if self.screen_size.height > self.last_displayed_line {
            self.screen_size.height
        } else {
            self.last_displayed_line + 1
        }
    }

    /// Character cell width, never zero.
    #[must_use]
    pub const fn cell_width(&self) -> u32 {
        if self.char_pixel_width == 0 {
            8
        } else {
            self.char_pixel_width
        }
    }

    /// Frame buffer row that raster line `line` is drawn to.
    #[must_use]
    pub const fn frame_buffer_row(&self, line: u32) -> u32 {
        if line < self.first_displayed_line
            && self.screen_size.height <= self.last_displayed_line
        {
            self.screen_size.height + line
        } else {
            line
        }
    }
}

/// The window of the raster that is actually shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Viewport {
    pub first_line: u32,
    pub last_line: u32,
    /// First displayed column.
    pub first_x: u32,
}

impl Viewport {
    /// Viewport showing every displayed line of `geometry`.
    #[must_use]
    pub const fn covering(geometry: &Geometry) -> Self {
        Self {
            first_line: geometry.first_displayed_line,
            last_line: geometry.last_displayed_line,
            first_x: 0,
        }
    }

    /// Number of lines in the viewport.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.last_line.saturating_sub(self.first_line) + 1
    }

    #[must_use]
    pub const fn contains_line(&self, line: u32) -> bool {
        line >= self.first_line && line <= self.last_line
    }
}
