//! Registers the engine tracks between lines.

use crate::cache::LineDescriptor;
use crate::changes::RasterField;
use crate::geometry::Geometry;
use crate::modes::VideoMode;

/// Raster-level register file, readable by mode callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterState {
    pub current_line: u32,
    /// Line at which the vertical border opens.
    pub display_ystart: u32,
    /// Line at which the vertical border closes.
    pub display_ystop: u32,
    /// First pixel of the display window.
    pub display_xstart: u32,
    /// First pixel of the right border.
    pub display_xstop: u32,
    /// Vertical border flip-flop.
    pub blank_enabled: bool,
    /// Blank only the current line.
    pub blank_this_line: bool,
    /// Display disabled; keeps the border closed at `display_ystart`.
    pub blank: bool,
    /// Overrides `blank`.
    pub blank_off: bool,
    pub border_color: u8,
    pub background_color: u8,
    pub overscan_background_color: u8,
    /// Colour of the gap opened by horizontal fine scroll.
    pub xsmooth_color: u8,
    pub xsmooth: u32,
    pub ysmooth: u32,
    /// Foreground shift for the current line; cleared after each foreground pass.
    pub xsmooth_shift_left: u32,
    pub open_left_border: bool,
    pub open_right_border: bool,
    pub video_mode: VideoMode,
    pub draw_idle_state: bool,
    /// Pixel row within the current character row.
    pub ycounter: u32,
}

impl RasterState {
    /// Registers for a display window matching `geometry`'s graphics area.
    #[must_use]
    pub fn new(geometry: &Geometry) -> Self {
        let gfx = geometry.gfx_position;
        Self {
            current_line: 0,
            display_ystart: gfx.y,
            display_ystop: gfx.y + geometry.gfx_size.height,
            display_xstart: gfx.x,
            display_xstop: gfx.x + geometry.gfx_size.width,
            blank_enabled: false,
            blank_this_line: false,
            blank: false,
            blank_off: false,
            border_color: 0,
            background_color: 0,
            overscan_background_color: 0,
            xsmooth_color: 0,
            xsmooth: 0,
            ysmooth: 0,
            xsmooth_shift_left: 0,
            open_left_border: false,
            open_right_border: false,
            video_mode: VideoMode::StandardText,
            draw_idle_state: false,
            ycounter: 0,
        }
    }

    /// Back to power-on values. Colours and the display window are kept.
    pub fn reset(&mut self) {
        self.current_line = 0;
        self.xsmooth = 0;
        self.ysmooth = 0;
        self.xsmooth_shift_left = 0;
        self.blank_off = false;
        self.blank_enabled = false;
        self.blank_this_line = false;
        self.open_left_border = false;
        self.open_right_border = false;
        self.blank = false;
        self.draw_idle_state = false;
        self.ycounter = 0;
        self.video_mode = VideoMode::StandardText;
    }

    /// Mode whose callbacks draw the current line.
    #[must_use]
    pub fn real_mode(&self) -> VideoMode {
        if self.draw_idle_state {
            VideoMode::Idle
        } else {
            self.video_mode
        }
    }

    /// Write a scheduled value. Returns `true` if the video mode changed.
    pub fn apply(&mut self, field: RasterField, value: u32) -> bool {
        let flag = value != 0;
        let color = value as u8;
        match field {
            RasterField::BorderColor => self.border_color = color,
            RasterField::BackgroundColor => self.background_color = color,
            RasterField::OverscanBackgroundColor => self.overscan_background_color = color,
            RasterField::XSmoothColor => self.xsmooth_color = color,
            RasterField::XSmooth => self.xsmooth = value,
            RasterField::YSmooth => self.ysmooth = value,
            RasterField::XSmoothShiftLeft => self.xsmooth_shift_left = value,
            RasterField::VideoMode => {
                let mode = VideoMode::from_index(value);
                let changed = mode != self.video_mode;
                self.video_mode = mode;
                return changed;
            }
            RasterField::DrawIdleState => self.draw_idle_state = flag,
            RasterField::OpenLeftBorder => self.open_left_border = flag,
            RasterField::OpenRightBorder => self.open_right_border = flag,
            RasterField::BlankThisLine => self.blank_this_line = flag,
            RasterField::DisplayXStart => self.display_xstart = value,
            RasterField::DisplayXStop => self.display_xstop = value,
            RasterField::YCounter => self.ycounter = value,
        }
        false
    }

    /// Graphics line index of the current raster line.
    #[must_use]
    pub fn gfx_line(&self, geometry: &Geometry) -> i32 {
        self.current_line as i32 - geometry.gfx_position.y as i32 - self.ysmooth as i32 - 1
    }

    /// Descriptor the current line would be cached with.
    #[must_use]
    pub fn descriptor(&self, geometry: &Geometry) -> LineDescriptor {
        LineDescriptor {
            n: self.gfx_line(geometry),
            xsmooth: self.xsmooth,
            video_mode: self.real_mode(),
            blank: false,
            ycounter: self.ycounter,
            border_color: self.border_color,
            display_xstart: self.display_xstart,
            display_xstop: self.display_xstop,
            open_left_border: self.open_left_border,
            open_right_border: self.open_right_border,
            xsmooth_color: self.xsmooth_color,
            overscan_background_color: self.overscan_background_color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Position, Size};

    fn geometry() -> Geometry {
        Geometry::new(
            Size::new(384, 272),
            Size::new(320, 200),
            Size::new(40, 25),
            Position::new(32, 51),
            16,
            287,
        )
    }

    #[test]
    fn display_window_follows_gfx_area() {
        let state = RasterState::new(&geometry());
        assert_eq!((state.display_xstart, state.display_xstop), (32, 352));
        assert_eq!((state.display_ystart, state.display_ystop), (51, 251));
    }

    #[test]
    fn idle_state_overrides_mode() {
        let mut state = RasterState::new(&geometry());
        state.apply(RasterField::VideoMode, VideoMode::HiresBitmap.index());
        assert_eq!(state.real_mode(), VideoMode::HiresBitmap);
        state.apply(RasterField::DrawIdleState, 1);
        assert_eq!(state.real_mode(), VideoMode::Idle);
    }

    #[test]
    fn mode_change_is_reported_once() {
        let mut state = RasterState::new(&geometry());
        assert!(state.apply(RasterField::VideoMode, 3));
        assert!(!state.apply(RasterField::VideoMode, 3));
        assert!(!state.apply(RasterField::BorderColor, 3));
    }

    #[test]
    fn descriptor_tracks_scroll() {
        let g = geometry();
        let mut state = RasterState::new(&g);
        state.current_line = 60;
        state.ysmooth = 3;
        let d = state.descriptor(&g);
        assert_eq!(d.n, 60 - 51 - 3 - 1);
        assert!(!d.blank);
    }
}
