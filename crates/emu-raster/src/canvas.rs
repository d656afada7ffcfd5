//! Display backend hand-off.

use log::trace;

use crate::area::Rect;
use crate::buffer::{DrawBuffer, FrameView};
use crate::geometry::{Geometry, Viewport};

/// Receives completed frames.
pub trait CanvasBackend {
    /// Present `area` (raster coordinates, inclusive) of `frame`.
    fn refresh(&mut self, frame: &FrameView<'_>, area: Rect);

    /// Asked once per frame, before its first line: skip drawing the next
    /// frame to catch up with real time.
    fn skip_next_frame(&mut self) -> bool {
        false
    }
}

/// Frame buffer plus the backend it is presented through.
pub struct Canvas {
    pub(crate) buffer: DrawBuffer,
    backend: Option<Box<dyn CanvasBackend>>,
    /// Global video output switch.
    pub video_disabled: bool,
    /// Hand frames to the backend at all.
    pub update_canvas: bool,
    /// Alternate fields every frame.
    pub interlaced: bool,
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("buffer", &self.buffer)
            .field("backend", &self.backend.is_some())
            .field("video_disabled", &self.video_disabled)
            .field("update_canvas", &self.update_canvas)
            .field("interlaced", &self.interlaced)
            .finish()
    }
}

impl Canvas {
    #[must_use]
    pub fn new(buffer: DrawBuffer) -> Self {
        Self {
            buffer,
            backend: None,
            video_disabled: false,
            update_canvas: true,
            interlaced: false,
        }
    }

    #[must_use]
    pub fn buffer(&self) -> &DrawBuffer {
        &self.buffer
    }

    pub fn set_backend(&mut self, backend: Box<dyn CanvasBackend>) {
        self.backend = Some(backend);
    }

    fn presenting(&self) -> bool {
        !self.video_disabled && self.update_canvas && self.backend.is_some()
    }

    /// Current field as seen by the backend.
    #[must_use]
    pub fn frame(&self, geometry: &Geometry) -> FrameView<'_> {
        FrameView {
            pixels: self.buffer.active_pixels(),
            stride: self.buffer.width() as usize,
            height: self.buffer.height() as usize,
            origin: geometry.extra_offscreen_border_left as usize,
        }
    }

    /// Present a completed frame. `area` is the frame's dirty rectangle;
    /// `full_refresh` presents the whole viewport instead. Returns whether
    /// the backend was called.
    pub fn commit(
        &mut self,
        area: Option<Rect>,
        full_refresh: bool,
        frame_skipped: bool,
        geometry: &Geometry,
        viewport: &Viewport,
    ) -> bool {
        if frame_skipped || !self.presenting() {
            return false;
        }

        let screen_width = geometry.screen_size.width;
        let rect = if full_refresh {
            Rect {
                xs: viewport.first_x,
                ys: viewport.first_line,
                xe: screen_width.saturating_sub(1),
                ye: viewport.last_line,
            }
            .clip(viewport, screen_width)
        } else {
            area.and_then(|r| r.clip(viewport, screen_width))
        };

        let mut refreshed = false;
        if let Some(rect) = rect {
            trace!("refresh {}x{} at ({}, {})", rect.width(), rect.height(), rect.xs, rect.ys);
            let frame = FrameView {
                pixels: self.buffer.active_pixels(),
                stride: self.buffer.width() as usize,
                height: self.buffer.height() as usize,
                origin: geometry.extra_offscreen_border_left as usize,
            };
            if let Some(backend) = self.backend.as_mut() {
                backend.refresh(&frame, rect);
                refreshed = true;
            }
        }

        if self.interlaced {
            self.buffer.swap_fields();
        }
        refreshed
    }

    /// Ask the backend whether the coming frame should be skipped.
    pub fn decide_frame_skip(&mut self) -> bool {
        if !self.presenting() {
            return false;
        }
        self.backend
            .as_mut()
            .is_some_and(|backend| backend.skip_next_frame())
    }
}
