//! The raster engine: one per video chip.
//!
//! Owns the chip, the frame buffer, the per-line caches and the change
//! queues. The chip's scheduler calls [`RasterEngine::step`] once per raster
//! line; the line state machine itself lives in `line.rs`.

use emu_core::{Observable, Value};
use log::debug;

use crate::area::UpdateArea;
use crate::buffer::DrawBuffer;
use crate::cache::{LineCache, gfx_mask_len};
use crate::canvas::{Canvas, CanvasBackend};
use crate::changes::{ApplyChange, ChangeSet, ChangeTarget, Phase, RasterField};
use crate::config::RasterConfig;
use crate::error::RasterError;
use crate::geometry::{Geometry, Viewport};
use crate::modes::{RasterChip, VideoMode};
use crate::sprite::SpriteStatus;
use crate::state::RasterState;

/// Routes applied changes to the engine registers or the chip.
pub(crate) struct Targets<'a, C: RasterChip> {
    pub state: &'a mut RasterState,
    pub chip: &'a mut C,
    pub mode_switched: bool,
}

impl<'a, C: RasterChip> Targets<'a, C> {
    pub fn new(state: &'a mut RasterState, chip: &'a mut C) -> Self {
        Self {
            state,
            chip,
            mode_switched: false,
        }
    }
}

impl<C: RasterChip> ApplyChange<C::Register> for Targets<'_, C> {
    fn apply(&mut self, target: ChangeTarget<C::Register>, value: u32) {
        match target {
            ChangeTarget::Raster(field) => {
                if self.state.apply(field, value) {
                    self.mode_switched = true;
                }
            }
            ChangeTarget::Chip(register) => self.chip.apply_change(register, value),
        }
    }
}

/// Cached scanline renderer for one chip.
pub struct RasterEngine<C: RasterChip> {
    pub(crate) chip: C,
    pub(crate) state: RasterState,
    pub(crate) geometry: Geometry,
    pub(crate) viewport: Viewport,
    pub(crate) config: RasterConfig,
    pub(crate) changes: ChangeSet<C::Register>,
    pub(crate) caches: Vec<LineCache>,
    pub(crate) sprite_status: SpriteStatus,
    pub(crate) canvas: Canvas,
    pub(crate) update_area: UpdateArea,
    pub(crate) gfx_mask: Vec<u8>,
    pub(crate) zero_gfx_mask: Vec<u8>,
    /// Target for lines outside the frame buffer and for collision passes.
    pub(crate) fake_line: Vec<u8>,
    /// Frame buffer row of the current line.
    pub(crate) draw_row: usize,
    pub(crate) cache_enabled: bool,
    pub(crate) dont_cache: bool,
    pub(crate) num_cached_lines: u32,
    pub(crate) skip_frame: bool,
    pub(crate) frame_count: u64,
}

impl<C: RasterChip> RasterEngine<C> {
    /// Build an engine. The first frame is always drawn in full.
    pub fn new(chip: C, geometry: Geometry, viewport: Viewport, config: RasterConfig) -> Self {
        let sprite_status = SpriteStatus::new(chip.num_sprites(), chip.sprite_width());
        let columns = geometry.text_size.width as usize;
        let fb_width = geometry.frame_buffer_width();
        let fb_height = geometry.frame_buffer_height();

        let mut engine = Self {
            state: RasterState::new(&geometry),
            changes: ChangeSet::new(config.change_queue_capacity),
            caches: alloc_caches(&geometry, sprite_status.num_sprites()),
            canvas: Canvas::new(DrawBuffer::new(fb_width, fb_height, config.interlace_allowed)),
            update_area: UpdateArea::default(),
            gfx_mask: vec![0; gfx_mask_len(columns)],
            zero_gfx_mask: vec![0; gfx_mask_len(columns)],
            fake_line: vec![0; fb_width as usize],
            draw_row: 0,
            cache_enabled: config.cache_enabled,
            dont_cache: true,
            num_cached_lines: 0,
            skip_frame: false,
            frame_count: 0,
            chip,
            geometry,
            viewport,
            config,
            sprite_status,
        };
        engine.update_draw_row();
        engine
    }

    #[must_use]
    pub fn chip(&self) -> &C {
        &self.chip
    }

    pub fn chip_mut(&mut self) -> &mut C {
        &mut self.chip
    }

    #[must_use]
    pub fn state(&self) -> &RasterState {
        &self.state
    }

    /// Direct register access for the chip's own writes. Changes that must
    /// take effect mid-line go through [`schedule`](Self::schedule).
    pub fn state_mut(&mut self) -> &mut RasterState {
        &mut self.state
    }

    #[must_use]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[must_use]
    pub fn config(&self) -> &RasterConfig {
        &self.config
    }

    #[must_use]
    pub fn sprite_status(&self) -> &SpriteStatus {
        &self.sprite_status
    }

    pub fn sprite_status_mut(&mut self) -> &mut SpriteStatus {
        &mut self.sprite_status
    }

    #[must_use]
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    #[must_use]
    pub fn current_line(&self) -> u32 {
        self.state.current_line
    }

    /// Dirty rectangle accumulated so far this frame.
    #[must_use]
    pub fn update_area(&self) -> &UpdateArea {
        &self.update_area
    }

    #[must_use]
    pub fn cache(&self, line: u32) -> Option<&LineCache> {
        self.caches.get(line as usize)
    }

    #[must_use]
    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    #[must_use]
    pub fn dont_cache(&self) -> bool {
        self.dont_cache
    }

    /// Lines drawn since caching was last suspended.
    #[must_use]
    pub fn num_cached_lines(&self) -> u32 {
        self.num_cached_lines
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Whether the frame in progress is being skipped.
    #[must_use]
    pub fn skipping_frame(&self) -> bool {
        self.skip_frame
    }

    /// Pending changes on `phase`.
    #[must_use]
    pub fn pending(&self, phase: Phase) -> usize {
        self.changes.queue(phase).len()
    }

    /// Schedule `target = value` for when the beam reaches `position` on the
    /// current line. `position` is in character columns for
    /// [`Phase::Foreground`] and in pixels otherwise.
    pub fn schedule(
        &mut self,
        phase: Phase,
        position: i32,
        target: ChangeTarget<C::Register>,
        value: u32,
    ) -> Result<(), RasterError> {
        let mut targets = Targets::new(&mut self.state, &mut self.chip);
        if self.skip_frame {
            targets.apply(target, value);
        } else {
            let span = match phase {
                Phase::Foreground => self.geometry.text_size.width,
                _ => self.geometry.screen_size.width,
            };
            self.changes
                .schedule(phase, position, target, value, span, &mut targets)?;
        }
        if targets.mode_switched {
            self.force_repaint();
        }
        Ok(())
    }

    /// [`schedule`](Self::schedule) for an engine register.
    pub fn schedule_raster(
        &mut self,
        phase: Phase,
        position: i32,
        field: RasterField,
        value: u32,
    ) -> Result<(), RasterError> {
        self.schedule(phase, position, ChangeTarget::Raster(field), value)
    }

    /// [`schedule`](Self::schedule) for a chip register.
    pub fn schedule_chip(
        &mut self,
        phase: Phase,
        position: i32,
        register: C::Register,
        value: u32,
    ) -> Result<(), RasterError> {
        self.schedule(phase, position, ChangeTarget::Chip(register), value)
    }

    pub(crate) fn apply_change(&mut self, target: ChangeTarget<C::Register>, value: u32) {
        let mut targets = Targets::new(&mut self.state, &mut self.chip);
        targets.apply(target, value);
        if targets.mode_switched {
            self.force_repaint();
        }
    }

    pub(crate) fn apply_queue(&mut self, phase: Phase) {
        let mut targets = Targets::new(&mut self.state, &mut self.chip);
        self.changes.queue_mut(phase).apply_all(&mut targets);
        if targets.mode_switched {
            self.force_repaint();
        }
    }

    /// Switch video mode at once. A different mode invalidates the frame.
    pub fn set_video_mode(&mut self, mode: VideoMode) {
        if self.state.video_mode != mode {
            debug!("video mode {} -> {}", self.state.video_mode, mode);
            self.state.video_mode = mode;
            self.force_repaint();
        }
    }

    /// Redraw every line in full until one whole viewport has been drawn.
    pub fn force_repaint(&mut self) {
        self.dont_cache = true;
        self.num_cached_lines = 0;
    }

    pub fn enable_cache(&mut self, enabled: bool) {
        if self.cache_enabled != enabled {
            debug!("line cache {}", if enabled { "enabled" } else { "disabled" });
        }
        self.cache_enabled = enabled;
        self.force_repaint();
    }

    /// Hand frames to the backend, or stop doing so.
    pub fn set_canvas_refresh(&mut self, enabled: bool) {
        self.canvas.update_canvas = enabled;
    }

    pub fn set_canvas_backend(&mut self, backend: Box<dyn CanvasBackend>) {
        self.canvas.set_backend(backend);
    }

    /// Replace the geometry, reallocating whatever no longer fits.
    pub fn set_geometry(&mut self, geometry: Geometry) {
        let old = self.geometry;
        self.geometry = geometry;

        if geometry.screen_size.height != old.screen_size.height
            || geometry.text_size.width != old.text_size.width
            || self.sprite_status.num_sprites() != self.chip.num_sprites()
        {
            self.sprite_status =
                SpriteStatus::new(self.chip.num_sprites(), self.chip.sprite_width());
            self.caches = alloc_caches(&geometry, self.sprite_status.num_sprites());
            let columns = geometry.text_size.width as usize;
            self.gfx_mask = vec![0; gfx_mask_len(columns)];
            self.zero_gfx_mask = vec![0; gfx_mask_len(columns)];
        } else {
            self.caches.iter_mut().for_each(LineCache::mark_dirty);
        }

        let fb_width = geometry.frame_buffer_width();
        let fb_height = geometry.frame_buffer_height();
        if fb_width != self.canvas.buffer.width() || fb_height != self.canvas.buffer.height() {
            self.canvas.buffer = DrawBuffer::new(fb_width, fb_height, self.config.interlace_allowed);
            self.fake_line = vec![0; fb_width as usize];
        }

        if self.state.current_line >= geometry.screen_size.height {
            self.state.current_line = 0;
        }
        debug!(
            "raster geometry {}x{}, frame buffer {}x{}",
            geometry.screen_size.width, geometry.screen_size.height, fb_width, fb_height
        );
        self.update_draw_row();
        self.force_repaint();
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        debug!(
            "viewport lines {}..={} from x {}",
            viewport.first_line, viewport.last_line, viewport.first_x
        );
        self.viewport = viewport;
        self.force_repaint();
    }

    /// Back to power-on state. Pending changes are discarded.
    pub fn reset(&mut self) {
        self.changes.clear_all();
        self.state.reset();
        self.sprite_status.dma_mask = 0;
        self.sprite_status.new_dma_mask = 0;
        self.update_area = UpdateArea::default();
        self.skip_frame = false;
        self.canvas.interlaced = false;
        self.canvas.buffer.set_active_field(0);
        self.update_draw_row();
        self.force_repaint();
    }

    pub(crate) fn update_draw_row(&mut self) {
        self.draw_row = self.geometry.frame_buffer_row(self.state.current_line) as usize;
    }

    pub(crate) fn uses_multiple_buffers(&self) -> bool {
        self.config.multi_buffered || self.canvas.interlaced
    }
}

fn alloc_caches(geometry: &Geometry, num_sprites: usize) -> Vec<LineCache> {
    let columns = geometry.text_size.width as usize;
    vec![LineCache::new(columns, num_sprites); geometry.screen_size.height as usize]
}

const QUERY_PATHS: &[&str] = &[
    "line",
    "video_mode",
    "cache_enabled",
    "dont_cache",
    "num_cached_lines",
    "blank_enabled",
    "frame_count",
    "border_color",
    "background_color",
    "xsmooth",
    "ysmooth",
    "open_left_border",
    "open_right_border",
    "update_area.xs",
    "update_area.ys",
    "update_area.xe",
    "update_area.ye",
];

impl<C: RasterChip> Observable for RasterEngine<C> {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(field) = path.strip_prefix("update_area.") {
            let rect = self.update_area.rect()?;
            return match field {
                "xs" => Some(rect.xs.into()),
                "ys" => Some(rect.ys.into()),
                "xe" => Some(rect.xe.into()),
                "ye" => Some(rect.ye.into()),
                _ => None,
            };
        }

        match path {
            "line" => Some(self.state.current_line.into()),
            "video_mode" => Some(self.state.video_mode.to_string().as_str().into()),
            "cache_enabled" => Some(self.cache_enabled.into()),
            "dont_cache" => Some(self.dont_cache.into()),
            "num_cached_lines" => Some(self.num_cached_lines.into()),
            "blank_enabled" => Some(self.state.blank_enabled.into()),
            "frame_count" => Some(self.frame_count.into()),
            "border_color" => Some(self.state.border_color.into()),
            "background_color" => Some(self.state.background_color.into()),
            "xsmooth" => Some(self.state.xsmooth.into()),
            "ysmooth" => Some(self.state.ysmooth.into()),
            "open_left_border" => Some(self.state.open_left_border.into()),
            "open_right_border" => Some(self.state.open_right_border.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        QUERY_PATHS
    }
}
