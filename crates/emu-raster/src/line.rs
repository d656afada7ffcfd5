//! Per-line state machine.
//!
//! Every call to [`RasterEngine::step`] picks one of four strategies for the
//! current line: blank, piecewise (pending mid-line changes), cached diff,
//! or full uncached redraw.

use log::trace;

use crate::buffer::LineBuffer;
use crate::cache::Span;
use crate::canvas::Canvas;
use crate::changes::Phase;
use crate::engine::RasterEngine;
use crate::geometry::Geometry;
use crate::modes::{RasterChip, RasterLine};
use crate::state::RasterState;

/// Row `row` of the active field, or the scratch line if the row lies
/// outside the frame buffer.
fn line_buffer<'a>(
    canvas: &'a mut Canvas,
    fake_line: &'a mut [u8],
    geometry: &Geometry,
    row: usize,
) -> LineBuffer<'a> {
    let origin = geometry.extra_offscreen_border_left as usize;
    let width = geometry.screen_size.width as usize;
    match canvas.buffer.row_mut(row) {
        Some(pixels) => LineBuffer::new(pixels, origin, width),
        None => LineBuffer::new(fake_line, origin, width),
    }
}

fn raster_line<'a>(
    state: &'a RasterState,
    geometry: &'a Geometry,
    canvas: &'a mut Canvas,
    fake_line: &'a mut [u8],
    gfx_mask: &'a mut [u8],
    row: usize,
) -> RasterLine<'a> {
    RasterLine {
        state,
        geometry,
        pixels: line_buffer(canvas, fake_line, geometry, row),
        gfx_mask,
    }
}

impl<C: RasterChip> RasterEngine<C> {
    /// Emulate one raster line. Returns `true` when the line completed a
    /// frame.
    pub fn step(&mut self) -> bool {
        let line = self.state.current_line;

        // Vertical border flip-flop.
        if line == self.state.display_ystart && (!self.state.blank || self.state.blank_off) {
            self.state.blank_enabled = false;
        }
        if line == self.state.display_ystop {
            self.state.blank_enabled = true;
        }

        if self.line_is_displayed(line) && !self.skip_frame {
            if (self.state.blank_this_line || self.state.blank_enabled)
                && !self.state.open_left_border
            {
                self.handle_blank_line();
            } else {
                self.handle_visible_line();
            }

            self.num_cached_lines += 1;
            if self.num_cached_lines >= self.viewport.height() {
                self.dont_cache = false;
                self.num_cached_lines = 0;
            }
        } else {
            self.update_sprite_collisions();
            if self.changes.have_on_this_line {
                self.apply_queue(Phase::Background);
                self.apply_queue(Phase::Foreground);
                self.apply_queue(Phase::Border);
                self.changes.have_on_this_line = false;
            }
        }
        self.apply_queue(Phase::Sprites);

        self.state.current_line += 1;
        let frame_done = self.state.current_line >= self.geometry.screen_size.height;
        if frame_done {
            self.handle_end_of_frame();
        }
        self.update_draw_row();

        self.apply_queue(Phase::NextLine);

        self.state.open_left_border = self.state.open_right_border;
        self.state.open_right_border = false;

        if self.sprite_status.num_sprites() > 0 {
            self.sprite_status.latch_dma_mask();
        }

        self.state.blank_this_line = false;
        frame_done
    }

    fn line_is_displayed(&self, line: u32) -> bool {
        line >= self.geometry.first_displayed_line
            && line <= self.geometry.last_displayed_line
            && self.viewport.contains_line(line)
    }

    fn handle_end_of_frame(&mut self) {
        self.state.current_line = 0;
        self.frame_count += 1;

        let area = self.update_area.take();
        let committed = self.canvas.commit(
            area,
            self.dont_cache,
            self.skip_frame,
            &self.geometry,
            &self.viewport,
        );
        self.skip_frame = self.canvas.decide_frame_skip();
        trace!(
            "frame {} done, committed {}, skipping next {}",
            self.frame_count, committed, self.skip_frame
        );
    }

    fn cache_index(&self) -> usize {
        self.state.current_line as usize
    }

    fn last_x(&self) -> usize {
        (self.geometry.screen_size.width as usize).saturating_sub(1)
    }

    fn mark_line(&mut self, xs: usize, xe: usize) {
        self.update_area
            .add_line(self.state.current_line, xs as u32, xe as u32);
    }

    fn draw_blank(&mut self, start: usize, end: usize) {
        let color = self.state.border_color;
        line_buffer(&mut self.canvas, &mut self.fake_line, &self.geometry, self.draw_row)
            .fill(start, end, color);
    }

    fn draw_borders(&mut self) {
        if !self.state.open_left_border && self.state.display_xstart > 0 {
            self.draw_blank(0, self.state.display_xstart as usize - 1);
        }
        if !self.state.open_right_border {
            self.draw_blank(self.state.display_xstop as usize, self.last_x());
        }
    }

    /// Paint the gap opened by fine scroll, and the open borders, in the
    /// colour the graphics would leave there.
    fn fill_background(&mut self) {
        let state = &self.state;
        let color = if state.draw_idle_state {
            state.overscan_background_color
        } else {
            state.xsmooth_color
        };
        let gfx_x = self.geometry.gfx_position.x as usize;
        let xsmooth = state.xsmooth as usize;
        let gfx_end = gfx_x + self.geometry.gfx_size.width as usize + xsmooth;
        let (open_left, open_right) = (state.open_left_border, state.open_right_border);
        let last_x = self.last_x();

        let mut pixels =
            line_buffer(&mut self.canvas, &mut self.fake_line, &self.geometry, self.draw_row);
        if xsmooth != 0 {
            pixels.fill(gfx_x, gfx_x + xsmooth - 1, color);
        }
        if open_left && gfx_x + xsmooth > 0 {
            pixels.fill(0, gfx_x + xsmooth - 1, color);
        }
        if open_right {
            pixels.fill(gfx_end, last_x, color);
        }
    }

    /// Sprite pass over the live line, against the engine's graphics mask.
    fn draw_sprites(&mut self) {
        if self.sprite_status.num_sprites() == 0 {
            return;
        }
        let mut pixels =
            line_buffer(&mut self.canvas, &mut self.fake_line, &self.geometry, self.draw_row);
        self.chip
            .draw_sprites(&mut pixels, &self.gfx_mask, &mut self.sprite_status);
    }

    /// Sprite pass against the cached graphics mask; the resulting
    /// collisions are remembered with the line.
    fn draw_sprites_cached(&mut self, index: usize) {
        if self.sprite_status.num_sprites() == 0 {
            return;
        }
        let cache = &mut self.caches[index];
        let mut pixels =
            line_buffer(&mut self.canvas, &mut self.fake_line, &self.geometry, self.draw_row);
        self.chip
            .draw_sprites(&mut pixels, &cache.gfx_mask, &mut self.sprite_status);
        cache.sprite_sprite_collisions = self.sprite_status.sprite_sprite_collisions;
        cache.sprite_background_collisions = self.sprite_status.sprite_background_collisions;
    }

    /// Run the sprite routine on the scratch line with an empty graphics
    /// mask, so sprite-sprite collisions are still detected on lines that
    /// are not drawn.
    fn update_sprite_collisions(&mut self) {
        if self.sprite_status.num_sprites() == 0 {
            return;
        }
        let origin = self.geometry.extra_offscreen_border_left as usize;
        let width = self.geometry.screen_size.width as usize;
        let mut pixels = LineBuffer::new(&mut self.fake_line, origin, width);
        self.chip
            .draw_sprites(&mut pixels, &self.zero_gfx_mask, &mut self.sprite_status);
    }

    fn handle_blank_line(&mut self) {
        let index = self.cache_index();
        let last_x = self.last_x();

        if self.changes.have_on_this_line {
            self.apply_queue(Phase::Background);
            self.apply_queue(Phase::Foreground);

            let border = self.changes.border.take();
            let mut xs = 0;
            for change in &border {
                let xe = change.position as usize;
                if xs < xe {
                    self.draw_blank(xs, xe - 1);
                    xs = xe;
                }
                self.apply_change(change.target, change.value);
            }
            if xs <= last_x {
                self.draw_blank(xs, last_x);
            }
            self.changes.border.recycle(border);
            self.changes.have_on_this_line = false;

            // Split colours: never reuse this line as a plain blank line.
            let cache = &mut self.caches[index];
            cache.descriptor.blank = true;
            cache.is_dirty = true;
            self.mark_line(0, last_x);
        } else {
            let border_color = self.state.border_color;
            let redraw = self.uses_multiple_buffers() || self.dont_cache || {
                let cache = &self.caches[index];
                cache.is_dirty
                    || cache.descriptor.border_color != border_color
                    || !cache.descriptor.blank
            };
            if redraw {
                let cache = &mut self.caches[index];
                cache.descriptor.border_color = border_color;
                cache.descriptor.blank = true;
                cache.is_dirty = false;
                self.draw_blank(0, last_x);
                self.mark_line(0, last_x);
            }
        }

        self.update_sprite_collisions();
    }

    fn handle_visible_line(&mut self) {
        if self.changes.have_on_this_line {
            self.handle_visible_line_with_changes();
        } else if !self.uses_multiple_buffers()
            && self.cache_enabled
            && !self.state.open_left_border
            && !self.state.open_right_border
        {
            self.handle_visible_line_with_cache();
        } else {
            self.handle_visible_line_without_cache();
        }
    }

    fn draw_background(&mut self, start: usize, end: usize) {
        let mode = self.state.real_mode();
        let mut line = raster_line(
            &self.state,
            &self.geometry,
            &mut self.canvas,
            &mut self.fake_line,
            &mut self.gfx_mask,
            self.draw_row,
        );
        self.chip.draw_background(mode, &mut line, start, end);
    }

    fn draw_foreground(&mut self, start: usize, end: usize) {
        let mode = self.state.real_mode();
        let mut line = raster_line(
            &self.state,
            &self.geometry,
            &mut self.canvas,
            &mut self.fake_line,
            &mut self.gfx_mask,
            self.draw_row,
        );
        self.chip.draw_foreground(mode, &mut line, start, end);
    }

    /// Draw the line piece by piece, applying each queued change when the
    /// draw cursor reaches its position.
    fn handle_visible_line_with_changes(&mut self) {
        let index = self.cache_index();
        let last_x = self.last_x();
        let columns = self.geometry.text_size.width as usize;

        let queue = self.changes.background.take();
        let mut xs = 0;
        for change in &queue {
            let xe = change.position as usize;
            if xs < xe {
                self.draw_background(xs, xe - 1);
                xs = xe;
            }
            self.apply_change(change.target, change.value);
        }
        if xs <= last_x {
            self.draw_background(xs, last_x);
        }
        self.changes.background.recycle(queue);

        let queue = self.changes.foreground.take();
        let mut xs = 0;
        for change in &queue {
            let xe = change.position as usize;
            if xs < xe {
                self.draw_foreground(xs, xe - 1);
                xs = xe;
            }
            self.state.xsmooth_shift_left = 0;
            self.apply_change(change.target, change.value);
        }
        if xs < columns {
            self.draw_foreground(xs, columns - 1);
        }
        self.changes.foreground.recycle(queue);
        self.state.xsmooth_shift_left = 0;

        self.draw_sprites();

        let queue = self.changes.border.take();
        let mut i = 0;

        // Left border ends one pixel before the display window.
        let left_stop = i64::from(self.state.display_xstart) - 1;
        if self.state.open_left_border {
            while i < queue.len() && i64::from(queue[i].position) <= left_stop {
                self.apply_change(queue[i].target, queue[i].value);
                i += 1;
            }
        } else {
            let mut xs = 0;
            while i < queue.len() && i64::from(queue[i].position) <= left_stop {
                let xe = queue[i].position as usize;
                if xs < xe {
                    self.draw_blank(xs, xe - 1);
                    xs = xe;
                }
                self.apply_change(queue[i].target, queue[i].value);
                i += 1;
            }
            if left_stop >= 0 && xs as i64 <= left_stop {
                self.draw_blank(xs, left_stop as usize);
            }
        }

        if self.state.open_right_border {
            while i < queue.len() {
                self.apply_change(queue[i].target, queue[i].value);
                i += 1;
            }
        } else {
            // Changes inside the display window only matter from the right
            // border onwards.
            while i < queue.len() && queue[i].position <= self.state.display_xstop {
                self.apply_change(queue[i].target, queue[i].value);
                i += 1;
            }
            let mut xs = self.state.display_xstop as usize;
            while i < queue.len() {
                let xe = queue[i].position as usize;
                if xs < xe {
                    self.draw_blank(xs, xe - 1);
                    xs = xe;
                }
                self.apply_change(queue[i].target, queue[i].value);
                i += 1;
            }
            if xs <= last_x {
                self.draw_blank(xs, last_x);
            }
        }
        self.changes.border.recycle(queue);
        self.changes.have_on_this_line = false;

        self.caches[index].is_dirty = true;
        self.mark_line(0, last_x);
    }

    fn handle_visible_line_with_cache(&mut self) {
        let index = self.cache_index();
        let changed = self
            .check_for_major_changes_and_update()
            .or_else(|| self.update_for_minor_changes());
        if let Some((xs, xe)) = changed {
            self.mark_line(xs, xe);
        }
        self.caches[index].is_dirty = false;
    }

    /// Redraw the whole line if anything the cache was built from changed.
    fn check_for_major_changes_and_update(&mut self) -> Option<(usize, usize)> {
        let index = self.cache_index();
        let mode = self.state.real_mode();
        let current = self.state.descriptor(&self.geometry);
        {
            let cache = &self.caches[index];
            if !(cache.is_dirty || self.dont_cache || cache.descriptor.invalidated_by(&current)) {
                return None;
            }
        }

        self.caches[index].descriptor = current;
        self.fill_background();

        let screen_width = self.geometry.screen_size.width;
        self.caches[index].fill_sprites(&self.sprite_status, screen_width);

        let mut span = Span::EMPTY;
        self.chip
            .fill_cache(mode, &self.state, &mut self.caches[index], &mut span, true);
        self.redraw_cached(index, span);
        self.draw_sprites_cached(index);
        self.draw_borders();

        Some((0, self.last_x()))
    }

    fn update_for_minor_changes(&mut self) -> Option<(usize, usize)> {
        if self.sprite_status.num_sprites() > 0 {
            self.update_for_minor_changes_with_sprites()
        } else {
            self.update_for_minor_changes_without_sprites()
        }
    }

    fn update_for_minor_changes_without_sprites(&mut self) -> Option<(usize, usize)> {
        let index = self.cache_index();
        let mode = self.state.real_mode();

        let mut span = Span::EMPTY;
        let needs_update =
            self.chip
                .fill_cache(mode, &self.state, &mut self.caches[index], &mut span, false);

        let changed = if needs_update {
            let span = self.redraw_cached(index, span);
            self.cells_to_pixels(span)
        } else {
            None
        };

        self.draw_borders();
        changed
    }

    fn update_for_minor_changes_with_sprites(&mut self) -> Option<(usize, usize)> {
        let index = self.cache_index();
        let mode = self.state.real_mode();

        let screen_width = self.geometry.screen_size.width;
        let sprite_span = self.caches[index].fill_sprites(&self.sprite_status, screen_width);
        let sprites_changed = sprite_span.is_some();

        // Changed sprites redraw the whole graphics area.
        let mut span = Span::EMPTY;
        let needs_update = self.chip.fill_cache(
            mode,
            &self.state,
            &mut self.caches[index],
            &mut span,
            sprites_changed,
        );

        let mut changed = None;
        if needs_update {
            let span = self.redraw_cached(index, span);
            let xsmooth = self.state.xsmooth as usize;
            if xsmooth != 0 {
                let gfx_x = self.geometry.gfx_position.x as usize;
                let color = self.state.xsmooth_color;
                line_buffer(&mut self.canvas, &mut self.fake_line, &self.geometry, self.draw_row)
                    .fill(gfx_x, gfx_x + xsmooth - 1, color);
            }
            self.draw_sprites_cached(index);
            self.draw_borders();

            let mut pixels = Span::EMPTY;
            if let Some((xs, xe)) = self.cells_to_pixels(span) {
                pixels = Span::new(xs, xe);
            }
            changed = match sprite_span {
                Some(sprite_span) => {
                    pixels.union(sprite_span);
                    // The borders were not touched, even under sprites.
                    let window_start = self.state.display_xstart as usize;
                    let window_end = (self.state.display_xstop as usize).saturating_sub(1);
                    pixels
                        .bounds()
                        .map(|(xs, xe)| (xs.max(window_start), xe.min(window_end)))
                }
                None => pixels.bounds(),
            };
        }

        if !sprites_changed {
            // Sprites unchanged: report the collisions recorded with the line.
            let cache = &self.caches[index];
            self.sprite_status.sprite_sprite_collisions = cache.sprite_sprite_collisions;
            self.sprite_status.sprite_background_collisions = cache.sprite_background_collisions;
        }

        changed
    }

    /// Draw character columns `span` (all columns if empty) from the cache.
    fn redraw_cached(&mut self, index: usize, span: Span) -> Span {
        let mode = self.state.real_mode();
        let span = if span.is_empty() {
            Span::full(self.geometry.text_size.width as usize)
        } else {
            span
        };
        let mut line = raster_line(
            &self.state,
            &self.geometry,
            &mut self.canvas,
            &mut self.fake_line,
            &mut self.gfx_mask,
            self.draw_row,
        );
        self.chip
            .draw_line_cached(mode, &mut line, &mut self.caches[index], span);
        span
    }

    /// Pixel range covered by character columns `span`, whole cells.
    fn cells_to_pixels(&self, span: Span) -> Option<(usize, usize)> {
        let (start, end) = span.bounds()?;
        let cell = self.geometry.cell_width() as usize;
        let origin = (self.geometry.gfx_position.x + self.state.xsmooth) as usize;
        let xs = origin + cell * start;
        let xe = (origin + cell * (end + 1) - 1).min(self.last_x());
        Some((xs, xe))
    }

    fn handle_visible_line_without_cache(&mut self) {
        let index = self.cache_index();
        let mode = self.state.real_mode();

        self.fill_background();
        {
            let mut line = raster_line(
                &self.state,
                &self.geometry,
                &mut self.canvas,
                &mut self.fake_line,
                &mut self.gfx_mask,
                self.draw_row,
            );
            self.chip.draw_line(mode, &mut line);
        }
        self.draw_sprites();
        self.draw_borders();

        // Nothing was cached; the next cached draw starts from scratch.
        self.caches[index].is_dirty = true;
        let last_x = self.last_x();
        self.mark_line(0, last_x);
    }
}
