//! Per-line cache and diff primitives.
//!
//! Each raster line remembers what it was drawn from last frame. Mode
//! callbacks refill the cache through the `fill*` functions, which copy the
//! new symbol stream over the cached one and report the range that differed,
//! so only those character cells are redrawn.

use crate::modes::VideoMode;
use crate::sprite::SpriteStatus;

/// Columns of slack on each side of the graphics mask, so sprites that hang
/// over the display window edges can still be tested for collisions.
pub const GFX_MASK_BORDER: usize = 8;

/// Minimum length of the per-line symbol arrays.
const MIN_COLUMNS: usize = 8;

/// Inclusive index range, possibly empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    bounds: Option<(usize, usize)>,
}

impl Span {
    pub const EMPTY: Self = Self { bounds: None };

    /// `[start, end]`, normalised so `start <= end`.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            bounds: Some((start.min(end), start.max(end))),
        }
    }

    /// `[0, len - 1]`, or empty when `len` is 0.
    #[must_use]
    pub fn full(len: usize) -> Self {
        if len == 0 {
            Self::EMPTY
        } else {
            Self::new(0, len - 1)
        }
    }

    #[must_use]
    pub fn bounds(&self) -> Option<(usize, usize)> {
        self.bounds
    }

    #[must_use]
    pub fn start(&self) -> Option<usize> {
        self.bounds.map(|(start, _)| start)
    }

    #[must_use]
    pub fn end(&self) -> Option<usize> {
        self.bounds.map(|(_, end)| end)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    pub fn include(&mut self, index: usize) {
        self.bounds = Some(match self.bounds {
            None => (index, index),
            Some((start, end)) => (start.min(index), end.max(index)),
        });
    }

    pub fn union(&mut self, other: Span) {
        if let Some((start, end)) = other.bounds {
            self.include(start);
            self.include(end);
        }
    }
}

fn fill_from(
    dest: &mut [u8],
    mut value: impl FnMut(usize) -> Option<u8>,
    span: &mut Span,
    no_check: bool,
) -> bool {
    if dest.is_empty() {
        return false;
    }
    if no_check {
        for (i, d) in dest.iter_mut().enumerate() {
            if let Some(v) = value(i) {
                *d = v;
            }
        }
        span.union(Span::full(dest.len()));
        return true;
    }

    let mut changed = false;
    for (i, d) in dest.iter_mut().enumerate() {
        let Some(v) = value(i) else {
            continue;
        };
        if *d != v {
            *d = v;
            span.include(i);
            changed = true;
        }
    }
    changed
}

/// Diff `dest` against every `stride`-th byte of `src` and copy the changes.
///
/// Returns whether anything changed and widens `span` over the changed
/// indices. With `no_check` everything is copied and the full length is
/// reported.
pub fn fill(dest: &mut [u8], src: &[u8], stride: usize, span: &mut Span, no_check: bool) -> bool {
    let stride = stride.max(1);
    fill_from(dest, |i| src.get(i * stride).copied(), span, no_check)
}

/// Like [`fill`], but each source byte is split into a high nibble stored in
/// `hi` and a low nibble stored in `lo`, so a change in either half is seen.
pub fn fill_nibbles(
    hi: &mut [u8],
    lo: &mut [u8],
    src: &[u8],
    stride: usize,
    span: &mut Span,
    no_check: bool,
) -> bool {
    let stride = stride.max(1);
    let len = hi.len().min(lo.len());
    if len == 0 {
        return false;
    }
    let mut changed = false;
    for i in 0..len {
        let Some(&byte) = src.get(i * stride) else {
            break;
        };
        let (h, l) = (byte >> 4, byte & 0x0F);
        if no_check || hi[i] != h || lo[i] != l {
            hi[i] = h;
            lo[i] = l;
            if !no_check {
                span.include(i);
            }
            changed = true;
        }
    }
    if no_check {
        span.union(Span::full(len));
        return true;
    }
    changed
}

/// Diff the glyph rows selected by `codes` rather than the codes themselves.
///
/// `glyph` maps a character code to its bit pattern on the current row, so
/// two codes sharing a row pattern compare equal, and a font switch that
/// alters the pattern of an unchanged code is still detected.
pub fn fill_text(
    dest: &mut [u8],
    codes: &[u8],
    glyph: impl Fn(u8) -> u8,
    span: &mut Span,
    no_check: bool,
) -> bool {
    fill_from(dest, |i| codes.get(i).map(|&code| glyph(code)), span, no_check)
}

/// Diff against `src[(start + i * stride) & mask]`, for memory windows whose
/// address counter wraps (the VIC-II bitmap within its 8 KiB bank).
pub fn fill_wrapped(
    dest: &mut [u8],
    src: &[u8],
    start: usize,
    stride: usize,
    mask: usize,
    span: &mut Span,
    no_check: bool,
) -> bool {
    fill_from(
        dest,
        |i| src.get((start + i * stride) & mask).copied(),
        span,
        no_check,
    )
}

/// Sprite state as last drawn on one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpriteCache {
    pub visible: bool,
    pub x: i32,
    pub x_expanded: bool,
    pub multicolor: bool,
    pub color: u8,
    pub mc_color_1: u8,
    pub mc_color_2: u8,
    pub in_background: bool,
    pub data: u32,
}

/// Everything that, when changed, invalidates the whole cached line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineDescriptor {
    /// Graphics line index relative to the top of the display window.
    pub n: i32,
    pub xsmooth: u32,
    pub video_mode: VideoMode,
    /// The line was last drawn as a blank line.
    pub blank: bool,
    pub ycounter: u32,
    pub border_color: u8,
    pub display_xstart: u32,
    pub display_xstop: u32,
    pub open_left_border: bool,
    pub open_right_border: bool,
    pub xsmooth_color: u8,
    pub overscan_background_color: u8,
}

impl Default for LineDescriptor {
    fn default() -> Self {
        Self {
            n: 0,
            xsmooth: 0,
            video_mode: VideoMode::StandardText,
            blank: false,
            ycounter: 0,
            border_color: 0,
            display_xstart: 0,
            display_xstop: 0,
            open_left_border: false,
            open_right_border: false,
            xsmooth_color: 0,
            overscan_background_color: 0,
        }
    }
}

impl LineDescriptor {
    /// Whether a line cached with `self` must be fully redrawn for `current`.
    ///
    /// A border that was open when cached but is closed now counts; the
    /// opposite direction never reaches the cached path.
    #[must_use]
    pub fn invalidated_by(&self, current: &LineDescriptor) -> bool {
        self.blank
            || self.n != current.n
            || self.xsmooth != current.xsmooth
            || self.video_mode != current.video_mode
            || self.ycounter != current.ycounter
            || self.border_color != current.border_color
            || self.display_xstart != current.display_xstart
            || self.display_xstop != current.display_xstop
            || (self.open_left_border && !current.open_left_border)
            || (self.open_right_border && !current.open_right_border)
            || self.xsmooth_color != current.xsmooth_color
            || self.overscan_background_color != current.overscan_background_color
    }
}

/// Cached content of one raster line.
#[derive(Debug, Clone)]
pub struct LineCache {
    pub foreground_data: Vec<u8>,
    pub background_data: Vec<u8>,
    pub color_data_1: Vec<u8>,
    pub color_data_2: Vec<u8>,
    pub color_data_3: Vec<u8>,
    /// Foreground bits of the line, [`GFX_MASK_BORDER`] columns of slack
    /// on each side.
    pub gfx_mask: Vec<u8>,
    /// Chip-defined identity of the font or bitmap bank in use.
    pub font_key: u32,
    pub sprites: Vec<SpriteCache>,
    pub sprite_sprite_collisions: u8,
    pub sprite_background_collisions: u8,
    pub descriptor: LineDescriptor,
    /// Contents are meaningless; the next draw must recompute everything.
    pub is_dirty: bool,
}

impl LineCache {
    #[must_use]
    pub fn new(columns: usize, num_sprites: usize) -> Self {
        let columns = columns.max(MIN_COLUMNS);
        Self {
            foreground_data: vec![0; columns],
            background_data: vec![0; columns],
            color_data_1: vec![0; columns],
            color_data_2: vec![0; columns],
            color_data_3: vec![0; columns],
            gfx_mask: vec![0; gfx_mask_len(columns)],
            font_key: 0,
            sprites: vec![SpriteCache::default(); num_sprites],
            sprite_sprite_collisions: 0,
            sprite_background_collisions: 0,
            descriptor: LineDescriptor::default(),
            is_dirty: true,
        }
    }

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    /// Bring the sprite cache in line with `status`.
    ///
    /// Returns `None` when no sprite changed, otherwise the pixel span that
    /// must be redrawn (empty if every change happened off screen). A sprite
    /// whose DMA ended reports the span it was last drawn at and is marked
    /// invisible.
    pub fn fill_sprites(&mut self, status: &SpriteStatus, screen_width: u32) -> Option<Span> {
        let mut changed = false;
        let mut span = Span::EMPTY;
        let count = self.sprites.len().min(status.num_sprites());

        for i in 0..count {
            let cached = self.sprites[i];
            if !status.is_active(i) {
                if cached.visible {
                    self.sprites[i].visible = false;
                    let width = status.pixel_width(cached.x_expanded);
                    include_pixels(&mut span, cached.x, width, screen_width);
                    changed = true;
                }
                continue;
            }

            let sprite = &status.sprites[i];
            let current = SpriteCache {
                visible: true,
                x: sprite.x,
                x_expanded: sprite.x_expanded,
                multicolor: sprite.multicolor,
                color: sprite.color,
                mc_color_1: status.mc_sprite_color_1,
                mc_color_2: status.mc_sprite_color_2,
                in_background: sprite.in_background,
                data: status.sprite_data.get(i).copied().unwrap_or(0),
            };
            if cached == current {
                continue;
            }
            if cached.visible {
                let width = status.pixel_width(cached.x_expanded);
                include_pixels(&mut span, cached.x, width, screen_width);
            }
            let width = status.pixel_width(current.x_expanded);
            include_pixels(&mut span, current.x, width, screen_width);
            self.sprites[i] = current;
            changed = true;
        }

        changed.then_some(span)
    }
}

/// Length of a graphics mask covering `columns` cells plus slack.
#[must_use]
pub fn gfx_mask_len(columns: usize) -> usize {
    columns.max(MIN_COLUMNS) + 2 * GFX_MASK_BORDER
}

fn include_pixels(span: &mut Span, x: i32, width: u32, screen_width: u32) {
    if width == 0 || screen_width == 0 {
        return;
    }
    let start = i64::from(x);
    let end = start + i64::from(width) - 1;
    if end < 0 || start >= i64::from(screen_width) {
        return;
    }
    span.include(start.max(0) as usize);
    span.include(end.min(i64::from(screen_width) - 1) as usize);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::Sprite;

    #[test]
    fn identical_data_reports_no_change() {
        let mut dest = [1, 2, 3, 4];
        let mut span = Span::EMPTY;
        assert!(!fill(&mut dest, &[1, 2, 3, 4], 1, &mut span, false));
        assert!(span.is_empty());
    }

    #[test]
    fn single_difference_is_pinpointed() {
        let mut dest = [0u8; 40];
        let mut src = [0u8; 40];
        src[10] = 0x41;
        let mut span = Span::EMPTY;
        assert!(fill(&mut dest, &src, 1, &mut span, false));
        assert_eq!(span.bounds(), Some((10, 10)));
        assert_eq!(dest[10], 0x41);
    }

    #[test]
    fn no_check_reports_full_length() {
        let mut dest = [5u8; 6];
        let mut span = Span::EMPTY;
        assert!(fill(&mut dest, &[5; 6], 1, &mut span, true));
        assert_eq!(span.bounds(), Some((0, 5)));
    }

    #[test]
    fn stride_skips_source_bytes() {
        let mut dest = [0u8; 3];
        let mut span = Span::EMPTY;
        assert!(fill(&mut dest, &[1, 9, 2, 9, 3, 9], 2, &mut span, false));
        assert_eq!(dest, [1, 2, 3]);
    }

    #[test]
    fn nibble_fill_sees_low_nibble_change() {
        let mut hi = [0x1u8, 0x2];
        let mut lo = [0x3u8, 0x4];
        let mut span = Span::EMPTY;
        assert!(fill_nibbles(&mut hi, &mut lo, &[0x13, 0x25], 1, &mut span, false));
        assert_eq!(span.bounds(), Some((1, 1)));
        assert_eq!(lo, [0x3, 0x5]);
        assert_eq!(hi, [0x1, 0x2]);
    }

    #[test]
    fn text_fill_compares_glyph_rows() {
        // Codes 1 and 2 share a row pattern; code 3 does not.
        let glyph = |code: u8| if code == 3 { 0xFF } else { 0x18 };
        let mut dest = [0x18u8; 4];
        let mut span = Span::EMPTY;
        assert!(!fill_text(&mut dest, &[1, 2, 1, 2], glyph, &mut span, false));
        assert!(fill_text(&mut dest, &[1, 2, 3, 2], glyph, &mut span, false));
        assert_eq!(span.bounds(), Some((2, 2)));
    }

    #[test]
    fn wrapped_fill_masks_address() {
        let src: Vec<u8> = (0..16).collect();
        let mut dest = [0u8; 3];
        let mut span = Span::EMPTY;
        fill_wrapped(&mut dest, &src, 14, 1, 0x0F, &mut span, false);
        assert_eq!(dest, [14, 15, 0]);
        assert_eq!(span.bounds(), Some((0, 1)));
    }

    #[test]
    fn descriptor_open_border_rule() {
        let cached = LineDescriptor {
            open_left_border: true,
            ..LineDescriptor::default()
        };
        let mut current = cached;
        assert!(!cached.invalidated_by(&current));
        current.open_left_border = false;
        assert!(cached.invalidated_by(&current));
        assert!(!current.invalidated_by(&cached));
    }

    #[test]
    fn blank_descriptor_always_invalidates() {
        let cached = LineDescriptor {
            blank: true,
            ..LineDescriptor::default()
        };
        assert!(cached.invalidated_by(&LineDescriptor::default()));
    }

    fn one_sprite(x: i32) -> SpriteStatus {
        let mut status = SpriteStatus::new(1, 24);
        status.sprites[0] = Sprite {
            x,
            ..Sprite::default()
        };
        status.dma_mask = 1;
        status.sprite_data[0] = 0x00FF_FF00;
        status
    }

    #[test]
    fn sprite_move_covers_old_and_new_span() {
        let mut cache = LineCache::new(40, 1);
        let status = one_sprite(100);
        assert_eq!(
            cache.fill_sprites(&status, 384).and_then(|s| s.bounds()),
            Some((100, 123))
        );
        assert_eq!(cache.fill_sprites(&status, 384), None);

        let moved = one_sprite(110);
        assert_eq!(
            cache.fill_sprites(&moved, 384).and_then(|s| s.bounds()),
            Some((100, 133))
        );
    }

    #[test]
    fn sprite_dma_end_clears_last_span() {
        let mut cache = LineCache::new(40, 1);
        let mut status = one_sprite(370);
        cache.fill_sprites(&status, 384);
        status.dma_mask = 0;
        let span = cache.fill_sprites(&status, 384).expect("sprite vanished");
        assert_eq!(span.bounds(), Some((370, 383)));
        assert!(!cache.sprites[0].visible);
        assert_eq!(cache.fill_sprites(&status, 384), None);
    }

    #[test]
    fn offscreen_sprite_change_has_empty_span() {
        let mut cache = LineCache::new(40, 1);
        let status = one_sprite(-60);
        let span = cache.fill_sprites(&status, 384).expect("changed");
        assert!(span.is_empty());
    }
}
