//! Draw buffer and bounds-checked line access.
//!
//! The frame buffer holds one palette index per pixel. Each field is padded
//! with two spare rows above and below the visible area so a mode callback
//! that overshoots a line never touches another allocation.

/// Spare rows before and after each field.
pub const PADDING_ROWS: usize = 2;

/// One or two fields of palette-indexed pixels.
#[derive(Debug, Clone)]
pub struct DrawBuffer {
    fields: [Vec<u8>; 2],
    width: u32,
    height: u32,
    active: usize,
    interlace_allowed: bool,
}

impl DrawBuffer {
    /// Allocate a buffer. The second field is only allocated when
    /// `interlace_allowed` is set.
    #[must_use]
    pub fn new(width: u32, height: u32, interlace_allowed: bool) -> Self {
        let size = Self::padded_size(width, height);
        let secondary = if interlace_allowed {
            vec![0; size]
        } else {
            Vec::new()
        };
        Self {
            fields: [vec![0; size], secondary],
            width,
            height,
            active: 0,
            interlace_allowed,
        }
    }

    /// Total bytes of one padded field.
    #[must_use]
    pub fn padded_size(width: u32, height: u32) -> usize {
        width as usize * (height as usize + 2 * PADDING_ROWS)
    }

    fn padding_offset(&self) -> usize {
        self.width as usize * PADDING_ROWS
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn interlace_allowed(&self) -> bool {
        self.interlace_allowed
    }

    /// Index of the field being drawn to.
    #[must_use]
    pub fn active_field(&self) -> usize {
        self.active
    }

    /// Select the field to draw to. Ignored without a second field.
    pub fn set_active_field(&mut self, field: usize) {
        if self.interlace_allowed {
            self.active = field & 1;
        }
    }

    pub fn swap_fields(&mut self) {
        if self.interlace_allowed {
            self.active ^= 1;
        }
    }

    /// Fill every pixel of both fields, padding included.
    pub fn clear(&mut self, color: u8) {
        for field in &mut self.fields {
            field.fill(color);
        }
    }

    /// Whole padded field, as stored in snapshots.
    #[must_use]
    pub fn padded(&self, field: usize) -> &[u8] {
        &self.fields[field & 1]
    }

    pub fn padded_mut(&mut self, field: usize) -> &mut [u8] {
        &mut self.fields[field & 1]
    }

    /// Visible rows of the active field.
    #[must_use]
    pub fn active_pixels(&self) -> &[u8] {
        let offset = self.padding_offset();
        let len = self.width as usize * self.height as usize;
        self.fields[self.active]
            .get(offset..offset + len)
            .unwrap_or(&[])
    }

    /// Row `y` of the active field, `None` outside the visible rows.
    #[must_use]
    pub fn row(&self, y: usize) -> Option<&[u8]> {
        if y >= self.height as usize {
            return None;
        }
        let width = self.width as usize;
        let start = self.padding_offset() + y * width;
        self.fields[self.active].get(start..start + width)
    }

    pub fn row_mut(&mut self, y: usize) -> Option<&mut [u8]> {
        if y >= self.height as usize {
            return None;
        }
        let width = self.width as usize;
        let start = self.padding_offset() + y * width;
        self.fields[self.active].get_mut(start..start + width)
    }
}

/// Borrowed view of the active field handed to the display backend.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    /// Visible rows, `stride` bytes each.
    pub pixels: &'a [u8],
    pub stride: usize,
    pub height: usize,
    /// Column of raster x = 0 within each row (the extra left border).
    pub origin: usize,
}

impl FrameView<'_> {
    /// Pixel at raster coordinates, `None` outside the buffer.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        let x = self.origin + x as usize;
        if x >= self.stride {
            return None;
        }
        self.pixels.get(y as usize * self.stride + x).copied()
    }
}

/// One frame buffer row, addressed in raster x coordinates.
///
/// `origin` is the width of the off-screen left border: raster x = 0 is row
/// index `origin`. Writes outside the row are dropped.
#[derive(Debug)]
pub struct LineBuffer<'a> {
    row: &'a mut [u8],
    origin: usize,
    width: usize,
}

impl<'a> LineBuffer<'a> {
    /// Wrap `row`. `width` is the on-screen line width; it is clamped so
    /// every addressed pixel lies inside `row`.
    pub fn new(row: &'a mut [u8], origin: usize, width: usize) -> Self {
        let origin = origin.min(row.len());
        let width = width.min(row.len() - origin);
        Self { row, origin, width }
    }

    /// On-screen width in pixels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Paint `[start, end]` inclusive, clamped to the line.
    pub fn fill(&mut self, start: usize, end: usize, color: u8) {
        if start > end || start >= self.width {
            return;
        }
        let end = end.min(self.width - 1);
        self.row[self.origin + start..=self.origin + end].fill(color);
    }

    pub fn set(&mut self, x: usize, color: u8) {
        if x < self.width {
            self.row[self.origin + x] = color;
        }
    }

    #[must_use]
    pub fn get(&self, x: usize) -> Option<u8> {
        (x < self.width).then(|| self.row[self.origin + x])
    }

    /// Write a pixel that may sit in the off-screen borders (sprites).
    pub fn set_signed(&mut self, x: i32, color: u8) {
        let index = self.origin as i64 + i64::from(x);
        if index < 0 {
            return;
        }
        if let Some(pixel) = self.row.get_mut(index as usize) {
            *pixel = color;
        }
    }

    /// Mutable run of up to `len` pixels starting at `start`.
    pub fn span_mut(&mut self, start: usize, len: usize) -> &mut [u8] {
        if start >= self.width {
            return &mut [];
        }
        let len = len.min(self.width - start);
        &mut self.row[self.origin + start..self.origin + start + len]
    }

    /// The on-screen part of the line.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.row[self.origin..self.origin + self.width]
    }
}
