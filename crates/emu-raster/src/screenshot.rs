//! PNG screenshots of the displayed area.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::engine::RasterEngine;
use crate::error::RasterError;
use crate::modes::RasterChip;

impl<C: RasterChip> RasterEngine<C> {
    /// Displayed lines of the active field converted to RGBA through an
    /// ARGB32 `palette`. Indices past the palette come out black.
    ///
    /// Returns width, height and the pixel bytes.
    pub fn screenshot_rgba(&self, palette: &[u32]) -> Result<(u32, u32, Vec<u8>), RasterError> {
        let buffer = &self.canvas.buffer;
        let origin = self.geometry.extra_offscreen_border_left as usize;
        let width = self.geometry.screen_size.width;
        let first = self.geometry.first_displayed_line;
        let last = self
            .geometry
            .last_displayed_line
            .min(buffer.height().saturating_sub(1));
        if width == 0 || first > last {
            return Err(RasterError::EmptyScreenshot);
        }
        let height = last - first + 1;

        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for y in first..=last {
            let pixels = buffer
                .row(y as usize)
                .and_then(|row| row.get(origin..origin + width as usize))
                .ok_or(RasterError::EmptyScreenshot)?;
            for &index in pixels {
                let pixel = palette.get(index as usize).copied().unwrap_or(0xFF00_0000);
                rgba.push(((pixel >> 16) & 0xFF) as u8);
                rgba.push(((pixel >> 8) & 0xFF) as u8);
                rgba.push((pixel & 0xFF) as u8);
                rgba.push(0xFF);
            }
        }
        Ok((width, height, rgba))
    }

    /// Encode the displayed area as PNG into `w`.
    pub fn write_screenshot<W: Write>(&self, palette: &[u32], w: W) -> Result<(), RasterError> {
        let (width, height, rgba) = self.screenshot_rgba(palette)?;
        let mut encoder = png::Encoder::new(w, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&rgba)?;
        writer.finish()?;
        Ok(())
    }

    /// Save the displayed area as a PNG file.
    pub fn save_screenshot(&self, palette: &[u32], path: &Path) -> Result<(), RasterError> {
        let file = fs::File::create(path)?;
        self.write_screenshot(palette, BufWriter::new(file))
    }
}
