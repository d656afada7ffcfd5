//! Frame buffer save and restore.
//!
//! Layout: current line, width, height, a reserved word, the padded primary
//! field, then for interlace-capable canvases the padded secondary field and
//! the active field index. All words are little-endian `u32`.

use emu_core::{SnapshotError, SnapshotReader, SnapshotWriter};
use log::{debug, warn};

use crate::buffer::DrawBuffer;
use crate::engine::RasterEngine;
use crate::error::RasterError;
use crate::modes::RasterChip;

impl<C: RasterChip> RasterEngine<C> {
    pub fn write_snapshot(&self, w: &mut SnapshotWriter) {
        let buffer = &self.canvas.buffer;
        w.write_u32(self.state.current_line);
        w.write_u32(buffer.width());
        w.write_u32(buffer.height());
        w.write_u32(0);
        w.write_bytes(buffer.padded(0));
        if buffer.interlace_allowed() {
            w.write_bytes(buffer.padded(1));
            w.write_u32(buffer.active_field() as u32);
        }
    }

    /// Restore a frame buffer written by [`write_snapshot`](Self::write_snapshot).
    /// The engine is left untouched on error.
    pub fn read_snapshot(&mut self, r: &mut SnapshotReader<'_>) -> Result<(), RasterError> {
        let line = r.read_u32()?;
        let width = r.read_u32()?;
        let height = r.read_u32()?;
        let _reserved = r.read_u32()?;

        // Line drawing addresses the buffer with the current geometry.
        if width == 0
            || width != self.geometry.frame_buffer_width()
            || height < self.geometry.frame_buffer_height()
        {
            warn!("snapshot frame buffer {width}x{height} rejected");
            return Err(RasterError::SnapshotGeometry { width, height });
        }

        let interlace = self.config.interlace_allowed;
        let size = DrawBuffer::padded_size(width, height);
        let needed = if interlace { size * 2 + 4 } else { size };
        if r.remaining() < needed {
            return Err(SnapshotError::UnexpectedEnd {
                needed,
                remaining: r.remaining(),
            }
            .into());
        }

        let mut buffer = DrawBuffer::new(width, height, interlace);
        r.read_into(buffer.padded_mut(0))?;
        if interlace {
            r.read_into(buffer.padded_mut(1))?;
            let field = r.read_u32()?;
            buffer.set_active_field(field as usize);
        }

        let line = if line < self.geometry.screen_size.height {
            line
        } else {
            warn!("snapshot raster line {line} out of range, restarting frame");
            0
        };

        self.fake_line = vec![0; width as usize];
        self.canvas.buffer = buffer;
        self.state.current_line = line;
        self.update_draw_row();
        self.force_repaint();
        debug!("restored {width}x{height} frame buffer at line {line}");
        Ok(())
    }
}
