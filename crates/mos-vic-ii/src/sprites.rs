//! Sprite fetch and the per-line sprite pass.

use emu_raster::{GFX_MASK_BORDER, LineBuffer, Sprite, SpriteStatus};

pub const NUM_SPRITES: usize = 8;

/// Unexpanded sprite width in pixels.
pub const SPRITE_WIDTH: u32 = 24;

const SPRITE_HEIGHT: u32 = 21;

/// Sprites active on one raster line, as read from the registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteFetch {
    pub sprites: [Sprite; NUM_SPRITES],
    pub data: [u32; NUM_SPRITES],
    pub dma_mask: u32,
    pub mc_color_1: u8,
    pub mc_color_2: u8,
}

impl SpriteFetch {
    /// Hand the fetched state to the engine for the line about to be drawn.
    pub fn apply(&self, status: &mut SpriteStatus) {
        let count = status.num_sprites().min(NUM_SPRITES);
        status.sprites[..count].copy_from_slice(&self.sprites[..count]);
        for (slot, &data) in status.sprite_data.iter_mut().zip(&self.data) {
            *slot = data;
        }
        status.dma_mask = self.dma_mask;
        status.new_dma_mask = self.dma_mask;
        status.mc_sprite_color_1 = self.mc_color_1;
        status.mc_sprite_color_2 = self.mc_color_2;
    }
}

/// Read sprite registers and pointers for `raster` (hardware line number).
///
/// `x_offset` converts a sprite X register into a raster x coordinate.
pub(crate) fn fetch(
    regs: &[u8; 0x40],
    memory: &[u8],
    screen_base: usize,
    raster: u32,
    x_offset: i32,
) -> SpriteFetch {
    let mut fetch = SpriteFetch {
        sprites: [Sprite::default(); NUM_SPRITES],
        data: [0; NUM_SPRITES],
        dma_mask: 0,
        mc_color_1: regs[0x25] & 0x0F,
        mc_color_2: regs[0x26] & 0x0F,
    };

    for i in 0..NUM_SPRITES {
        let bit = 1u8 << i;
        let y_expanded = regs[0x17] & bit != 0;
        let x_high = if regs[0x10] & bit != 0 { 256 } else { 0 };
        fetch.sprites[i] = Sprite {
            x: i32::from(regs[i * 2]) + x_high + x_offset,
            x_expanded: regs[0x1D] & bit != 0,
            y_expanded,
            multicolor: regs[0x1C] & bit != 0,
            color: regs[0x27 + i] & 0x0F,
            in_background: regs[0x1B] & bit != 0,
        };

        if regs[0x15] & bit == 0 {
            continue;
        }
        let top = u32::from(regs[i * 2 + 1]);
        let height = if y_expanded {
            SPRITE_HEIGHT * 2
        } else {
            SPRITE_HEIGHT
        };
        let Some(dy) = raster.checked_sub(top).filter(|&dy| dy < height) else {
            continue;
        };
        let row = if y_expanded { dy / 2 } else { dy } as usize;

        let pointer = memory
            .get(screen_base + 0x3F8 + i)
            .copied()
            .unwrap_or(0);
        let base = usize::from(pointer) * 64 + row * 3;
        let byte = |offset: usize| memory.get((base + offset) & 0x3FFF).copied().unwrap_or(0);
        fetch.data[i] = u32::from_be_bytes([byte(0), byte(1), byte(2), 0]);
        fetch.dma_mask |= u32::from(bit);
    }
    fetch
}

/// Colour of pixel `pos` (0-based, unexpanded) of a sprite, if set.
fn sprite_pixel(
    sprite: &Sprite,
    data: u32,
    pos: u32,
    mc_color_1: u8,
    mc_color_2: u8,
) -> Option<u8> {
    if sprite.multicolor {
        let pair = pos / 2;
        match (data >> (30 - pair * 2)) & 0x03 {
            0b01 => Some(mc_color_1),
            0b10 => Some(sprite.color),
            0b11 => Some(mc_color_2),
            _ => None,
        }
    } else {
        (data & (0x8000_0000 >> pos) != 0).then_some(sprite.color)
    }
}

/// Whether the graphics under raster pixel `x` is foreground.
fn foreground_at(gfx_mask: &[u8], mask_x: usize, x: usize) -> bool {
    let offset = x as i64 - mask_x as i64;
    let column = GFX_MASK_BORDER as i64 + offset.div_euclid(8);
    let bit = offset.rem_euclid(8);
    usize::try_from(column)
        .ok()
        .and_then(|column| gfx_mask.get(column))
        .is_some_and(|&mask| mask & (0x80 >> bit) != 0)
}

/// Draw every sprite fetching on this line and record collisions.
///
/// Sprites are painted from 7 down to 0 so lower numbers end up on top.
/// A sprite behind the graphics is hidden where the mask has foreground.
/// `coverage` is scratch space, one byte per pixel.
pub(crate) fn draw(
    pixels: &mut LineBuffer<'_>,
    gfx_mask: &[u8],
    mask_x: usize,
    status: &mut SpriteStatus,
    coverage: &mut Vec<u8>,
) {
    let width = pixels.width();
    coverage.clear();
    coverage.resize(width, 0);

    let count = status.num_sprites().min(NUM_SPRITES);
    for i in (0..count).rev() {
        if !status.is_active(i) {
            continue;
        }
        let sprite = status.sprites[i];
        let data = status.sprite_data.get(i).copied().unwrap_or(0);
        let scale = if sprite.x_expanded { 2 } else { 1 };

        for screen in 0..status.pixel_width(sprite.x_expanded) {
            let x = i64::from(sprite.x) + i64::from(screen);
            let Ok(x) = usize::try_from(x) else {
                continue;
            };
            if x >= width {
                break;
            }
            let Some(color) = sprite_pixel(
                &sprite,
                data,
                screen / scale,
                status.mc_sprite_color_1,
                status.mc_sprite_color_2,
            ) else {
                continue;
            };
            coverage[x] |= 1 << i;
            if sprite.in_background && foreground_at(gfx_mask, mask_x, x) {
                continue;
            }
            pixels.set(x, color);
        }
    }

    let mut sprite_sprite = 0;
    let mut sprite_background = 0;
    for (x, &covered) in coverage.iter().enumerate() {
        if covered.count_ones() >= 2 {
            sprite_sprite |= covered;
        }
        if covered != 0 && foreground_at(gfx_mask, mask_x, x) {
            sprite_background |= covered;
        }
    }
    status.sprite_sprite_collisions = sprite_sprite;
    status.sprite_background_collisions = sprite_background;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_with(sprite: Sprite, data: u32) -> SpriteStatus {
        let mut status = SpriteStatus::new(NUM_SPRITES, SPRITE_WIDTH);
        status.sprites[0] = sprite;
        status.sprite_data[0] = data;
        status.dma_mask = 1;
        status
    }

    #[test]
    fn hires_sprite_draws_set_bits() {
        let sprite = Sprite {
            x: 10,
            color: 2,
            ..Sprite::default()
        };
        let mut status = status_with(sprite, 0xA000_0000);
        let mut row = vec![0; 64];
        let mut pixels = LineBuffer::new(&mut row, 0, 64);
        draw(&mut pixels, &[], 0, &mut status, &mut Vec::new());

        assert_eq!(&row[10..14], &[2, 0, 2, 0]);
    }

    #[test]
    fn expanded_sprite_doubles_pixels() {
        let sprite = Sprite {
            x: 0,
            x_expanded: true,
            color: 5,
            ..Sprite::default()
        };
        let mut status = status_with(sprite, 0x8000_0000);
        let mut row = vec![0; 64];
        let mut pixels = LineBuffer::new(&mut row, 0, 64);
        draw(&mut pixels, &[], 0, &mut status, &mut Vec::new());

        assert_eq!(&row[..3], &[5, 5, 0]);
    }

    #[test]
    fn multicolor_sprite_uses_shared_colours() {
        let sprite = Sprite {
            x: 0,
            multicolor: true,
            color: 3,
            ..Sprite::default()
        };
        let mut status = status_with(sprite, 0b01_10_11_00 << 24);
        status.mc_sprite_color_1 = 8;
        status.mc_sprite_color_2 = 9;
        let mut row = vec![0; 64];
        let mut pixels = LineBuffer::new(&mut row, 0, 64);
        draw(&mut pixels, &[], 0, &mut status, &mut Vec::new());

        assert_eq!(&row[..8], &[8, 8, 3, 3, 9, 9, 0, 0]);
    }

    #[test]
    fn overlapping_sprites_collide_and_lowest_wins() {
        let mut status = SpriteStatus::new(NUM_SPRITES, SPRITE_WIDTH);
        for (i, color) in [(0, 1), (3, 4)] {
            status.sprites[i] = Sprite {
                x: 0,
                color,
                ..Sprite::default()
            };
            status.sprite_data[i] = 0x8000_0000;
        }
        status.dma_mask = 0b1001;
        let mut row = vec![0; 32];
        let mut pixels = LineBuffer::new(&mut row, 0, 32);
        draw(&mut pixels, &[], 0, &mut status, &mut Vec::new());

        assert_eq!(row[0], 1);
        assert_eq!(status.sprite_sprite_collisions, 0b1001);
        assert_eq!(status.sprite_background_collisions, 0);
    }

    #[test]
    fn background_sprite_hides_behind_foreground() {
        let sprite = Sprite {
            x: 16,
            color: 7,
            in_background: true,
            ..Sprite::default()
        };
        let mut status = status_with(sprite, 0xC000_0000);
        // Column 0 starts at x = 16 and has its leftmost pixel set.
        let mut mask = vec![0; GFX_MASK_BORDER * 2 + 1];
        mask[GFX_MASK_BORDER] = 0x80;
        let mut row = vec![0; 32];
        let mut pixels = LineBuffer::new(&mut row, 0, 32);
        draw(&mut pixels, &mask, 16, &mut status, &mut Vec::new());

        assert_eq!(row[16], 0);
        assert_eq!(row[17], 7);
        assert_eq!(status.sprite_background_collisions, 1);
    }

    #[test]
    fn fetch_reads_pointer_and_row() {
        let mut regs = [0; 0x40];
        let mut memory = vec![0; 0x4000];
        regs[0x15] = 0x01;
        regs[0x00] = 24;
        regs[0x01] = 50;
        memory[0x07F8] = 0x80;
        memory[0x2000 + 3] = 0xFF;

        let on_line = fetch(&regs, &memory, 0x0400, 51, 24);
        assert_eq!(on_line.dma_mask, 1);
        assert_eq!(on_line.sprites[0].x, 48);
        assert_eq!(on_line.data[0], 0xFF00_0000);

        let above = fetch(&regs, &memory, 0x0400, 49, 24);
        assert_eq!(above.dma_mask, 0);
    }
}
