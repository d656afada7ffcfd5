//! Sprite state shared between a chip model and the engine.
//!
//! The chip owns the meaning of every field; the engine only reads positions
//! and fetched data to extend dirty ranges, latches the DMA mask at the end
//! of each line, and hands the whole block to the chip's sprite routine.

/// One hardware sprite as of the current line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sprite {
    /// Left edge in raster x; may be negative or past the line end.
    pub x: i32,
    pub x_expanded: bool,
    pub y_expanded: bool,
    pub multicolor: bool,
    pub color: u8,
    /// Drawn behind foreground pixels.
    pub in_background: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteStatus {
    pub sprites: Vec<Sprite>,
    /// Unexpanded sprite width in pixels.
    pub sprite_width: u32,
    /// Sprites fetching data on the current line.
    pub dma_mask: u32,
    /// DMA mask that takes effect on the next line.
    pub new_dma_mask: u32,
    /// Fetched bit pattern per sprite, MSB leftmost.
    pub sprite_data: Vec<u32>,
    pub mc_sprite_color_1: u8,
    pub mc_sprite_color_2: u8,
    /// Collisions produced by the most recent sprite pass.
    pub sprite_sprite_collisions: u8,
    pub sprite_background_collisions: u8,
}

impl SpriteStatus {
    #[must_use]
    pub fn new(num_sprites: usize, sprite_width: u32) -> Self {
        Self {
            sprites: vec![Sprite::default(); num_sprites],
            sprite_width,
            dma_mask: 0,
            new_dma_mask: 0,
            sprite_data: vec![0; num_sprites],
            mc_sprite_color_1: 0,
            mc_sprite_color_2: 0,
            sprite_sprite_collisions: 0,
            sprite_background_collisions: 0,
        }
    }

    #[must_use]
    pub fn num_sprites(&self) -> usize {
        self.sprites.len()
    }

    /// Whether sprite `index` fetches data on this line.
    #[must_use]
    pub fn is_active(&self, index: usize) -> bool {
        index < 32 && self.dma_mask & (1 << index) != 0
    }

    /// On-screen width of a sprite with the given expansion.
    #[must_use]
    pub fn pixel_width(&self, x_expanded: bool) -> u32 {
        if x_expanded {
            self.sprite_width * 2
        } else {
            self.sprite_width
        }
    }

    /// Make the next line's DMA mask current.
    pub fn latch_dma_mask(&mut self) {
        self.dma_mask = self.new_dma_mask;
    }
}

impl Default for SpriteStatus {
    fn default() -> Self {
        Self::new(0, 24)
    }
}
