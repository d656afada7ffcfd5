//! One character cell of graphics output.
//!
//! Every mode reduces to an 8-bit pattern plus up to three colour sources
//! per cell. The same data is gathered from chip memory for uncached draws
//! and read back from the line cache for cached ones, so both paths share
//! [`render`].

use emu_raster::VideoMode;

/// Inputs of one cell.
///
/// | Mode              | `data[0]`   | `data[1]`  | `data[2]`  |
/// |-------------------|-------------|------------|------------|
/// | text modes        | colour RAM  | ECM select | unused     |
/// | hires bitmap      | matrix high | matrix low | unused     |
/// | multicolor bitmap | matrix high | matrix low | colour RAM |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell {
    /// Bitmap or glyph row, MSB leftmost.
    pub pattern: u8,
    pub data: [u8; 3],
}

/// Eight output pixels; `None` lets the background show through.
pub type Pixels = [Option<u8>; 8];

/// Pixels and foreground mask of `cell`. `background` holds $D021-$D024.
#[must_use]
pub fn render(mode: VideoMode, background: &[u8; 4], cell: Cell) -> (Pixels, u8) {
    let Cell { pattern, data } = cell;
    match mode {
        VideoMode::StandardText => hires(pattern, data[0] & 0x0F, None),
        VideoMode::ExtendedText => {
            let select = usize::from(data[1] & 0x03);
            let back = (select != 0).then(|| background[select] & 0x0F);
            hires(pattern, data[0] & 0x0F, back)
        }
        VideoMode::MulticolorText => {
            if data[0] & 0x08 == 0 {
                hires(pattern, data[0] & 0x07, None)
            } else {
                multicolor(
                    pattern,
                    [
                        None,
                        Some(background[1] & 0x0F),
                        Some(background[2] & 0x0F),
                        Some(data[0] & 0x07),
                    ],
                )
            }
        }
        VideoMode::HiresBitmap => hires(pattern, data[0] & 0x0F, Some(data[1] & 0x0F)),
        VideoMode::MulticolorBitmap => multicolor(
            pattern,
            [
                None,
                Some(data[0] & 0x0F),
                Some(data[1] & 0x0F),
                Some(data[2] & 0x0F),
            ],
        ),
        VideoMode::Idle => hires(pattern, 0, None),
        VideoMode::Illegal => ([Some(0); 8], pair_mask(pattern)),
    }
}

fn hires(pattern: u8, foreground: u8, background: Option<u8>) -> (Pixels, u8) {
    let mut pixels = [background; 8];
    for (px, pixel) in pixels.iter_mut().enumerate() {
        if pattern & (0x80 >> px) != 0 {
            *pixel = Some(foreground);
        }
    }
    (pixels, pattern)
}

/// Double-width pixels from bit pairs. Only pairs `10` and `11` count as
/// foreground for sprite priority and collisions.
fn multicolor(pattern: u8, colors: [Option<u8>; 4]) -> (Pixels, u8) {
    let mut pixels = [None; 8];
    for pair in 0..4 {
        let bits = (pattern >> (6 - pair * 2)) & 0x03;
        let color = colors[usize::from(bits)];
        pixels[pair * 2] = color;
        pixels[pair * 2 + 1] = color;
    }
    (pixels, pair_mask(pattern))
}

fn pair_mask(pattern: u8) -> u8 {
    let high = pattern & 0xAA;
    high | (high >> 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKGROUND: [u8; 4] = [6, 7, 8, 9];

    #[test]
    fn standard_text_leaves_clear_bits_transparent() {
        let cell = Cell {
            pattern: 0b1000_0001,
            data: [1, 0, 0],
        };
        let (pixels, mask) = render(VideoMode::StandardText, &BACKGROUND, cell);
        assert_eq!(pixels[0], Some(1));
        assert_eq!(pixels[1], None);
        assert_eq!(pixels[7], Some(1));
        assert_eq!(mask, 0b1000_0001);
    }

    #[test]
    fn extended_text_selects_background() {
        let cell = Cell {
            pattern: 0,
            data: [1, 3, 0],
        };
        let (pixels, _) = render(VideoMode::ExtendedText, &BACKGROUND, cell);
        assert!(pixels.iter().all(|&p| p == Some(9)));
    }

    #[test]
    fn multicolor_text_needs_colour_bit_3() {
        let cell = Cell {
            pattern: 0b0001_1011,
            data: [0x0A, 0, 0],
        };
        let (pixels, mask) = render(VideoMode::MulticolorText, &BACKGROUND, cell);
        assert_eq!(
            pixels,
            [None, None, Some(7), Some(7), Some(8), Some(8), Some(2), Some(2)]
        );
        assert_eq!(mask, 0b0000_1111);

        let hires_cell = Cell {
            pattern: 0b1000_0000,
            data: [0x02, 0, 0],
        };
        let (pixels, _) = render(VideoMode::MulticolorText, &BACKGROUND, hires_cell);
        assert_eq!(pixels[0], Some(2));
        assert_eq!(pixels[1], None);
    }

    #[test]
    fn hires_bitmap_is_opaque() {
        let cell = Cell {
            pattern: 0b1100_0000,
            data: [2, 5, 0],
        };
        let (pixels, _) = render(VideoMode::HiresBitmap, &BACKGROUND, cell);
        assert_eq!(pixels[..2], [Some(2), Some(2)]);
        assert!(pixels[2..].iter().all(|&p| p == Some(5)));
    }

    #[test]
    fn illegal_mode_is_black_but_keeps_mask() {
        let cell = Cell {
            pattern: 0b1000_0000,
            data: [1, 1, 1],
        };
        let (pixels, mask) = render(VideoMode::Illegal, &BACKGROUND, cell);
        assert!(pixels.iter().all(|&p| p == Some(0)));
        assert_eq!(mask, 0b1100_0000);
    }
}
