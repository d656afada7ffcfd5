//! MOS 6569 VIC-II (PAL) rendered through the cached raster engine.
//!
//! The chip owns its registers, a 16 KiB view of the selected video bank and
//! the colour RAM. Every raster line goes through [`run_line`], which latches
//! the sprites for the line and steps the engine. Register writes made while
//! the beam is inside a line go through [`write_register`] so they land at
//! the right pixel.
//!
//! Pixel synthesis follows the mode definitions but not the cycle-exact
//! fetch timing: there are no badlines, and the text row is derived from the
//! raster line.

mod cell;
mod palette;
mod sprites;

use emu_core::{Observable, Value};
use emu_raster::{
    GFX_MASK_BORDER, Geometry, LineBuffer, LineCache, Phase, Position, RasterChip, RasterConfig,
    RasterEngine, RasterError, RasterField, RasterLine, RasterState, Size, Span, SpriteStatus,
    VideoMode, Viewport, fill, fill_nibbles, fill_text, fill_wrapped,
};
use log::{debug, trace};

pub use cell::{Cell, Pixels, render};
pub use palette::{PALETTE, argb};
pub use sprites::{NUM_SPRITES, SPRITE_WIDTH, SpriteFetch};

/// Pixels per frame buffer row: 52 visible cycles of 8 pixels.
pub const SCREEN_WIDTH: u32 = 416;

/// Frame buffer rows: raster lines 6 to 289.
pub const SCREEN_HEIGHT: u32 = 284;

/// Hardware raster line shown on frame buffer row 0.
pub const FIRST_RASTER_LINE: u32 = 6;

/// Left edge of the 40-column display window.
pub const DISPLAY_X: u32 = 48;

/// Top of the 25-row display window ($30 in raster lines).
pub const DISPLAY_Y: u32 = 0x30 - FIRST_RASTER_LINE;

const COLUMNS: usize = 40;
const ROWS: usize = 25;

/// Sprite X register value at the left edge of the display window.
const SPRITE_X_ORIGIN: i32 = 24;

const BANK_SIZE: usize = 0x4000;
const BITMAP_SIZE: usize = 0x2000;

/// Geometry of the PAL frame buffer.
#[must_use]
pub fn pal_geometry() -> Geometry {
    Geometry::new(
        Size::new(SCREEN_WIDTH, SCREEN_HEIGHT),
        Size::new(320, 200),
        Size::new(COLUMNS as u32, ROWS as u32),
        Position::new(DISPLAY_X, DISPLAY_Y),
        0,
        SCREEN_HEIGHT - 1,
    )
}

/// Video mode selected by ECM/BMM ($D011) and MCM ($D016).
#[must_use]
pub fn mode_from_registers(d011: u8, d016: u8) -> VideoMode {
    let ecm = d011 & 0x40 != 0;
    let bmm = d011 & 0x20 != 0;
    let mcm = d016 & 0x10 != 0;
    match (ecm, bmm, mcm) {
        (false, false, false) => VideoMode::StandardText,
        (false, false, true) => VideoMode::MulticolorText,
        (false, true, false) => VideoMode::HiresBitmap,
        (false, true, true) => VideoMode::MulticolorBitmap,
        (true, false, false) => VideoMode::ExtendedText,
        _ => VideoMode::Illegal,
    }
}

/// VIC-II 6569 PAL chip state.
pub struct VicII {
    /// Registers $D000-$D03F.
    regs: [u8; 0x40],
    /// The video bank as the chip sees it.
    memory: Vec<u8>,
    color_ram: Vec<u8>,
    /// Pixel x where the graphics mask of the last drawn line starts.
    mask_x: usize,
    /// Per-pixel sprite coverage for the sprite pass.
    coverage: Vec<u8>,
}

impl VicII {
    #[must_use]
    pub fn new() -> Self {
        let mut regs = [0; 0x40];
        regs[0x11] = 0x1B;
        regs[0x16] = 0xC8;
        regs[0x18] = 0x14;
        regs[0x20] = 0x0E;
        regs[0x21] = 0x06;
        Self {
            regs,
            memory: vec![0; BANK_SIZE],
            color_ram: vec![0; 0x400],
            mask_x: DISPLAY_X as usize,
            coverage: Vec::with_capacity(SCREEN_WIDTH as usize),
        }
    }

    /// Move the chip into an engine using the PAL geometry. Border and
    /// background colours are taken from the registers.
    #[must_use]
    pub fn into_engine(self, config: RasterConfig) -> RasterEngine<Self> {
        let geometry = pal_geometry();
        let mode = self.video_mode();
        let border = self.regs[0x20] & 0x0F;
        let background = self.regs[0x21] & 0x0F;
        let mut engine = RasterEngine::new(self, geometry, Viewport::covering(&geometry), config);
        let state = engine.state_mut();
        state.border_color = border;
        state.background_color = background;
        engine.set_video_mode(mode);
        engine
    }

    /// Write a byte of the video bank. The address wraps at 16 KiB.
    pub fn poke(&mut self, addr: u16, value: u8) {
        self.memory[usize::from(addr) & (BANK_SIZE - 1)] = value;
    }

    /// Copy `data` into the video bank starting at `addr`.
    pub fn load(&mut self, addr: u16, data: &[u8]) {
        for (offset, &byte) in data.iter().enumerate() {
            let at = (usize::from(addr) + offset) & (BANK_SIZE - 1);
            self.memory[at] = byte;
        }
    }

    pub fn poke_color(&mut self, addr: u16, value: u8) {
        self.color_ram[usize::from(addr) & 0x3FF] = value & 0x0F;
    }

    /// Register value without side effects.
    #[must_use]
    pub fn peek(&self, reg: u8) -> u8 {
        self.regs[usize::from(reg & 0x3F)]
    }

    /// Register read as the CPU sees it. The collision registers clear on
    /// read.
    pub fn read(&mut self, reg: u8) -> u8 {
        let reg = usize::from(reg & 0x3F);
        let value = self.regs[reg];
        if reg == 0x1E || reg == 0x1F {
            self.regs[reg] = 0;
        }
        value
    }

    #[must_use]
    pub fn video_mode(&self) -> VideoMode {
        mode_from_registers(self.regs[0x11], self.regs[0x16])
    }

    /// Sprites active on frame buffer row `line`.
    #[must_use]
    pub fn sprite_fetch(&self, line: u32) -> SpriteFetch {
        sprites::fetch(
            &self.regs,
            &self.memory,
            self.screen_base(),
            line + FIRST_RASTER_LINE,
            DISPLAY_X as i32 - SPRITE_X_ORIGIN,
        )
    }

    fn screen_base(&self) -> usize {
        usize::from(self.regs[0x18] >> 4) * 0x400
    }

    fn char_base(&self) -> usize {
        usize::from((self.regs[0x18] >> 1) & 0x07) * 0x800
    }

    fn bitmap_base(&self) -> usize {
        if self.regs[0x18] & 0x08 != 0 {
            BITMAP_SIZE
        } else {
            0
        }
    }

    /// Screen codes of text row `row`.
    fn matrix(&self, row: usize) -> &[u8] {
        let start = self.screen_base() + row * COLUMNS;
        &self.memory[start..start + COLUMNS]
    }

    fn colors(&self, row: usize) -> &[u8] {
        &self.color_ram[row * COLUMNS..(row + 1) * COLUMNS]
    }

    fn bitmap(&self) -> &[u8] {
        let base = self.bitmap_base();
        &self.memory[base..base + BITMAP_SIZE]
    }

    fn glyph(&self, code: u8, char_row: usize) -> u8 {
        self.memory[(self.char_base() + usize::from(code) * 8 + char_row) & (BANK_SIZE - 1)]
    }

    /// Byte shown while the sequencer is idle.
    fn idle_byte(&self) -> u8 {
        let addr = if self.regs[0x11] & 0x40 != 0 {
            0x39FF
        } else {
            0x3FFF
        };
        self.memory[addr]
    }

    /// $D021-$D024 as seen by `state`. $D021 belongs to the engine so it
    /// follows mid-line background changes.
    fn background(&self, state: &RasterState) -> [u8; 4] {
        [
            state.background_color & 0x0F,
            self.regs[0x22] & 0x0F,
            self.regs[0x23] & 0x0F,
            self.regs[0x24] & 0x0F,
        ]
    }

    /// Cell data for `column` straight from memory.
    fn gather(&self, mode: VideoMode, state: &RasterState, column: usize) -> Cell {
        let (row, char_row) = matrix_position(state);
        let code = self.matrix(row)[column];
        let color = self.colors(row)[column];
        match mode {
            VideoMode::StandardText | VideoMode::MulticolorText => Cell {
                pattern: self.glyph(code, char_row),
                data: [color, 0, 0],
            },
            VideoMode::ExtendedText => Cell {
                pattern: self.glyph(code & 0x3F, char_row),
                data: [color, code >> 6, 0],
            },
            VideoMode::HiresBitmap | VideoMode::MulticolorBitmap => Cell {
                pattern: self.bitmap()[bitmap_offset(row, column, char_row)],
                data: [code >> 4, code & 0x0F, color],
            },
            VideoMode::Idle => Cell {
                pattern: self.idle_byte(),
                data: [0; 3],
            },
            VideoMode::Illegal => Cell::default(),
        }
    }
}

impl Default for VicII {
    fn default() -> Self {
        Self::new()
    }
}

/// Text row and pixel row within it for the current line.
fn matrix_position(state: &RasterState) -> (usize, usize) {
    let y = state.current_line.saturating_sub(state.display_ystart) as usize;
    ((y / 8).min(ROWS - 1), y % 8)
}

fn bitmap_offset(row: usize, column: usize, char_row: usize) -> usize {
    (row * COLUMNS * 8 + column * 8 + char_row) & (BITMAP_SIZE - 1)
}

/// Paint one cell. Transparent pixels get `opaque_background` when given.
fn paint(
    line: &mut RasterLine<'_>,
    column: usize,
    pixels: Pixels,
    opaque_background: Option<u8>,
) {
    let x = line.column_x(column);
    for (i, &pixel) in pixels.iter().enumerate() {
        if let Some(color) = pixel.or(opaque_background) {
            line.pixels.set(x + i, color);
        }
    }
}

fn store_mask(gfx_mask: &mut [u8], column: usize, mask: u8) {
    if let Some(slot) = gfx_mask.get_mut(GFX_MASK_BORDER + column) {
        *slot = mask;
    }
}

impl RasterChip for VicII {
    /// Register offset from $D000.
    type Register = u8;

    fn num_sprites(&self) -> usize {
        NUM_SPRITES
    }

    fn sprite_width(&self) -> u32 {
        SPRITE_WIDTH
    }

    fn apply_change(&mut self, register: u8, value: u32) {
        self.regs[usize::from(register & 0x3F)] = value as u8;
    }

    fn fill_cache(
        &mut self,
        mode: VideoMode,
        state: &RasterState,
        cache: &mut LineCache,
        span: &mut Span,
        force: bool,
    ) -> bool {
        let (row, char_row) = matrix_position(state);
        let mut force = force;

        let background = self.background(state);
        let mut unused = Span::EMPTY;
        force |= fill(&mut cache.background_data[..4], &background, 1, &mut unused, force);
        let key = u32::from(self.regs[0x18]);
        if cache.font_key != key {
            cache.font_key = key;
            force = true;
        }

        let matrix = self.matrix(row);
        let colors = self.colors(row);
        let foreground = &mut cache.foreground_data[..COLUMNS];
        let changed = match mode {
            VideoMode::StandardText | VideoMode::MulticolorText => {
                fill_text(foreground, matrix, |code| self.glyph(code, char_row), span, force)
                    | fill(&mut cache.color_data_1[..COLUMNS], colors, 1, span, force)
            }
            VideoMode::ExtendedText => {
                let mut select = [0; COLUMNS];
                for (slot, &code) in select.iter_mut().zip(matrix) {
                    *slot = code >> 6;
                }
                fill_text(foreground, matrix, |code| self.glyph(code & 0x3F, char_row), span, force)
                    | fill(&mut cache.color_data_1[..COLUMNS], colors, 1, span, force)
                    | fill(&mut cache.color_data_2[..COLUMNS], &select, 1, span, force)
            }
            VideoMode::HiresBitmap | VideoMode::MulticolorBitmap => {
                let start = bitmap_offset(row, 0, char_row);
                fill_wrapped(foreground, self.bitmap(), start, 8, BITMAP_SIZE - 1, span, force)
                    | fill_nibbles(
                        &mut cache.color_data_1[..COLUMNS],
                        &mut cache.color_data_2[..COLUMNS],
                        matrix,
                        1,
                        span,
                        force,
                    )
                    | (mode == VideoMode::MulticolorBitmap
                        && fill(&mut cache.color_data_3[..COLUMNS], colors, 1, span, force))
            }
            VideoMode::Idle => fill(foreground, &[self.idle_byte(); COLUMNS], 1, span, force),
            VideoMode::Illegal => fill(foreground, &[0; COLUMNS], 1, span, force),
        };
        changed || force
    }

    fn draw_line_cached(
        &mut self,
        mode: VideoMode,
        line: &mut RasterLine<'_>,
        cache: &mut LineCache,
        span: Span,
    ) {
        let Some((start, end)) = span.bounds() else {
            return;
        };
        self.mask_x = line.gfx_x();
        let background = [
            cache.background_data[0],
            cache.background_data[1],
            cache.background_data[2],
            cache.background_data[3],
        ];
        for column in start..=end.min(COLUMNS - 1) {
            let cell = Cell {
                pattern: cache.foreground_data[column],
                data: [
                    cache.color_data_1[column],
                    cache.color_data_2[column],
                    cache.color_data_3[column],
                ],
            };
            let (pixels, mask) = render(mode, &background, cell);
            paint(line, column, pixels, Some(background[0]));
            store_mask(&mut cache.gfx_mask, column, mask);
        }
    }

    fn draw_line(&mut self, mode: VideoMode, line: &mut RasterLine<'_>) {
        self.mask_x = line.gfx_x();
        let background = self.background(line.state);
        for column in 0..COLUMNS {
            let cell = self.gather(mode, line.state, column);
            let (pixels, mask) = render(mode, &background, cell);
            paint(line, column, pixels, Some(background[0]));
            store_mask(line.gfx_mask, column, mask);
        }
    }

    fn draw_background(
        &mut self,
        mode: VideoMode,
        line: &mut RasterLine<'_>,
        start: usize,
        end: usize,
    ) {
        let color = if mode == VideoMode::Illegal {
            0
        } else {
            line.state.background_color
        };
        line.pixels.fill(start, end, color);
    }

    fn draw_foreground(
        &mut self,
        mode: VideoMode,
        line: &mut RasterLine<'_>,
        start: usize,
        end: usize,
    ) {
        self.mask_x = line.gfx_x();
        let background = self.background(line.state);
        for column in start..=end.min(COLUMNS - 1) {
            let cell = self.gather(mode, line.state, column);
            let (pixels, mask) = render(mode, &background, cell);
            paint(line, column, pixels, None);
            store_mask(line.gfx_mask, column, mask);
        }
    }

    fn draw_sprites(
        &mut self,
        pixels: &mut LineBuffer<'_>,
        gfx_mask: &[u8],
        status: &mut SpriteStatus,
    ) {
        sprites::draw(pixels, gfx_mask, self.mask_x, status, &mut self.coverage);
    }
}

/// Latch the sprites for the next line and draw it. Returns `true` when the
/// line completed a frame.
///
/// The line's collisions are latched into $D01E/$D01F afterwards. A cached
/// line skips the sprite routine and only restores its recorded collisions,
/// so the registers are fed from the sprite status rather than from the
/// sprite pass.
pub fn run_line(engine: &mut RasterEngine<VicII>) -> bool {
    let fetch = engine.chip().sprite_fetch(engine.current_line());
    fetch.apply(engine.sprite_status_mut());
    let frame_done = engine.step();

    let status = engine.sprite_status();
    let sprite_sprite = status.sprite_sprite_collisions;
    let sprite_background = status.sprite_background_collisions;
    let vic = engine.chip_mut();
    vic.regs[0x1E] |= sprite_sprite;
    vic.regs[0x1F] |= sprite_background;
    frame_done
}

/// Draw lines until the frame completes.
pub fn run_frame(engine: &mut RasterEngine<VicII>) {
    while !run_line(engine) {}
}

/// Store a CPU write to `reg` that happens at raster pixel `x` of the
/// current line.
///
/// Colour and mode registers are scheduled so the change takes effect at
/// `x`; sprite registers wait for the sprite pass; anything else is applied
/// at once.
pub fn write_register(
    engine: &mut RasterEngine<VicII>,
    reg: u8,
    value: u8,
    x: i32,
) -> Result<(), RasterError> {
    let reg = reg & 0x3F;
    let column = (x - DISPLAY_X as i32).div_euclid(8);
    trace!("VIC-II ${:02X} <- ${value:02X} at x={x}", 0xD000 + u16::from(reg));

    match reg {
        0x20 => {
            engine.chip_mut().regs[0x20] = value;
            engine.schedule_raster(
                Phase::Border,
                x,
                RasterField::BorderColor,
                u32::from(value & 0x0F),
            )
        }
        0x21 => {
            engine.chip_mut().regs[0x21] = value;
            engine.schedule_raster(
                Phase::Background,
                x,
                RasterField::BackgroundColor,
                u32::from(value & 0x0F),
            )
        }
        0x22..=0x24 => engine.schedule_chip(Phase::Background, x, reg, u32::from(value)),
        0x11 | 0x16 => {
            let chip = engine.chip();
            let (d011, d016) = if reg == 0x11 {
                (value, chip.regs[0x16])
            } else {
                (chip.regs[0x11], value)
            };
            let mode = mode_from_registers(d011, d016);
            if mode != chip.video_mode() {
                debug!("VIC-II mode -> {mode} at column {column}");
            }
            engine.schedule_chip(Phase::Foreground, column, reg, u32::from(value))?;
            engine.schedule_raster(Phase::Foreground, column, RasterField::VideoMode, mode.index())
        }
        0x18 => engine.schedule_chip(Phase::Foreground, column, reg, u32::from(value)),
        0x00..=0x10 | 0x15 | 0x17 | 0x1B..=0x1D | 0x25..=0x2E => {
            engine.schedule_chip(Phase::Sprites, x, reg, u32::from(value))
        }
        _ => engine.schedule_chip(Phase::Background, 0, reg, u32::from(value)),
    }
}

impl Observable for VicII {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "mode" => Some(self.video_mode().to_string().as_str().into()),
            "screen_base" => Some(Value::from(self.screen_base() as u32)),
            "char_base" => Some(Value::from(self.char_base() as u32)),
            "bitmap_base" => Some(Value::from(self.bitmap_base() as u32)),
            "border_color" => Some(self.regs[0x20].into()),
            "background_color" => Some(self.regs[0x21].into()),
            "collisions.sprite" => Some(self.regs[0x1E].into()),
            "collisions.background" => Some(self.regs[0x1F].into()),
            _ => path
                .strip_prefix("reg.")
                .and_then(|n| u8::from_str_radix(n, 16).ok())
                .filter(|&reg| reg < 0x40)
                .map(|reg| self.peek(reg).into()),
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "mode",
            "screen_base",
            "char_base",
            "bitmap_base",
            "border_color",
            "background_color",
            "collisions.sprite",
            "collisions.background",
            "reg.<hex>",
        ]
    }
}
