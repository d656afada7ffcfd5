//! Recording chip used by the integration tests.
//!
//! Every graphics line shows the same row of symbols. A symbol is drawn as
//! a solid 8-pixel cell in the colour equal to its value; 0 leaves the
//! background showing.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use emu_raster::{
    CanvasBackend, FrameView, Geometry, LineBuffer, LineCache, Position, RasterChip, RasterConfig,
    RasterEngine, RasterLine, RasterState, Rect, Size, Span, SpriteStatus, Viewport, VideoMode,
    fill,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    FillCache { line: u32, force: bool },
    DrawLineCached { line: u32, span: (usize, usize) },
    DrawLine { line: u32 },
    DrawBackground { line: u32, start: usize, end: usize },
    DrawForeground { line: u32, start: usize, end: usize },
    DrawSprites,
}

#[derive(Debug, Default)]
pub struct MockChip {
    pub symbols: Vec<u8>,
    pub registers: [u32; 4],
    pub calls: Vec<Call>,
    pub sprites: usize,
    /// Sprite-sprite and sprite-background collisions every sprite pass reports.
    pub collisions: (u8, u8),
}

impl MockChip {
    pub fn new(columns: usize) -> Self {
        Self {
            symbols: vec![0; columns],
            ..Self::default()
        }
    }

    fn paint_cells(&self, line: &mut RasterLine<'_>, symbols: &[u8], start: usize, end: usize) {
        for column in start..=end {
            let symbol = symbols.get(column).copied().unwrap_or(0);
            let x = line.column_x(column);
            if symbol != 0 {
                line.pixels.fill(x, x + 7, symbol);
            }
            if let Some(mask) = line.gfx_mask.get_mut(emu_raster::GFX_MASK_BORDER + column) {
                *mask = if symbol != 0 { 0xFF } else { 0 };
            }
        }
    }
}

impl RasterChip for MockChip {
    type Register = usize;

    fn num_sprites(&self) -> usize {
        self.sprites
    }

    fn apply_change(&mut self, register: usize, value: u32) {
        if let Some(slot) = self.registers.get_mut(register) {
            *slot = value;
        }
    }

    fn fill_cache(
        &mut self,
        _mode: VideoMode,
        state: &RasterState,
        cache: &mut LineCache,
        span: &mut Span,
        force: bool,
    ) -> bool {
        self.calls.push(Call::FillCache {
            line: state.current_line,
            force,
        });
        let background = [state.background_color];
        let mut unused = Span::EMPTY;
        let force = fill(&mut cache.background_data[..1], &background, 1, &mut unused, force) || force;
        let columns = self.symbols.len();
        fill(&mut cache.foreground_data[..columns], &self.symbols, 1, span, force)
    }

    fn draw_line_cached(
        &mut self,
        _mode: VideoMode,
        line: &mut RasterLine<'_>,
        cache: &mut LineCache,
        span: Span,
    ) {
        let (start, end) = span.bounds().unwrap_or((0, 0));
        self.calls.push(Call::DrawLineCached {
            line: line.state.current_line,
            span: (start, end),
        });
        let background = cache.background_data[0];
        let xs = line.column_x(start);
        let xe = line.column_x(end + 1) - 1;
        line.pixels.fill(xs, xe, background);
        let symbols = cache.foreground_data.clone();
        self.paint_cells(line, &symbols, start, end);
    }

    fn draw_line(&mut self, _mode: VideoMode, line: &mut RasterLine<'_>) {
        self.calls.push(Call::DrawLine {
            line: line.state.current_line,
        });
        let columns = line.columns();
        let xs = line.gfx_x();
        let xe = line.column_x(columns) - 1;
        line.pixels.fill(xs, xe, line.state.background_color);
        let symbols = self.symbols.clone();
        self.paint_cells(line, &symbols, 0, columns - 1);
    }

    fn draw_background(&mut self, _mode: VideoMode, line: &mut RasterLine<'_>, start: usize, end: usize) {
        self.calls.push(Call::DrawBackground {
            line: line.state.current_line,
            start,
            end,
        });
        line.pixels.fill(start, end, line.state.background_color);
    }

    fn draw_foreground(&mut self, _mode: VideoMode, line: &mut RasterLine<'_>, start: usize, end: usize) {
        self.calls.push(Call::DrawForeground {
            line: line.state.current_line,
            start,
            end,
        });
        let symbols = self.symbols.clone();
        self.paint_cells(line, &symbols, start, end);
    }

    fn draw_sprites(&mut self, _pixels: &mut LineBuffer<'_>, _gfx_mask: &[u8], status: &mut SpriteStatus) {
        self.calls.push(Call::DrawSprites);
        (status.sprite_sprite_collisions, status.sprite_background_collisions) = self.collisions;
    }
}

/// 320 pixels wide with no side borders, 12 lines, graphics on lines 2..=9.
pub fn wide_geometry() -> Geometry {
    Geometry::new(
        Size::new(320, 12),
        Size::new(320, 8),
        Size::new(40, 1),
        Position::new(0, 2),
        0,
        11,
    )
}

/// 64 pixels wide with 16-pixel side borders, 10 lines.
pub fn bordered_geometry() -> Geometry {
    Geometry::new(
        Size::new(64, 10),
        Size::new(32, 4),
        Size::new(4, 1),
        Position::new(16, 3),
        1,
        8,
    )
}

pub fn engine_with(geometry: Geometry, config: RasterConfig) -> RasterEngine<MockChip> {
    let chip = MockChip::new(geometry.text_size.width as usize);
    RasterEngine::new(chip, geometry, Viewport::covering(&geometry), config)
}

pub fn wide_engine() -> RasterEngine<MockChip> {
    engine_with(wide_geometry(), RasterConfig::default())
}

pub fn run_frame(engine: &mut RasterEngine<MockChip>) {
    while !engine.step() {}
}

/// Step until `line` is the next line to be drawn.
pub fn step_to_line(engine: &mut RasterEngine<MockChip>, line: u32) {
    while engine.current_line() != line {
        engine.step();
    }
}

/// Draw frames until caching is fully established.
pub fn settle(engine: &mut RasterEngine<MockChip>) {
    for _ in 0..3 {
        run_frame(engine);
    }
    assert!(!engine.dont_cache());
    engine.chip_mut().calls.clear();
}

pub fn row(engine: &RasterEngine<MockChip>, y: usize) -> Vec<u8> {
    let geometry = engine.geometry();
    let origin = geometry.extra_offscreen_border_left as usize;
    let width = geometry.screen_size.width as usize;
    let row = engine.canvas().buffer().row(y).expect("row inside buffer");
    row[origin..origin + width].to_vec()
}

/// Backend that records every refreshed rectangle.
#[derive(Default, Clone)]
pub struct Recorder {
    pub areas: Rc<RefCell<Vec<Rect>>>,
    pub skip_next: Rc<RefCell<Vec<bool>>>,
}

impl CanvasBackend for Recorder {
    fn refresh(&mut self, _frame: &FrameView<'_>, area: Rect) {
        self.areas.borrow_mut().push(area);
    }

    fn skip_next_frame(&mut self) -> bool {
        let mut queue = self.skip_next.borrow_mut();
        if queue.is_empty() {
            false
        } else {
            queue.remove(0)
        }
    }
}
