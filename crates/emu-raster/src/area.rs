//! Frame-level dirty rectangle.

use crate::geometry::Viewport;

/// Inclusive pixel rectangle in raster coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub xs: u32,
    pub ys: u32,
    pub xe: u32,
    pub ye: u32,
}

impl Rect {
    /// Zero for an inverted rectangle.
    #[must_use]
    pub const fn width(&self) -> u32 {
        match self.xe.checked_sub(self.xs) {
            Some(d) => d + 1,
            None => 0,
        }
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        match self.ye.checked_sub(self.ys) {
            Some(d) => d + 1,
            None => 0,
        }
    }

    /// Intersection with the viewport window, `None` if they do not overlap.
    #[must_use]
    pub fn clip(&self, viewport: &Viewport, screen_width: u32) -> Option<Rect> {
        if screen_width == 0 {
            return None;
        }
        let xs = self.xs.max(viewport.first_x);
        let xe = self.xe.min(screen_width - 1);
        let ys = self.ys.max(viewport.first_line);
        let ye = self.ye.min(viewport.last_line);
        (xs <= xe && ys <= ye).then_some(Rect { xs, ys, xe, ye })
    }
}

/// Union of the line spans touched during one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateArea {
    rect: Option<Rect>,
}

impl UpdateArea {
    /// Grow the area to cover `[xs, xe]` on line `y`. Inverted spans are ignored.
    pub fn add_line(&mut self, y: u32, xs: u32, xe: u32) {
        if xs > xe {
            return;
        }
        self.rect = Some(match self.rect {
            None => Rect {
                xs,
                ys: y,
                xe,
                ye: y,
            },
            Some(r) => Rect {
                xs: r.xs.min(xs),
                ys: r.ys.min(y),
                xe: r.xe.max(xe),
                ye: r.ye.max(y),
            },
        });
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.rect.is_none()
    }

    #[must_use]
    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }

    /// Hand the accumulated rectangle over and start a new frame.
    pub fn take(&mut self) -> Option<Rect> {
        self.rect.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_union_into_bounding_box() {
        let mut area = UpdateArea::default();
        assert!(area.is_null());
        area.add_line(50, 100, 107);
        area.add_line(52, 24, 40);
        assert_eq!(
            area.rect(),
            Some(Rect {
                xs: 24,
                ys: 50,
                xe: 107,
                ye: 52
            })
        );
        assert!(area.take().is_some());
        assert!(area.is_null());
    }

    #[test]
    fn inverted_span_is_ignored() {
        let mut area = UpdateArea::default();
        area.add_line(10, 9, 3);
        assert!(area.is_null());
    }

    #[test]
    fn inverted_rect_is_empty() {
        let r = Rect {
            xs: 20,
            ys: 7,
            xe: 10,
            ye: 7,
        };
        assert_eq!(r.width(), 0);
        assert_eq!(r.height(), 1);
    }

    #[test]
    fn clip_to_viewport() {
        let viewport = Viewport {
            first_line: 16,
            last_line: 200,
            first_x: 8,
        };
        let r = Rect {
            xs: 0,
            ys: 0,
            xe: 500,
            ye: 300,
        };
        let clipped = r.clip(&viewport, 384).expect("overlaps");
        assert_eq!((clipped.xs, clipped.ys, clipped.xe, clipped.ye), (8, 16, 383, 200));
        assert_eq!(clipped.width(), 376);

        let outside = Rect {
            xs: 0,
            ys: 250,
            xe: 10,
            ye: 260,
        };
        assert_eq!(outside.clip(&viewport, 384), None);
    }
}
