//! Deferred register changes.
//!
//! A chip that writes a register while the beam is inside the current line
//! schedules the new value at the beam position instead of applying it. The
//! engine then draws the line piecewise, applying each change as the draw
//! cursor passes its position.

use std::fmt;

use crate::error::RasterError;

/// Which part of the line a change affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Pixel positions; split the background pass.
    Background,
    /// Character columns; split the foreground pass.
    Foreground,
    /// Pixel positions; split the border pass.
    Border,
    /// Applied after the sprite pass of the line.
    Sprites,
    /// Applied at the start of the next line.
    NextLine,
}

impl Phase {
    pub const ALL: [Self; 5] = [
        Self::Background,
        Self::Foreground,
        Self::Border,
        Self::Sprites,
        Self::NextLine,
    ];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Background => "background",
            Self::Foreground => "foreground",
            Self::Border => "border",
            Self::Sprites => "sprite",
            Self::NextLine => "next-line",
        };
        f.write_str(name)
    }
}

/// Registers owned by the raster engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RasterField {
    BorderColor,
    BackgroundColor,
    OverscanBackgroundColor,
    XSmoothColor,
    XSmooth,
    YSmooth,
    XSmoothShiftLeft,
    /// Value is a [`VideoMode`](crate::VideoMode) index.
    VideoMode,
    DrawIdleState,
    OpenLeftBorder,
    OpenRightBorder,
    BlankThisLine,
    DisplayXStart,
    DisplayXStop,
    YCounter,
}

/// What a change writes to: an engine field or a chip-defined register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeTarget<R> {
    Raster(RasterField),
    Chip(R),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change<R> {
    /// Pixel or character column at which the value takes effect.
    pub position: u32,
    pub target: ChangeTarget<R>,
    pub value: u32,
}

/// Receives changes as they are applied.
pub trait ApplyChange<R> {
    fn apply(&mut self, target: ChangeTarget<R>, value: u32);
}

/// Bounded FIFO of changes for one phase.
#[derive(Debug, Clone)]
pub struct ChangeQueue<R> {
    phase: Phase,
    capacity: usize,
    entries: Vec<Change<R>>,
}

impl<R: Copy> ChangeQueue<R> {
    #[must_use]
    pub fn new(phase: Phase, capacity: usize) -> Self {
        Self {
            phase,
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, change: Change<R>) -> Result<(), RasterError> {
        if self.entries.len() >= self.capacity {
            return Err(RasterError::QueueFull {
                phase: self.phase,
                capacity: self.capacity,
            });
        }
        self.entries.push(change);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change<R>> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Apply every entry in insertion order, then empty the queue.
    pub fn apply_all(&mut self, sink: &mut impl ApplyChange<R>) {
        for change in self.entries.drain(..) {
            sink.apply(change.target, change.value);
        }
    }

    /// Move the entries out so the caller can walk them while mutating the
    /// engine. Hand the vector back with [`recycle`](Self::recycle).
    pub fn take(&mut self) -> Vec<Change<R>> {
        std::mem::take(&mut self.entries)
    }

    /// Return a vector obtained from [`take`](Self::take), emptied, so its
    /// allocation is reused. Anything pushed in the meantime is kept.
    pub fn recycle(&mut self, mut entries: Vec<Change<R>>) {
        entries.clear();
        entries.append(&mut self.entries);
        self.entries = entries;
    }
}

/// The five per-phase queues of one engine.
#[derive(Debug, Clone)]
pub struct ChangeSet<R> {
    pub background: ChangeQueue<R>,
    pub foreground: ChangeQueue<R>,
    pub border: ChangeQueue<R>,
    pub sprites: ChangeQueue<R>,
    pub next_line: ChangeQueue<R>,
    /// Set when any of the background, foreground or border queues holds a
    /// change for the current line.
    pub have_on_this_line: bool,
}

impl<R: Copy> ChangeSet<R> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            background: ChangeQueue::new(Phase::Background, capacity),
            foreground: ChangeQueue::new(Phase::Foreground, capacity),
            border: ChangeQueue::new(Phase::Border, capacity),
            sprites: ChangeQueue::new(Phase::Sprites, capacity),
            next_line: ChangeQueue::new(Phase::NextLine, capacity),
            have_on_this_line: false,
        }
    }

    pub fn queue_mut(&mut self, phase: Phase) -> &mut ChangeQueue<R> {
        match phase {
            Phase::Background => &mut self.background,
            Phase::Foreground => &mut self.foreground,
            Phase::Border => &mut self.border,
            Phase::Sprites => &mut self.sprites,
            Phase::NextLine => &mut self.next_line,
        }
    }

    #[must_use]
    pub fn queue(&self, phase: Phase) -> &ChangeQueue<R> {
        match phase {
            Phase::Background => &self.background,
            Phase::Foreground => &self.foreground,
            Phase::Border => &self.border,
            Phase::Sprites => &self.sprites,
            Phase::NextLine => &self.next_line,
        }
    }

    /// Route a change by position.
    ///
    /// Positions at or before 0 apply at once through `sink`; positions
    /// inside `span` are queued on `phase`; anything further right waits for
    /// the start of the next line. `NextLine` changes ignore the position.
    pub fn schedule(
        &mut self,
        phase: Phase,
        position: i32,
        target: ChangeTarget<R>,
        value: u32,
        span: u32,
        sink: &mut impl ApplyChange<R>,
    ) -> Result<(), RasterError> {
        if phase == Phase::NextLine {
            return self.next_line.push(Change {
                position: 0,
                target,
                value,
            });
        }
        if position <= 0 {
            sink.apply(target, value);
            return Ok(());
        }
        let position = position as u32;
        if position < span {
            self.queue_mut(phase).push(Change {
                position,
                target,
                value,
            })?;
            if phase != Phase::Sprites {
                self.have_on_this_line = true;
            }
            Ok(())
        } else {
            self.next_line.push(Change {
                position: 0,
                target,
                value,
            })
        }
    }

    pub fn clear_all(&mut self) {
        for phase in Phase::ALL {
            self.queue_mut(phase).clear();
        }
        self.have_on_this_line = false;
    }
}
