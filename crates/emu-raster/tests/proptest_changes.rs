//! Property tests for mid-line change scheduling.
//!
//! Drawing a line piecewise around scheduled changes must give the same
//! pixels as switching the colour at exactly those positions.

mod common;

use common::{row, settle, step_to_line, wide_engine};
use emu_raster::{ApplyChange, Change, ChangeQueue, ChangeTarget, Phase, RasterField};
use proptest::prelude::*;

/// Changes as (position, colour), sorted by position.
fn sorted_changes() -> impl Strategy<Value = Vec<(u32, u8)>> {
    prop::collection::vec((1u32..320, 1u8..16), 0..12).prop_map(|mut changes| {
        changes.sort_by_key(|&(position, _)| position);
        changes
    })
}

/// Colour each pixel should end up with.
fn reference_row(initial: u8, changes: &[(u32, u8)]) -> Vec<u8> {
    (0..320u32)
        .map(|x| {
            changes
                .iter()
                .rev()
                .find(|&&(position, _)| position <= x)
                .map_or(initial, |&(_, colour)| colour)
        })
        .collect()
}

#[derive(Default)]
struct Log(Vec<(ChangeTarget<u8>, u32)>);

impl ApplyChange<u8> for Log {
    fn apply(&mut self, target: ChangeTarget<u8>, value: u32) {
        self.0.push((target, value));
    }
}

proptest! {
    #[test]
    fn background_changes_match_reference(line in 2u32..10, changes in sorted_changes()) {
        let mut engine = wide_engine();
        engine.state_mut().background_color = 1;
        settle(&mut engine);

        step_to_line(&mut engine, line);
        for &(position, colour) in &changes {
            engine
                .schedule_raster(
                    Phase::Background,
                    position as i32,
                    RasterField::BackgroundColor,
                    u32::from(colour),
                )
                .expect("queue has room");
        }
        engine.step();

        prop_assert_eq!(row(&engine, line as usize), reference_row(1, &changes));
        let last = changes.last().map_or(1, |&(_, colour)| colour);
        prop_assert_eq!(engine.state().background_color, last);
        prop_assert_eq!(engine.pending(Phase::Background), 0);
    }

    #[test]
    fn queue_applies_in_insertion_order(values in prop::collection::vec(any::<u32>(), 0..32)) {
        let mut queue = ChangeQueue::new(Phase::Foreground, 32);
        for (i, &value) in values.iter().enumerate() {
            queue
                .push(Change {
                    position: i as u32,
                    target: ChangeTarget::Chip(i as u8),
                    value,
                })
                .expect("queue has room");
        }

        let mut log = Log::default();
        queue.apply_all(&mut log);
        prop_assert!(queue.is_empty());

        let expected: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(i, &value)| (ChangeTarget::Chip(i as u8), value))
            .collect();
        prop_assert_eq!(log.0, expected);

        // A drained queue applies nothing the second time.
        let mut again = Log::default();
        queue.apply_all(&mut again);
        prop_assert!(again.0.is_empty());
    }
}
