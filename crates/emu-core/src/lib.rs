//! Core traits and types shared by the emulator chip models.
//!
//! Every component can be inspected through [`Observable`] and saved through
//! the snapshot module container.

mod observable;
mod snapshot;

pub use observable::{Observable, Value};
pub use snapshot::{SnapshotError, SnapshotReader, SnapshotWriter};
