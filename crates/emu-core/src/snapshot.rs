//! Snapshot module container.
//!
//! Chip state is saved as an ordered sequence of little-endian fields with no
//! per-field tags. The enclosing module decides versioning; readers must
//! consume fields in exactly the order the writer produced them.

use thiserror::Error;

/// Failure while decoding a snapshot module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// The module ended before a field could be read in full.
    #[error("snapshot ended early: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEnd { needed: usize, remaining: usize },
}

/// Appends fields to an in-memory snapshot module.
#[derive(Debug, Default, Clone)]
pub struct SnapshotWriter {
    data: Vec<u8>,
}

impl SnapshotWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Append raw bytes. The length is not recorded; the reader must know it.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Reads fields back out of a snapshot module, in write order.
#[derive(Debug, Clone)]
pub struct SnapshotReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SnapshotReader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], SnapshotError> {
        let remaining = self.remaining();
        if count > remaining {
            return Err(SnapshotError::UnexpectedEnd {
                needed: count,
                remaining,
            });
        }
        let bytes = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, SnapshotError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, SnapshotError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Fill `dest` completely from the module.
    pub fn read_into(&mut self, dest: &mut [u8]) -> Result<(), SnapshotError> {
        let bytes = self.take(dest.len())?;
        dest.copy_from_slice(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_read_back_in_order() {
        let mut w = SnapshotWriter::new();
        w.write_u32(0x1234_5678);
        w.write_u8(0xAB);
        w.write_bytes(&[1, 2, 3]);
        assert_eq!(w.len(), 8);

        let bytes = w.into_bytes();
        assert_eq!(&bytes[..4], &[0x78, 0x56, 0x34, 0x12], "u32 is little-endian");

        let mut r = SnapshotReader::new(&bytes);
        assert_eq!(r.read_u32(), Ok(0x1234_5678));
        assert_eq!(r.read_u8(), Ok(0xAB));
        let mut tail = [0u8; 3];
        r.read_into(&mut tail).expect("three bytes left");
        assert_eq!(tail, [1, 2, 3]);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn short_module_reports_missing_bytes() {
        let bytes = [0u8, 1];
        let mut r = SnapshotReader::new(&bytes);
        assert_eq!(
            r.read_u32(),
            Err(SnapshotError::UnexpectedEnd {
                needed: 4,
                remaining: 2
            })
        );
        // A failed read consumes nothing.
        assert_eq!(r.remaining(), 2);
    }
}
