//! Bounds-checked reader over one rule of a DM-NG ruleset.

use crate::error::RuleFaultKind;

/// Reader over `bytes[offset..end]`.
///
/// Every read either yields the requested bytes and advances, or returns a
/// [`RuleFaultKind`] and leaves the cursor where the failed read started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
    end: usize,
}

impl<'a> RuleCursor<'a> {
    /// Cursor over `bytes[offset..end]`, with `end` clamped to the buffer.
    #[must_use]
    pub fn new(bytes: &'a [u8], offset: usize, end: usize) -> Self {
        let end = end.min(bytes.len());
        Self {
            bytes,
            offset: offset.min(end),
            end,
        }
    }

    /// Absolute position of the next read.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Exclusive end of the readable window.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.end
    }

    /// Bytes left before `end`.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.end - self.offset
    }

    /// `true` once every byte of the window has been consumed.
    #[must_use]
    pub const fn at_end(&self) -> bool {
        self.offset == self.end
    }

    /// Reads one byte, failing with `kind` at the window end.
    ///
    /// # Errors
    ///
    /// Returns `kind` when no byte is left.
    pub fn read_u8(&mut self, kind: RuleFaultKind) -> Result<u8, RuleFaultKind> {
        if self.offset >= self.end {
            return Err(kind);
        }
        let byte = self.bytes[self.offset];
        self.offset += 1;
        Ok(byte)
    }

    /// Reads a big-endian operand of `len` bytes (1, 2 or 4).
    ///
    /// # Errors
    ///
    /// Returns `kind` when fewer than `len` bytes are left.
    pub fn read_be(&mut self, len: usize, kind: RuleFaultKind) -> Result<u32, RuleFaultKind> {
        if len > 4 || self.remaining() < len {
            return Err(kind);
        }
        let value = self.bytes[self.offset..self.offset + len]
            .iter()
            .fold(0_u32, |acc, byte| (acc << 8) | u32::from(*byte));
        self.offset += len;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::RuleCursor;
    use crate::error::RuleFaultKind;

    #[test]
    fn window_is_clamped_to_buffer() {
        let bytes = [1, 2, 3];
        let cursor = RuleCursor::new(&bytes, 1, 10);
        assert_eq!(cursor.end(), 3);
        assert_eq!(cursor.remaining(), 2);

        let past = RuleCursor::new(&bytes, 9, 10);
        assert!(past.at_end());
    }

    #[test]
    fn reads_stop_at_window_end() {
        let bytes = [0xAA, 0x12, 0x34, 0x56];
        let mut cursor = RuleCursor::new(&bytes, 0, 3);

        assert_eq!(cursor.read_u8(RuleFaultKind::TruncatedCondition), Ok(0xAA));
        assert_eq!(cursor.read_be(2, RuleFaultKind::TruncatedCondition), Ok(0x1234));
        assert!(cursor.at_end());
        assert_eq!(
            cursor.read_u8(RuleFaultKind::TruncatedCondition),
            Err(RuleFaultKind::TruncatedCondition)
        );
    }

    #[test]
    fn failed_read_does_not_advance() {
        let bytes = [0x01, 0x02];
        let mut cursor = RuleCursor::new(&bytes, 0, 2);
        assert_eq!(
            cursor.read_be(4, RuleFaultKind::TruncatedCondition),
            Err(RuleFaultKind::TruncatedCondition)
        );
        assert_eq!(cursor.offset(), 0);
    }
}
