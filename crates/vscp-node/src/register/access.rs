//! Big-endian helpers for multi-byte registers and payload fields.

/// Byte `index` (0 = MSB) of `value` viewed as a `width`-byte big-endian integer.
///
/// Indexes at or past `width` read as 0.
#[must_use]
pub const fn be_byte(value: u32, width: u8, index: u8) -> u8 {
    if index >= width || width > 4 {
        return 0;
    }
    let shift = (width - 1 - index) as u32 * 8;
    #[allow(clippy::cast_possible_truncation)]
    {
        (value >> shift) as u8
    }
}

/// Big-endian `u16` at `offset`, if the bytes are present.
#[must_use]
pub fn read_be_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    let end = offset.checked_add(2)?;
    let raw: [u8; 2] = bytes.get(offset..end)?.try_into().ok()?;
    Some(u16::from_be_bytes(raw))
}

/// Big-endian `u32` at `offset`, if the bytes are present.
#[must_use]
pub fn read_be_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    let raw: [u8; 4] = bytes.get(offset..end)?.try_into().ok()?;
    Some(u32::from_be_bytes(raw))
}

/// Splits a page number into `[msb, lsb]`.
#[must_use]
pub const fn page_bytes(page: u16) -> [u8; 2] {
    page.to_be_bytes()
}
